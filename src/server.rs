//! HTTP front end: maps httpbin-style auth routes onto [`verify`](crate::verify).

use crate::verify::{verify, Decision, DigestRoute, Identity, RequestContext, Route};
use crate::{Config, Error, Qop, Result};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest entity body read for `auth-int` routes
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// Read-only settings shared by all connections
#[derive(Debug, Clone)]
pub struct ServerState {
    pub realm: String,
}

impl ServerState {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Authenticated<'a> {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
}

/// A matched route, before its parameters are validated
enum Endpoint<'p> {
    Basic { user: &'p str, passwd: &'p str, hidden: bool },
    Bearer,
    Digest {
        qop: &'p str,
        user: &'p str,
        passwd: &'p str,
        algorithm: Option<&'p str>,
        stale_after: Option<&'p str>,
    },
}

fn match_path(path: &str) -> Option<Endpoint> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let endpoint = match *segments.as_slice() {
        ["basic-auth", user, passwd] => Endpoint::Basic { user, passwd, hidden: false },
        ["hidden-basic-auth", user, passwd] => Endpoint::Basic { user, passwd, hidden: true },
        ["bearer"] => Endpoint::Bearer,
        ["digest-auth", qop, user, passwd] => Endpoint::Digest {
            qop,
            user,
            passwd,
            algorithm: None,
            stale_after: None,
        },
        ["digest-auth", qop, user, passwd, algorithm] => Endpoint::Digest {
            qop,
            user,
            passwd,
            algorithm: Some(algorithm),
            stale_after: None,
        },
        ["digest-auth", qop, user, passwd, algorithm, stale_after] => Endpoint::Digest {
            qop,
            user,
            passwd,
            algorithm: Some(algorithm),
            stale_after: Some(stale_after),
        },
        _ => return None,
    };
    Some(endpoint)
}

/// Handle one request. Never fails; internal errors become a 500.
pub async fn route<B>(req: Request<B>, state: &ServerState) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match dispatch(req, state).await {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("Failed to build response: {}", e);
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Ok(response)
        }
    }
}

async fn dispatch<B>(req: Request<B>, state: &ServerState) -> Result<Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();

    let endpoint = match match_path(parts.uri.path()) {
        Some(endpoint) => endpoint,
        None => return empty(StatusCode::NOT_FOUND),
    };

    let (route, hidden) = match endpoint {
        Endpoint::Basic { user, passwd, hidden } => (
            Route::Basic {
                user: user.to_string(),
                passwd: passwd.to_string(),
            },
            hidden,
        ),
        Endpoint::Bearer => (Route::Bearer, false),
        Endpoint::Digest {
            qop,
            user,
            passwd,
            algorithm,
            stale_after,
        } => match DigestRoute::from_params(Some(qop), user, passwd, algorithm, stale_after) {
            Ok(digest) => (Route::Digest(digest), false),
            Err(e) => return bad_route(&e),
        },
    };

    // only auth-int hashes the entity body
    let body = if route_binds_body(&route) {
        match Limited::new(body, MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                warn!("Request body exceeds {} bytes", MAX_BODY_BYTES);
                return empty(StatusCode::PAYLOAD_TOO_LARGE);
            }
            Err(e) => {
                warn!("Failed to read request body: {}", e);
                return empty(StatusCode::BAD_REQUEST);
            }
        }
    } else {
        Bytes::new()
    };

    // a header that is not visible ASCII is kept, as an unparseable one
    let authorization = parts
        .headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or(""));
    let target = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), |pq| pq.as_str());

    let ctx = RequestContext {
        method: parts.method.as_str(),
        uri: target,
        authorization,
        body: &body,
    };

    match verify(&route, &state.realm, &ctx) {
        Decision::Authenticated(identity) => authenticated(&identity),
        Decision::Challenge { .. } if hidden => empty(StatusCode::NOT_FOUND),
        Decision::Challenge {
            www_authenticate, ..
        } => Ok(Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(WWW_AUTHENTICATE, www_authenticate)
            .body(Full::new(Bytes::new()))?),
    }
}

fn route_binds_body(route: &Route) -> bool {
    matches!(route, Route::Digest(DigestRoute { qop: Some(Qop::AUTH_INT), .. }))
}

fn authenticated(identity: &Identity) -> Result<Response<Full<Bytes>>> {
    let payload = match identity {
        Identity::User(user) => Authenticated {
            authenticated: true,
            user: Some(user.as_str()),
            token: None,
        },
        Identity::Token(token) => Authenticated {
            authenticated: true,
            user: None,
            token: Some(token.as_str()),
        },
    };
    let json = serde_json::to_string_pretty(&payload)
        .map_err(|e| Error::Http(format!("Failed to serialize response: {}", e)))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)))?)
}

fn bad_route(err: &Error) -> Result<Response<Full<Bytes>>> {
    let param = err.route_parameter().unwrap_or("route");
    warn!(param, "rejecting route: {}", err);

    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(format!("Invalid {}: {}\n", param, err))))?)
}

fn empty(status: StatusCode) -> Result<Response<Full<Bytes>>> {
    Ok(Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))?)
}

/// A failed accept costs one connection, never the listener
fn accepted<T>(result: std::io::Result<T>) -> Option<T> {
    match result {
        Ok(accepted) => Some(accepted),
        Err(e) => {
            warn!("Failed to accept connection: {}", e);
            None
        }
    }
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Io(format!("Failed to bind {}: {}", addr, e)))?;
    let state = Arc::new(ServerState::new(config.realm.clone()));

    info!("Listening on http://{}", addr);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                let Some((stream, peer)) = accepted(accept_result) else {
                    continue;
                };
                debug!(%peer, "accepted connection");

                let io = TokioIo::new(stream);
                let state = state.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = state.clone();
                        async move { route(req, &state).await }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {}", peer, e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    Ok(())
}
