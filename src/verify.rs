//! Per-request authentication decisions.
//!
//! Everything here is a pure function of the route configuration and the
//! request, except that each challenge carries a freshly generated nonce.
//! No nonce is remembered between requests: any nonce the client echoes back
//! is accepted if the response hash over it is right, and staleness is
//! whatever the route declares.

use crate::challenge::{basic_challenge, bearer_challenge, ChallengeParams};
use crate::credentials::{Credentials, DigestCredentials};
use crate::digest::{QopAlgo, ResponseInput};
use crate::{Algorithm, Error, Qop, Result, StalePolicy};
use std::str::FromStr;
use tracing::debug;

/// Expected credentials and options of a Digest-protected route
#[derive(Debug, PartialEq, Clone)]
pub struct DigestRoute {
    pub user: String,
    pub passwd: String,
    pub qop: Option<Qop>,
    /// None if the route did not name one; hashing then uses MD5 and the
    /// challenge leaves the field out
    pub algorithm: Option<Algorithm>,
    pub stale_after: StalePolicy,
}

impl DigestRoute {
    /// Validate raw route parameters.
    ///
    /// # Errors
    /// `BadQop`, `UnknownAlgorithm` or `InvalidStalePolicy`; these are request
    /// errors (400), checked before any header is looked at
    pub fn from_params(
        qop: Option<&str>,
        user: &str,
        passwd: &str,
        algorithm: Option<&str>,
        stale_after: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            user: user.to_string(),
            passwd: passwd.to_string(),
            qop: qop.map(Qop::from_str).transpose()?,
            algorithm: algorithm.map(Algorithm::from_str).transpose()?,
            stale_after: stale_after
                .map(StalePolicy::from_str)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    fn hash_algorithm(&self) -> Algorithm {
        self.algorithm.unwrap_or_default()
    }
}

/// What a protected route expects
#[derive(Debug, PartialEq, Clone)]
pub enum Route {
    Basic { user: String, passwd: String },
    Bearer,
    Digest(DigestRoute),
}

/// The parts of the request that authentication looks at
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub method: &'a str,
    /// Request target as received: path, plus `?query` if any
    pub uri: &'a str,
    pub authorization: Option<&'a str>,
    pub body: &'a [u8],
}

/// Who got in
#[derive(Debug, PartialEq, Clone)]
pub enum Identity {
    User(String),
    Token(String),
}

/// Why a request was challenged. All of these look the same to the client.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Failure {
    NoAuthorizationHeader,
    AuthorizationHeaderUnparseable,
    ParsedCredentialsIncomplete,
    CredentialMismatch,
}

/// Terminal outcome for one request
#[derive(Debug, PartialEq, Clone)]
pub enum Decision {
    Authenticated(Identity),
    Challenge {
        www_authenticate: String,
        failure: Failure,
    },
}

impl Decision {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Decision::Authenticated(_))
    }
}

/// Decide a request against the route it was made to
pub fn verify(route: &Route, realm: &str, req: &RequestContext) -> Decision {
    match route {
        Route::Basic { user, passwd } => verify_basic(user, passwd, realm, req),
        Route::Bearer => verify_bearer(req),
        Route::Digest(digest) => verify_digest(digest, realm, req),
    }
}

pub fn verify_basic(user: &str, passwd: &str, realm: &str, req: &RequestContext) -> Decision {
    let failure = match req.authorization {
        None => Failure::NoAuthorizationHeader,
        Some(header) => match Credentials::parse(header) {
            Ok(Credentials::Basic { user: u, pass: p }) if u == user && p == passwd => {
                debug!(user = %u, "basic auth accepted");
                return Decision::Authenticated(Identity::User(u));
            }
            Ok(Credentials::Basic { .. }) => Failure::CredentialMismatch,
            _ => Failure::AuthorizationHeaderUnparseable,
        },
    };

    debug!(?failure, "basic auth rejected");
    Decision::Challenge {
        www_authenticate: basic_challenge(realm),
        failure,
    }
}

/// Any non-empty token is accepted; there is no token registry
pub fn verify_bearer(req: &RequestContext) -> Decision {
    let failure = match req.authorization.map(Credentials::parse) {
        None => Failure::NoAuthorizationHeader,
        Some(Ok(Credentials::Bearer { token })) => {
            return Decision::Authenticated(Identity::Token(token))
        }
        Some(_) => Failure::AuthorizationHeaderUnparseable,
    };

    debug!(?failure, "bearer auth rejected");
    Decision::Challenge {
        www_authenticate: bearer_challenge().to_string(),
        failure,
    }
}

pub fn verify_digest(route: &DigestRoute, realm: &str, req: &RequestContext) -> Decision {
    let failure = match check_digest(route, realm, req) {
        Ok(()) => {
            debug!(user = %route.user, "digest auth accepted");
            return Decision::Authenticated(Identity::User(route.user.clone()));
        }
        Err(failure) => failure,
    };

    // the first challenge is never stale; later ones follow the route policy
    let stale = failure != Failure::NoAuthorizationHeader && route.stale_after.is_stale();
    debug!(?failure, stale, "digest auth rejected");

    let params = ChallengeParams {
        realm: realm.to_string(),
        qop: route.qop,
        algorithm: route.algorithm,
        stale,
    };
    Decision::Challenge {
        www_authenticate: params.build(),
        failure,
    }
}

fn check_digest(
    route: &DigestRoute,
    realm: &str,
    req: &RequestContext,
) -> std::result::Result<(), Failure> {
    let header = req.authorization.ok_or(Failure::NoAuthorizationHeader)?;
    let creds = match Credentials::parse(header) {
        Ok(Credentials::Digest(creds)) => creds,
        Err(Error::MissingRequired(_)) => return Err(Failure::ParsedCredentialsIncomplete),
        _ => return Err(Failure::AuthorizationHeaderUnparseable),
    };

    if !consistent(route, req, &creds) {
        return Err(Failure::ParsedCredentialsIncomplete);
    }

    let expected = ResponseInput {
        algorithm: route.hash_algorithm(),
        username: &route.user,
        realm,
        password: &route.passwd,
        method: req.method,
        uri: req.uri,
        qop: QopAlgo::new(route.qop, req.body),
        nonce: &creds.nonce,
        nc: creds.nc.as_deref(),
        cnonce: creds.cnonce.as_deref(),
    }
    .compute();

    if expected == creds.response {
        Ok(())
    } else {
        Err(Failure::CredentialMismatch)
    }
}

/// Fields the client echoes must agree with what the server will hash
fn consistent(route: &DigestRoute, req: &RequestContext, creds: &DigestCredentials) -> bool {
    if creds.username != route.user {
        return false;
    }
    if matches!(&creds.uri, Some(uri) if uri != req.uri) {
        return false;
    }
    if matches!(&creds.nc, Some(nc) if !is_nonce_count(nc)) {
        return false;
    }
    if let Some(algorithm) = &creds.algorithm {
        if Algorithm::from_str(algorithm).ok() != Some(route.hash_algorithm()) {
            return false;
        }
    }
    if let (Some(qop), Some(expected)) = (&creds.qop, route.qop) {
        if Qop::from_str(qop).ok() != Some(expected) {
            return false;
        }
    }
    true
}

/// `nc` is exactly 8 hex digits
fn is_nonce_count(nc: &str) -> bool {
    nc.len() == 8 && nc.bytes().all(|b| b.is_ascii_hexdigit())
}
