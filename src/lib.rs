//! An HTTP test server that emulates Basic, Bearer and Digest authentication
//! (IETF RFCs 2069, 2617 and 7616), for exercising HTTP clients.
//!
//! The engine is stateless: every decision depends only on the request and the
//! route it was made to. Nonces are random and never stored, and `stale=true`
//! is declared by the route rather than measured.
//!
//! # Examples
//!
//! Answering a server challenge and verifying the answer:
//!
//! ```
//! use authbin::verify::{verify_digest, Decision, DigestRoute, Identity, RequestContext};
//! use authbin::{AuthContext, AuthorizationHeader};
//!
//! let route = DigestRoute::from_params(Some("auth"), "foo", "bar", Some("SHA-256"), None).unwrap();
//! let uri = "/digest-auth/auth/foo/bar/SHA-256";
//! let mut req = RequestContext { method: "GET", uri, authorization: None, body: b"" };
//!
//! // No Authorization header: the server answers with a challenge
//! let www_authenticate = match verify_digest(&route, "Fake Realm", &req) {
//!     Decision::Challenge { www_authenticate, .. } => www_authenticate,
//!     other => panic!("unexpected {:?}", other),
//! };
//!
//! // The client computes its answer from the challenge
//! let mut prompt = authbin::parse(&www_authenticate).unwrap();
//! let context = AuthContext::new("foo", "bar", uri);
//! let answer = AuthorizationHeader::from_challenge(&mut prompt, &context).unwrap().to_string();
//!
//! req.authorization = Some(answer.as_str());
//! assert_eq!(
//!     verify_digest(&route, "Fake Realm", &req),
//!     Decision::Authenticated(Identity::User("foo".to_string()))
//! );
//! ```

pub mod challenge;
pub mod config;
pub mod credentials;
pub mod digest;
mod enums;
mod error;
pub mod logging;
pub mod nonce;
pub mod server;
mod utils;
pub mod verify;

pub use error::{Error, Result};

pub use crate::challenge::{ChallengeParams, WwwAuthenticate};
pub use crate::config::Config;
pub use crate::credentials::{Credentials, DigestCredentials};
pub use crate::digest::{AuthContext, AuthorizationHeader};

pub use crate::enums::*;

/// Parse a `WWW-Authenticate` header value.
/// Shorthand for [`WwwAuthenticate::parse()`](struct.WwwAuthenticate.html#method.parse).
pub fn parse(www_authenticate: &str) -> Result<WwwAuthenticate> {
    WwwAuthenticate::parse(www_authenticate)
}

#[test]
fn test_respond_to_stale_auth_int_challenge() {
    use crate::verify::{verify_digest, DigestRoute, RequestContext};

    let route = DigestRoute::from_params(Some("auth-int"), "foo", "bar", Some("SHA-512"), Some("0")).unwrap();
    let uri = "/digest-auth/auth-int/foo/bar/SHA-512/0";
    let body = b"{\"k\": 1}";

    let src = ChallengeParams {
        realm: "Fake Realm".to_string(),
        qop: route.qop,
        algorithm: route.algorithm,
        stale: true,
    }
    .build_with_nonce("bm9uY2U");
    assert_eq!(
        src,
        r#"Digest realm="Fake Realm", nonce="bm9uY2U", qop="auth-int", algorithm=SHA-512, stale=true"#
    );

    let mut prompt = crate::parse(&src).unwrap();
    assert!(prompt.stale);
    assert_eq!(prompt.opaque, None);

    let context = AuthContext::new_with_method("foo", "bar", uri, Some(&body[..]), "PUT");
    let answer = prompt.respond(&context).unwrap();
    assert_eq!(answer.qop, Some(Qop::AUTH_INT));
    assert_eq!(answer.algorithm, Some(Algorithm::SHA2_512));
    assert_eq!(answer.response.len(), 128);

    let header = answer.to_string();
    assert!(header.contains("nc=00000001"));
    assert!(!header.contains("opaque"));

    let req = RequestContext {
        method: "PUT",
        uri,
        authorization: Some(header.as_str()),
        body,
    };
    assert!(verify_digest(&route, "Fake Realm", &req).is_authenticated());
}
