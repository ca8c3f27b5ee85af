//! `WWW-Authenticate` values: building them on the server, and parsing them
//! back on the client side.

use crate::credentials::parse_header_map;
use crate::digest::{AuthContext, AuthorizationHeader};
use crate::nonce;
use crate::utils::QuoteForDigest;
use crate::{Algorithm, Error, Error::*, Qop, Result};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Realm used by every emulated endpoint unless configured otherwise
pub const DEFAULT_REALM: &str = "Fake Realm";

/// Parameters of a Digest challenge, built fresh for each 401
#[derive(Debug, PartialEq, Clone)]
pub struct ChallengeParams {
    pub realm: String,
    pub qop: Option<Qop>,
    pub algorithm: Option<Algorithm>,
    pub stale: bool,
}

impl ChallengeParams {
    /// Serialize with a freshly generated nonce
    pub fn build(&self) -> String {
        self.build_with_nonce(&nonce::generate())
    }

    /// Serialize with the given nonce.
    ///
    /// Field order is fixed: realm, nonce, qop, algorithm, stale. Absent fields
    /// are left out.
    pub fn build_with_nonce(&self, nonce: &str) -> String {
        DigestChallenge {
            params: self,
            nonce,
        }
        .to_string()
    }
}

struct DigestChallenge<'a> {
    params: &'a ChallengeParams,
    nonce: &'a str,
}

impl<'a> Display for DigestChallenge<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Digest realm=\"{}\"", self.params.realm.quote_for_digest())?;
        write!(f, ", nonce=\"{}\"", self.nonce.quote_for_digest())?;
        if let Some(qop) = self.params.qop {
            write!(f, ", qop=\"{}\"", qop)?;
        }
        if let Some(algorithm) = self.params.algorithm {
            write!(f, ", algorithm={}", algorithm)?;
        }
        if self.params.stale {
            f.write_str(", stale=true")?;
        }
        Ok(())
    }
}

/// `WWW-Authenticate` value for Basic auth
pub fn basic_challenge(realm: &str) -> String {
    format!("Basic realm=\"{}\"", realm.quote_for_digest())
}

/// `WWW-Authenticate` value for Bearer auth
pub fn bearer_challenge() -> &'static str {
    "Bearer"
}

/// Digest challenge parsed from a `WWW-Authenticate` header value
#[derive(Debug, PartialEq, Clone)]
pub struct WwwAuthenticate {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// True if the server declared the previous nonce expired
    pub stale: bool,
    /// None if the server did not name one (which means MD5)
    pub algorithm: Option<Algorithm>,
    pub qop: Option<Vec<Qop>>,
    /// Not part of the received header; incremented each time a response is
    /// composed with the same nonce
    pub nc: u32,
}

impl WwwAuthenticate {
    /// Compute the `Authorization` answer to this challenge; increments `nc`
    pub fn respond(&mut self, context: &AuthContext) -> Result<AuthorizationHeader> {
        AuthorizationHeader::from_challenge(self, context)
    }

    /// Construct from the `WWW-Authenticate` header string
    ///
    /// # Errors
    /// If the header is malformed (missing realm or nonce, unknown algorithm or qop)
    pub fn parse(input: &str) -> Result<Self> {
        let mut input = input.trim();
        if let Some(rest) = input.strip_prefix("Digest") {
            input = rest;
        }

        let mut kv = parse_header_map(input);

        let algorithm = match kv.get("algorithm") {
            Some(a) => Some(Algorithm::from_str(a)?),
            None => None,
        };

        let qop = match kv.get("qop") {
            Some(list) => {
                let mut qops = vec![];
                for q in list.split(',') {
                    qops.push(Qop::from_str(q.trim())?);
                }
                Some(qops)
            }
            None => None,
        };

        Ok(Self {
            realm: kv.remove("realm").ok_or(MissingRequired("realm"))?,
            nonce: kv.remove("nonce").ok_or(MissingRequired("nonce"))?,
            opaque: kv.remove("opaque"),
            stale: kv
                .get("stale")
                .map_or(false, |v| v.eq_ignore_ascii_case("true")),
            algorithm,
            qop,
            nc: 0,
        })
    }
}

impl FromStr for WwwAuthenticate {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}
