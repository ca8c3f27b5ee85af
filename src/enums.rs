use crate::{Error, Error::*, Result};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use digest::{Digest, DynDigest};
use md5::Md5;
use sha2::{Sha256, Sha512};

/// Digest hash algorithm offered in challenges and used to verify responses
///
/// `MD5` is the legacy slot. It is hashed with a real MD5 implementation,
/// so responses interoperate with stock RFC 2617 clients.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(non_camel_case_types)]
pub enum Algorithm {
    MD5,
    SHA2_256,
    SHA2_512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::MD5, Algorithm::SHA2_256, Algorithm::SHA2_512];

    /// Calculate a hash of bytes using the selected algorithm, as lowercase hex
    pub fn hash(self, bytes: &[u8]) -> String {
        let mut hash: Box<dyn DynDigest> = match self {
            Algorithm::MD5 => Box::new(Md5::new()),
            Algorithm::SHA2_256 => Box::new(Sha256::new()),
            Algorithm::SHA2_512 => Box::new(Sha512::new()),
        };

        hash.update(bytes);
        hex::encode(hash.finalize())
    }

    /// Calculate a hash of string's bytes using the selected algorithm
    pub fn hash_str(self, s: &str) -> String {
        self.hash(s.as_bytes())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    /// Parse from the token used in routes and in WWW-Authenticate
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MD5" => Ok(Algorithm::MD5),
            "SHA-256" => Ok(Algorithm::SHA2_256),
            "SHA-512" => Ok(Algorithm::SHA2_512),
            _ => Err(UnknownAlgorithm(s.into())),
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::MD5
    }
}

impl Display for Algorithm {
    /// Format to the form used in HTTP headers
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Algorithm::MD5 => "MD5",
            Algorithm::SHA2_256 => "SHA-256",
            Algorithm::SHA2_512 => "SHA-512",
        })
    }
}

/// QOP field values
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(non_camel_case_types)]
pub enum Qop {
    AUTH,
    AUTH_INT,
}

impl FromStr for Qop {
    type Err = Error;

    /// Parse from "auth" or "auth-int" as used in HTTP headers
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auth" => Ok(Qop::AUTH),
            "auth-int" => Ok(Qop::AUTH_INT),
            _ => Err(BadQop(s.into())),
        }
    }
}

impl Display for Qop {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Qop::AUTH => "auth",
            Qop::AUTH_INT => "auth-int",
        })
    }
}

/// When a failed Digest attempt is answered with `stale=true`
///
/// There is no nonce registry, so a positive threshold can never be reached
/// and behaves like `Never`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StalePolicy {
    Never,
    After(i64),
}

impl StalePolicy {
    /// Whether a challenge issued after a failed attempt is marked stale
    pub fn is_stale(self) -> bool {
        match self {
            StalePolicy::Never => false,
            StalePolicy::After(n) => n <= 0,
        }
    }
}

impl Default for StalePolicy {
    fn default() -> Self {
        StalePolicy::Never
    }
}

impl FromStr for StalePolicy {
    type Err = Error;

    /// Parse "never" or a (possibly negative) integer
    fn from_str(s: &str) -> Result<Self> {
        if s == "never" {
            return Ok(StalePolicy::Never);
        }
        s.parse::<i64>()
            .map(StalePolicy::After)
            .map_err(|_| InvalidStalePolicy(s.into()))
    }
}
