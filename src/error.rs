use std::result;
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum Error {
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Bad Qop option: {0}")]
    BadQop(String),
    #[error("Bad stale_after value: {0}")]
    InvalidStalePolicy(String),
    #[error("Malformed {0} Authorization header")]
    MalformedHeader(&'static str),
    #[error("Missing \"{0}\" in header")]
    MissingRequired(&'static str),
    #[error("Invalid header syntax: {0}")]
    InvalidHeaderSyntax(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    /// Name of the route parameter that failed validation, if this is a route error
    pub fn route_parameter(&self) -> Option<&'static str> {
        match self {
            Error::UnknownAlgorithm(_) => Some("algorithm"),
            Error::BadQop(_) => Some("qop"),
            Error::InvalidStalePolicy(_) => Some("stale_after"),
            _ => None,
        }
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::Http(err.to_string())
    }
}
