//! Command-line and environment configuration.

use crate::challenge::DEFAULT_REALM;
use crate::{Error, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};

/// HTTP test server emulating Basic, Bearer and Digest authentication
#[derive(Debug, Clone, Parser)]
#[command(name = "authbin", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1", env = "AUTHBIN_BIND")]
    pub bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "AUTHBIN_PORT")]
    pub port: u16,

    /// Realm announced in every challenge
    #[arg(long, default_value = DEFAULT_REALM)]
    pub realm: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "AUTHBIN_LOG")]
    pub log_level: String,
}

impl Config {
    /// Check values clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.realm.is_empty() {
            return Err(Error::Config("realm cannot be empty".to_string()));
        }
        if self.realm.contains('"') {
            return Err(Error::Config(format!(
                "realm cannot contain a double quote: {}",
                self.realm
            )));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", self.bind, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
