//! Service configuration for the HTTP server.
//!
//! | Flag              | Env var           | Default       |
//! |-------------------|-------------------|---------------|
//! | `--host`          | `HOST`            | `0.0.0.0`     |
//! | `--port`          | `PORT`            | `3000`        |
//! | `--snapshot`      | `LEDGER_SNAPSHOT` | none          |
//! | `--allowed-roles` | `ALLOWED_ROLES`   | `admin,staff` |
//! | `--list-limit`    | `LIST_LIMIT`      | `200`         |
//! | `--scan-cap`      | `SCAN_CAP`        | `1000`        |
//!
//! A `.env` file in the working directory is loaded before parsing.

use crate::cli::{EngineArgs, ServeArgs};
use crate::core::EngineConfig;
use crate::types::LoyaltyError;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub snapshot: Option<PathBuf>,
    pub allowed_roles: Vec<String>,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn from_args(serve: &ServeArgs, engine: &EngineArgs) -> Self {
        Self {
            host: serve.host.trim().to_string(),
            port: serve.port,
            snapshot: serve.snapshot.clone(),
            allowed_roles: serve.allowed_roles.clone(),
            engine: engine.to_engine_config(),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, LoyaltyError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                LoyaltyError::invalid_input(format!(
                    "Invalid listen address '{}:{}': {}",
                    self.host, self.port, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CliArgs, Command};
    use clap::Parser;

    fn server_config(args: &[&str]) -> ServerConfig {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let Command::Serve(serve) = parsed.command else {
            panic!("expected serve");
        };
        ServerConfig::from_args(&serve, &parsed.engine)
    }

    #[test]
    fn test_socket_addr_from_flags() {
        let config = server_config(&["program", "serve", "--host", "127.0.0.1", "--port", "8080"]);
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let config = server_config(&["program", "serve", "--host", "not a host"]);
        assert!(matches!(
            config.socket_addr(),
            Err(LoyaltyError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_engine_tunables_flow_through() {
        let config = server_config(&["program", "serve", "--list-limit", "25"]);
        assert_eq!(config.engine.list_limit, 25);
    }
}
