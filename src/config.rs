//! Command line and environment configuration

use crate::auth::jwt::DEFAULT_TOKEN_TTL_SECS;
use clap::{Args, Parser, Subcommand};
use std::path::Path;
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

/// Streetdelic backend: accounts, bearer tokens, comments and share counts
#[derive(Parser, Debug)]
#[command(name = "streetdelic")]
#[command(about = "Auth-gated comment and share-count API")]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,

    /// Create a vendor account
    AddVendor {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Display name shown on the vendor dashboard
        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite file holding accounts, comments and share counts
    #[arg(long, env = "DATABASE_PATH", default_value = "streetdelic.db")]
    pub db_path: String,

    /// HMAC secret for signing tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub token_ttl_secs: i64,
}

impl ServerArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured secret, or the development fallback with a loud warning
    pub fn jwt_secret(&self) -> String {
        match self.jwt_secret.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret.to_string(),
            None => {
                warn!("JWT_SECRET not set - using development secret, do not deploy like this");
                DEV_JWT_SECRET.to_string()
            }
        }
    }
}

/// Load `.env` from the working directory and from the crate directory
pub fn load_env() {
    let _ = dotenv::dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
