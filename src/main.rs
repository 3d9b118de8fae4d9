//! Streetdelic - account, comment and share-count API
//! Mission: Role-based logins with bearer tokens guarding the write paths

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streetdelic_backend::{
    app,
    auth::{AuthState, Role, TokenService, UserStore},
    config::{load_env, Cli, Command, ServerArgs},
    content::ContentStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.server).await,
        Command::AddVendor {
            email,
            password,
            username,
        } => add_vendor(&cli.server, &email, &password, username.as_deref()),
    }
}

async fn serve(args: ServerArgs) -> Result<()> {
    info!("Streetdelic backend starting");

    let user_store = Arc::new(UserStore::new(&args.db_path)?);
    let content = Arc::new(ContentStore::new(&args.db_path)?);
    let tokens = Arc::new(TokenService::with_ttl(
        &args.jwt_secret(),
        Duration::seconds(args.token_ttl_secs),
    ));
    info!(
        db = %args.db_path,
        token_ttl_secs = args.token_ttl_secs,
        "Stores and token service initialized"
    );

    let app = app::router(AuthState::new(user_store, tokens), content);

    let addr = args.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn add_vendor(args: &ServerArgs, email: &str, password: &str, username: Option<&str>) -> Result<()> {
    let store = UserStore::new(&args.db_path)?;
    let email = email.trim();

    match store.insert_if_absent(Role::Vendor, email, password, username)? {
        Some(account) => info!(id = %account.id, "Vendor {} created", email),
        None => warn!("Vendor {} already exists, nothing changed", email),
    }

    Ok(())
}

/// Initialize tracing; `RUST_LOG` overrides the default filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streetdelic_backend=debug,streetdelic=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
