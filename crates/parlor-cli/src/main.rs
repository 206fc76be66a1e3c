//! Parlor command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Token and user id usually come from the environment
//! export PARLOR_TOKEN=... PARLOR_USER_ID=42
//! parlor --endpoint wss://forum.example/ws
//!
//! # REST API somewhere else than <endpoint host>/api/
//! parlor --endpoint wss://chat.forum.example/ws --api https://forum.example/api/
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use parlor_app::{Runtime, SystemEnv};
use parlor_cli::{
    TerminalAdapter, TokioDriver,
    driver::{api_base, with_trailing_slash},
};
use parlor_client::{Credentials, Session, SessionConfig, rest::HttpApi};
use parlor_proto::UserId;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Parlor direct-message client
#[derive(Parser, Debug)]
#[command(name = "parlor")]
#[command(about = "Terminal client for Parlor direct messages")]
#[command(version)]
struct Args {
    /// WebSocket endpoint (http and https are mapped to ws and wss)
    #[arg(short, long, env = "PARLOR_ENDPOINT", default_value = "ws://localhost:8080/ws")]
    endpoint: String,

    /// REST API base URL (default: /api/ on the endpoint's host)
    #[arg(long, env = "PARLOR_API")]
    api: Option<String>,

    /// Auth token issued at login
    #[arg(long, env = "PARLOR_TOKEN", hide_env_values = true)]
    token: String,

    /// Own user id
    #[arg(long, env = "PARLOR_USER_ID")]
    user_id: UserId,

    /// Timer resolution in milliseconds
    #[arg(long, default_value = "250")]
    tick_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout belongs to the conversation view
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("crypto provider already installed");
    }

    let config = SessionConfig::new(&args.endpoint)?;
    let api = match args.api {
        Some(raw) => with_trailing_slash(Url::parse(&raw)?),
        None => api_base(&config.endpoint).ok_or("cannot derive the API URL from the endpoint")?,
    };

    tracing::info!(endpoint = %config.endpoint, %api, "Parlor client starting");

    let credentials = Credentials::new(args.user_id, args.token.clone());
    let session = Session::new(SystemEnv::new(), Arc::new(credentials), config);
    let driver = TokioDriver::new(HttpApi::new(api, args.token), Duration::from_millis(args.tick_ms));
    let ui = TerminalAdapter::stdout(args.user_id);

    Runtime::new(driver, session, ui).run().await?;

    Ok(())
}
