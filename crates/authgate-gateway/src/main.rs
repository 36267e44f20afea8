//! authgate - request-authorization gateway.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use authgate_core::{CookieNames, SessionCodec};
use authgate_gateway::GatewayConfig;

#[derive(Parser)]
#[command(name = "authgate")]
#[command(about = "Request-authorization gateway for protected backend resources")]
#[command(version)]
struct Cli {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    bind_address: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Base URL of the protected upstream
    #[arg(long, env = "AUTHGATE_UPSTREAM_URL", default_value = "http://127.0.0.1:8090")]
    upstream_url: String,

    /// Base URL of the token issuer/verifier backend
    #[arg(long, env = "AUTHGATE_VERIFIER_URL", default_value = "http://127.0.0.1:8090")]
    verifier_url: String,

    /// Hex-encoded session-token signing secret
    #[arg(long, env = "AUTHGATE_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Cookie name carrying the API token
    #[arg(long, default_value = "ag_token")]
    api_cookie: String,

    /// Cookie name carrying the session token
    #[arg(long, default_value = "ag_session_token")]
    session_cookie: String,

    /// Session-token lifetime in seconds
    #[arg(long, default_value_t = 900)]
    session_ttl_secs: u64,

    /// Backend verification timeout in seconds
    #[arg(long, default_value_t = 5)]
    verify_timeout_secs: u64,

    /// Print a freshly generated signing secret and exit
    #[arg(long)]
    generate_secret: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if cli.generate_secret {
        println!("{}", SessionCodec::generate_hex_secret());
        return Ok(());
    }

    let mut builder = GatewayConfig::builder()
        .bind_address(cli.bind_address)
        .port(cli.port)
        .upstream_url(cli.upstream_url)
        .verifier_url(cli.verifier_url)
        .cookies(CookieNames {
            api: cli.api_cookie,
            session: cli.session_cookie,
        })
        .session_ttl_secs(cli.session_ttl_secs)
        .verify_timeout_secs(cli.verify_timeout_secs);

    if let Some(secret) = cli.jwt_secret {
        builder = builder.jwt_secret(secret);
    }

    let config = builder.build().with_env_overrides();

    authgate_gateway::start(config)
        .await
        .context("Gateway failed")?;

    Ok(())
}
