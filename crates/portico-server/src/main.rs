//! Portico server: configuration, logging, storage, and the HTTP listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use portico_auth::AuthConfig;
use portico_auth::config::MAX_LIFETIME_SECS;
use portico_core::repository::{PendingSignupRepository, SessionRepository};
use portico_db::repository::{SurrealPendingSignupRepository, SurrealSessionRepository};
use portico_db::{DbConfig, DbManager};
use portico_web::{AppState, SameSite, WebConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const MIN_SIGNING_KEY_LEN: usize = 32;

#[derive(Parser)]
#[command(name = "portico")]
#[command(about = "Multi-tenant signup, login and session service")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SurrealDB endpoint: `memory`, or e.g. `ws://127.0.0.1:8000`
    #[arg(long, env = "PORTICO_DB_URL", default_value = "memory", global = true)]
    db_url: String,

    #[arg(long, env = "PORTICO_DB_NAMESPACE", default_value = "portico", global = true)]
    db_namespace: String,

    #[arg(long, env = "PORTICO_DB_DATABASE", default_value = "main", global = true)]
    db_database: String,

    #[arg(long, env = "PORTICO_DB_USER", global = true)]
    db_user: Option<String>,

    #[arg(long, env = "PORTICO_DB_PASSWORD", global = true, hide_env_values = true)]
    db_password: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve HTTP
    Serve(ServeArgs),
    /// Delete expired pending signups and sessions, then exit
    Purge,
}

#[derive(clap::Args)]
struct ServeArgs {
    #[arg(long, env = "PORTICO_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Apex domain; tenants are served at `<slug>.<root-domain>`
    #[arg(long, env = "PORTICO_ROOT_DOMAIN", default_value = "localhost")]
    root_domain: String,

    #[arg(long, env = "PORTICO_LINK_SCHEME", default_value = "https")]
    link_scheme: String,

    /// HMAC key for emailed links, at least 32 bytes
    #[arg(long, env = "PORTICO_SIGNING_KEY", hide_env_values = true)]
    signing_key: String,

    /// Retired signing keys still accepted for verification
    #[arg(
        long,
        env = "PORTICO_PREVIOUS_SIGNING_KEYS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    previous_signing_keys: Vec<String>,

    #[arg(long, env = "PORTICO_PASSWORD_PEPPER", hide_env_values = true)]
    password_pepper: Option<String>,

    #[arg(long, env = "PORTICO_SESSION_TTL_SECS", default_value_t = 86_400)]
    session_ttl_secs: u64,

    #[arg(long, env = "PORTICO_SIGNUP_TTL_SECS", default_value_t = 86_400)]
    signup_ttl_secs: u64,

    #[arg(long, env = "PORTICO_MIN_PASSWORD_LENGTH", default_value_t = 8)]
    min_password_length: usize,

    #[arg(long, env = "PORTICO_SESSION_COOKIE", default_value = "portico_session")]
    session_cookie: String,

    /// Set to false only for plain-HTTP development
    #[arg(long, env = "PORTICO_COOKIE_SECURE", default_value_t = true, action = clap::ArgAction::Set)]
    cookie_secure: bool,

    #[arg(long, env = "PORTICO_SESSION_SAME_SITE", default_value = "lax")]
    session_same_site: SameSite,

    #[arg(long, env = "PORTICO_DEFAULT_LANG", default_value = "en")]
    default_lang: String,

    #[arg(long, env = "PORTICO_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    request_timeout_secs: u64,

    #[arg(long, env = "PORTICO_RATE_LIMIT_MAX", default_value_t = 10)]
    rate_limit_max: u32,

    #[arg(long, env = "PORTICO_RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    rate_limit_window_secs: u64,

    /// Key rate limits on `X-Forwarded-For` (only behind a trusted proxy)
    #[arg(long, env = "PORTICO_TRUST_FORWARDED_FOR", default_value_t = false)]
    trust_forwarded_for: bool,
}

impl ServeArgs {
    fn auth_config(&self) -> Result<AuthConfig> {
        ensure!(
            self.signing_key.len() >= MIN_SIGNING_KEY_LEN,
            "signing key must be at least {MIN_SIGNING_KEY_LEN} bytes"
        );
        for (name, secs) in [
            ("session TTL", self.session_ttl_secs),
            ("signup TTL", self.signup_ttl_secs),
        ] {
            ensure!(
                (1..=MAX_LIFETIME_SECS).contains(&secs),
                "{name} must be between 1 and {MAX_LIFETIME_SECS} seconds"
            );
        }
        Ok(AuthConfig {
            signing_key: self.signing_key.as_bytes().to_vec(),
            previous_signing_keys: self
                .previous_signing_keys
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| k.as_bytes().to_vec())
                .collect(),
            session_lifetime_secs: self.session_ttl_secs,
            signup_token_lifetime_secs: self.signup_ttl_secs,
            pepper: self.password_pepper.clone(),
            min_password_length: self.min_password_length,
        })
    }

    fn web_config(&self) -> WebConfig {
        WebConfig {
            root_domain: self.root_domain.to_ascii_lowercase(),
            link_scheme: self.link_scheme.clone(),
            session_cookie_name: self.session_cookie.clone(),
            cookie_secure: self.cookie_secure,
            session_same_site: self.session_same_site,
            default_lang: self.default_lang.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            rate_limit_max: self.rate_limit_max,
            rate_limit_window: Duration::from_secs(self.rate_limit_window_secs),
            trust_forwarded_for: self.trust_forwarded_for,
            ..Default::default()
        }
    }
}

impl Cli {
    fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_user.clone(),
            password: self.db_password.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portico=info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let db = DbManager::connect(&cli.db_config())
        .await
        .context("connecting to SurrealDB")?;
    portico_db::run_migrations(db.client())
        .await
        .context("applying schema migrations")?;

    match cli.command {
        Command::Serve(args) => serve(db, args).await,
        Command::Purge => purge(&db).await,
    }
}

async fn serve(db: DbManager, args: ServeArgs) -> Result<()> {
    let auth_config = args.auth_config()?;
    let web_config = args.web_config();
    info!(root_domain = %web_config.root_domain, "starting Portico");

    let state = Arc::new(AppState::new(db.client().clone(), auth_config, web_config));
    let app = portico_web::router(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, "HTTP server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await?;

    info!("Portico stopped");
    Ok(())
}

async fn purge(db: &DbManager) -> Result<()> {
    let pending = SurrealPendingSignupRepository::new(db.client().clone())
        .purge_expired()
        .await?;
    let sessions = SurrealSessionRepository::new(db.client().clone())
        .purge_expired()
        .await?;
    info!(pending, sessions, "expired rows purged");
    Ok(())
}
