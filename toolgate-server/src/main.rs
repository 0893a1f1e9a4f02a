//! toolgate-server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use toolgate_core::permission::Policy;
use toolgate_server::{Config, DemoExecutor, GateRouter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "toolgate-server", version, about = "Authenticated, audited tool-call server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Path to the TOML config file.
        #[arg(long, short)]
        config: PathBuf,

        /// Override `server.bind`.
        #[arg(long)]
        bind: Option<String>,

        /// Override `logging.level`. `RUST_LOG` takes precedence.
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Print a signed token for the configured secret.
    IssueToken {
        #[arg(long, short)]
        config: PathBuf,

        /// Stable user id (`sub`).
        #[arg(long)]
        subject: String,

        #[arg(long)]
        username: String,

        /// Permission or role reference; repeatable.
        #[arg(long = "permission", short)]
        permissions: Vec<String>,

        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
    },

    /// Parse a policy document and list its roles.
    CheckPolicy {
        path: PathBuf,
    },
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

async fn serve(config: PathBuf, bind: Option<String>, log_level: Option<String>) -> anyhow::Result<()> {
    let config = Config::load(&config)
        .with_context(|| format!("loading config {}", config.display()))?;
    init_logging(log_level.as_deref().unwrap_or(&config.logging.level));

    let parts = config
        .build_gate(Arc::new(DemoExecutor))
        .await
        .context("assembling security gate")?;

    let mut router = GateRouter::new(parts.gate);
    if let Some(timeout) = config.request_timeout() {
        router = router.request_timeout(timeout);
    }
    let app = router.build()?;

    let bind = bind.unwrap_or(config.server.bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    log::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for shutdown signal: {}", e);
            }
            log::info!("shutting down");
        })
        .await?;

    // Router dropped; let the audit writer drain
    if let Some(task) = parts.audit_task {
        task.await?.context("flushing audit log")?;
    }
    Ok(())
}

fn issue_token(
    config: PathBuf,
    subject: String,
    username: String,
    permissions: Vec<String>,
    ttl_secs: i64,
) -> anyhow::Result<()> {
    if ttl_secs <= 0 {
        bail!("--ttl-secs must be positive");
    }
    let config = Config::load(&config)
        .with_context(|| format!("loading config {}", config.display()))?;
    let Some(tokens) = config.token_authenticator()? else {
        bail!("auth.token_secret is not set (or set {})", toolgate_server::config::TOKEN_SECRET_ENV);
    };

    let token = tokens.issue(
        subject,
        username,
        permissions,
        chrono::Duration::seconds(ttl_secs),
    )?;
    println!("{}", token);
    Ok(())
}

fn check_policy(path: PathBuf) -> anyhow::Result<()> {
    let policy = Policy::load(&path).with_context(|| format!("loading policy {}", path.display()))?;
    for role in policy.roles() {
        let namespaces = if role.namespaces.is_empty() {
            "all namespaces".to_string()
        } else {
            role.namespaces.join(", ")
        };
        println!("{} ({}): {}", role.name, namespaces, role.permissions.join(", "));
    }
    println!("{} roles OK", policy.roles().len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            bind,
            log_level,
        } => serve(config, bind, log_level).await,
        Command::IssueToken {
            config,
            subject,
            username,
            permissions,
            ttl_secs,
        } => issue_token(config, subject, username, permissions, ttl_secs),
        Command::CheckPolicy { path } => check_policy(path),
    }
}
