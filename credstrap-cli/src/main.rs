//! credstrap CLI
//!
//! Command-line interface for bootstrapping OAuth credentials.
//!
//! # Usage
//!
//! ```bash
//! # Run the interactive flow and save the token
//! credstrap login --client-secret client_secret.json --out token.json
//!
//! # Same, but encrypt the token file at rest
//! credstrap login --client-secret client_secret.json --out token.enc --encrypt
//!
//! # Inspect a token file
//! credstrap show-token token.json
//!
//! # Look up the configured user, or act as another one via the service account
//! credstrap whoami
//! credstrap impersonate --subject user@example.com
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use credstrap_core::{
    ApiConfig, CallContext, ClientRegistry, ConsolePrompt, CredentialKind, InteractiveAuthorizer,
    ScopeSet, Secret, Token, TokenStore, userinfo,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_TOKEN_PATH: &str = "token.json";

#[derive(Parser)]
#[command(name = "credstrap")]
#[command(about = "Bootstrap OAuth credentials and authenticated API clients")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive authorization flow and save the token
    Login {
        /// Client secret definition file
        #[arg(long)]
        client_secret: Option<PathBuf>,

        /// OAuth scopes to request (comma-separated)
        #[arg(short, long)]
        scopes: Option<String>,

        /// Where to write the token
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Encrypt the token file at rest
        #[arg(long)]
        encrypt: bool,

        /// Passphrase for encryption (generated and printed when omitted)
        #[arg(long, requires = "encrypt")]
        passphrase: Option<String>,
    },

    /// Print a summary of a token file
    ShowToken {
        /// Token file
        path: PathBuf,

        /// Passphrase of an encrypted token file
        #[arg(long)]
        passphrase: Option<String>,

        /// Print secret values instead of redacting them
        #[arg(long)]
        reveal: bool,
    },

    /// Fetch the profile of the configured delegated user
    Whoami,

    /// Act as a user through the service account and fetch their profile
    Impersonate {
        /// User to act as (defaults to oauth_user_email)
        #[arg(long, default_value = "")]
        subject: String,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Write an empty configuration file
    InitConfig {
        /// Destination (defaults to --config or the platform config directory)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Login {
            client_secret,
            scopes,
            out,
            encrypt,
            passphrase,
        } => {
            let config = load_config_or_default(cli.config.as_deref())?;
            login(&config, client_secret, scopes.as_deref(), out, encrypt, passphrase).await
        }
        Commands::ShowToken {
            path,
            passphrase,
            reveal,
        } => show_token(&path, passphrase, reveal),
        Commands::Whoami => {
            let config = load_config(cli.config.as_deref())?;
            whoami(&config).await
        }
        Commands::Impersonate { subject, timeout } => {
            let config = load_config(cli.config.as_deref())?;
            impersonate(&config, &subject, Duration::from_secs(timeout)).await
        }
        Commands::InitConfig { path } => {
            let path = match path.or(cli.config) {
                Some(path) => path,
                None => ApiConfig::default_path()?,
            };
            init_config(&path)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(ApiConfig::default_path()?),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<ApiConfig> {
    let path = config_path(explicit)?;
    ApiConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Like [`load_config`], but a missing default configuration is not an error.
fn load_config_or_default(explicit: Option<&Path>) -> Result<ApiConfig> {
    let path = config_path(explicit)?;
    if explicit.is_none() && !path.exists() {
        return Ok(ApiConfig::default());
    }
    load_config(Some(&path))
}

fn parse_scopes(arg: Option<&str>, configured: &ScopeSet) -> ScopeSet {
    match arg {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect(),
        None if configured.is_empty() => ScopeSet::admin(),
        None => configured.clone(),
    }
}

async fn login(
    config: &ApiConfig,
    client_secret: Option<PathBuf>,
    scopes: Option<&str>,
    out: Option<PathBuf>,
    encrypt: bool,
    passphrase: Option<String>,
) -> Result<()> {
    let definition = match &client_secret {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read client secret {}", path.display()))?,
        None => config.client_secret_definition()?,
    };
    let scopes = parse_scopes(scopes, &config.oauth_scopes);
    let out = out
        .or_else(|| config.oauth_token_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH));

    info!(scopes = scopes.len(), "Starting interactive authorization");
    let mut authorizer = InteractiveAuthorizer::new();
    let token = authorizer
        .authorize(&definition, &scopes, &ConsolePrompt)
        .await
        .context("Authorization failed")?;

    let store = match passphrase {
        Some(passphrase) => TokenStore::with_passphrase(passphrase),
        None => TokenStore::new(),
    };
    let used = store.persist(&token, &out, encrypt)?;

    println!("Saved token to {}", out.display());
    if let Some(generated) = used.filter(|_| store.passphrase().is_none()) {
        eprintln!("Generated passphrase (store it safely): {}", generated.expose());
    }
    Ok(())
}

fn show_token(path: &Path, passphrase: Option<String>, reveal: bool) -> Result<()> {
    let store = TokenStore::new();
    let token = match passphrase {
        Some(passphrase) => store.load_encrypted(path, &Secret::new(passphrase))?,
        None => store.load(path)?,
    };

    println!("{}", serde_json::to_string_pretty(&token_summary(&token, reveal))?);
    Ok(())
}

fn token_summary(token: &Token, reveal: bool) -> serde_json::Value {
    let shown = |secret: &Secret| {
        if reveal {
            secret.expose().to_string()
        } else {
            secret.to_string()
        }
    };

    serde_json::json!({
        "token_type": token.token_type,
        "access_token": shown(&token.access_token),
        "refresh_token": token.refresh_token.as_ref().map(shown),
        "expiry": token.expiry.map(|e| e.to_rfc3339()),
        "expired": token.is_expired(),
        "scopes": token.scopes,
    })
}

async fn whoami(config: &ApiConfig) -> Result<()> {
    let handle = config.delegated_client()?;
    let info = userinfo::fetch_user_info(&handle)
        .await
        .context("Failed to fetch user info")?;

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

async fn impersonate(config: &ApiConfig, subject: &str, timeout: Duration) -> Result<()> {
    let registry = ClientRegistry::new();
    registry.install(config.service_account_client(subject)?, CredentialKind::ServiceAccount);

    let (_, option) = registry.context_for(CredentialKind::ServiceAccount)?;
    let ctx = CallContext::background().with_timeout(timeout);

    let info = ctx
        .run(userinfo::fetch_user_info(option.transport()))
        .await?
        .context("Failed to fetch user info")?;

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    ApiConfig::write_template(path)?;
    println!("Wrote configuration template to {}", path.display());
    Ok(())
}
