//! Weeknotes CLI
//!
//! Command-line interface for generating weekly notes.
//!
//! # Usage
//!
//! ```bash
//! # Generate this week's note (runs first-time setup if needed)
//! weeknotes generate
//!
//! # Print the activity sentence without writing a note
//! weeknotes report
//!
//! # Force the interactive browser authorization
//! weeknotes login
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Local, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use weeknotes_core::{
    ActivityClient, Credentials, KeyringStore, Secret, TokenAuthority, TokenError, WeeklyReport,
    config, note, readings,
};

#[derive(Parser)]
#[command(name = "weeknotes")]
#[command(about = "Generate weekly notes from Strava activities and saved readings")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate this week's note and write it to disk
    Generate {
        /// How many days of activities to include
        #[arg(long, default_value_t = 7)]
        since_days: i64,

        /// Profile name to pull recommended readings from
        #[arg(long)]
        pocket_user: Option<String>,

        /// Directory to write the note into (defaults to
        /// content/notes/<year>/ when it exists, else the current dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the weekly activity sentence without writing a note
    Report {
        /// How many days of activities to include
        #[arg(long, default_value_t = 7)]
        since_days: i64,
    },

    /// Run the interactive browser authorization, replacing any
    /// stored tokens
    Login,

    /// Delete stored tokens (keeps the client id and secret)
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            since_days,
            pocket_user,
            output,
        } => generate(since_days, pocket_user.as_deref(), output.as_deref()).await,
        Commands::Report { since_days } => report(since_days).await,
        Commands::Login => login().await,
        Commands::Logout => logout().await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn generate(
    since_days: i64,
    pocket_user: Option<&str>,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let (authority, credentials) = connect().await?;
    let sentence = weekly_sentence(&authority, &credentials, since_days).await?;

    let today = Local::now().date_naive();
    let recommended = match pocket_user {
        Some(username) => readings::fetch_recommendations(username, today)
            .await
            .context("failed to fetch recommended readings")?,
        None => Vec::new(),
    };

    let path = note::write_note(output, today, &sentence, &recommended)
        .context("failed to write the weeknote")?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn report(since_days: i64) -> Result<()> {
    let (authority, credentials) = connect().await?;
    let sentence = weekly_sentence(&authority, &credentials, since_days).await?;
    println!("{}", sentence);
    Ok(())
}

async fn login() -> Result<()> {
    let (authority, credentials) = connect().await?;

    // A still-valid stored token would satisfy the poll immediately,
    // so drop tokens first to force a fresh consent.
    authority.forget_tokens(&credentials).await?;
    authority
        .bootstrap(&credentials)
        .await
        .context("interactive authorization failed")?;
    println!("Authorization complete.");
    Ok(())
}

async fn logout() -> Result<()> {
    let (authority, credentials) = connect().await?;
    authority.forget_tokens(&credentials).await?;
    println!("Stored tokens deleted.");
    Ok(())
}

/// Open the secure store and load (or interactively set up)
/// credentials.
async fn connect() -> Result<(TokenAuthority<KeyringStore>, Credentials)> {
    let store = KeyringStore::new().context("secure store unavailable")?;
    let credentials = config::load_or_setup(&store).await?;
    // The authority takes ownership; open a second handle for it.
    let store = KeyringStore::new().context("secure store unavailable")?;
    Ok((TokenAuthority::new(store), credentials))
}

/// Resolve a token (bootstrapping interactively if required) and build
/// the weekly activity sentence.
async fn weekly_sentence(
    authority: &TokenAuthority<KeyringStore>,
    credentials: &Credentials,
    since_days: i64,
) -> Result<String> {
    let token = obtain_token(authority, credentials).await?;

    let since = Utc::now() - Duration::days(since_days);
    let activities = ActivityClient::new()
        .fetch_activities(token.expose(), Some(since))
        .await
        .context("failed to fetch activities")?;
    tracing::debug!("Fetched {} activities since {}", activities.len(), since);

    Ok(WeeklyReport::from_activities(&activities).sentence())
}

/// Steady-state token resolution, falling back to the one-time
/// interactive bootstrap when no stored authorization exists.
async fn obtain_token(
    authority: &TokenAuthority<KeyringStore>,
    credentials: &Credentials,
) -> Result<Secret> {
    match authority.access_token(credentials).await {
        Ok(token) => Ok(token),
        Err(TokenError::BootstrapRequired) => {
            println!("No stored authorization yet, starting one-time browser login.");
            authority
                .bootstrap(credentials)
                .await
                .context("interactive authorization failed")
        }
        Err(e) => Err(e).context("failed to obtain access token"),
    }
}
