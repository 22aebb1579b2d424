//! Application configuration and first-run credential setup.
//!
//! The plaintext TOML config holds only the non-secret `client_id`;
//! the client secret lives exclusively in the secure store under
//! `{client_id}.client_secret`. On first run, with no config file
//! present, the user is prompted interactively for both values.

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::store::{CredentialKind, Secret, SecretStore};

/// Plaintext configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth application client id (non-secret).
    pub client_id: String,
}

/// API credentials assembled from config file + secure store.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Secret,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .finish()
    }
}

/// Path of the plaintext config file.
pub fn config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("weeknotes.toml"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("blog", "almad", "weeknotes")
}

/// Load credentials from an existing config file and the secure store.
///
/// Returns `Ok(None)` when no config file exists yet (first run).
/// A config file whose client secret is missing from the store is an
/// error: the setup was only half completed and must be redone.
pub async fn load_credentials<S: SecretStore>(store: &S) -> Result<Option<Credentials>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config from {:?}", path))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config from {:?}", path))?;

    let secret_key = CredentialKind::ClientSecret.key_for(&config.client_id);
    let client_secret = match store.get(&secret_key).await? {
        Some(secret) => secret,
        None => bail!(
            "config file {:?} exists but no client secret is stored for client id {}; \
             delete the config file and run again to redo setup",
            path,
            config.client_id
        ),
    };

    Ok(Some(Credentials {
        client_id: config.client_id,
        client_secret,
    }))
}

/// Prompt interactively for client id + secret, persist them, and
/// return the fresh credentials.
///
/// The secret goes into the secure store; the id into the plaintext
/// config file, created inside a private directory.
pub async fn setup_interactive<S: SecretStore>(store: &S) -> Result<Credentials> {
    let (client_id, client_secret) = tokio::task::block_in_place(|| -> Result<_> {
        let client_id = prompt_line("Enter client id: ")?;
        if client_id.is_empty() {
            bail!("client id must not be empty");
        }
        let client_secret = rpassword::prompt_password("Enter client secret: ")
            .context("failed to read client secret")?;
        Ok((client_id, client_secret.trim().to_string()))
    })?;

    let secret = Secret::new(client_secret);
    let secret_key = CredentialKind::ClientSecret.key_for(&client_id);
    store.set(&secret_key, &secret).await?;

    let path = config_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {:?}", dir))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
                .with_context(|| format!("failed to restrict permissions on {:?}", dir))?;
        }
    }

    let config = Config {
        client_id: client_id.clone(),
    };
    let contents = toml::to_string_pretty(&config).context("failed to serialize config")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write config to {:?}", path))?;

    tracing::info!("Stored client credentials; config written to {:?}", path);

    Ok(Credentials {
        client_id,
        client_secret: secret,
    })
}

/// Load existing credentials or run first-time setup.
pub async fn load_or_setup<S: SecretStore>(store: &S) -> Result<Credentials> {
    match load_credentials(store).await? {
        Some(credentials) => Ok(credentials),
        None => {
            println!("No configuration found, running first-time setup.");
            setup_interactive(store).await
        }
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim().to_string())
}
