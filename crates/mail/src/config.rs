//! OAuth credential loading
//!
//! Gmail API access needs an OAuth client id/secret pair. Lookup order:
//! 1. values baked in at compile time (release builds)
//! 2. a Google Cloud Console JSON file in the Xend config directory
//! 3. `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET` in the process environment

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CREDENTIALS_FILE: &str = "google-credentials.json";

/// OAuth client id/secret pair for the Gmail API
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of a credentials file downloaded from the Google Cloud Console.
/// Desktop clients carry an `installed` section, web clients a `web` section.
#[derive(Deserialize)]
struct CredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials from the first available source
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::embedded() {
            return Ok(creds);
        }
        if config::config_exists(CREDENTIALS_FILE) {
            return Self::from_sections(config::load_json(CREDENTIALS_FILE)?);
        }
        Self::from_env()
    }

    /// Credentials embedded at compile time.
    /// Build with: `GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release`
    fn embedded() -> Option<Self> {
        match (
            option_env!("GOOGLE_CLIENT_ID"),
            option_env!("GOOGLE_CLIENT_SECRET"),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(Self {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            }),
            _ => None,
        }
    }

    /// Read credentials from a Google Cloud Console JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_sections(config::load_json_file(path)?)
    }

    /// Parse credentials from Google Cloud Console JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_sections(file)
    }

    fn from_sections(file: CredentialFile) -> Result<Self> {
        let Some(section) = file.installed.or(file.web) else {
            bail!("Credentials file missing 'installed' or 'web' section");
        };
        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
    }

    /// Read credentials from `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: std::env::var("GMAIL_CLIENT_ID")
                .context("GMAIL_CLIENT_ID environment variable not set")?,
            client_secret: std::env::var("GMAIL_CLIENT_SECRET")
                .context("GMAIL_CLIENT_SECRET environment variable not set")?,
        })
    }

    /// Default credentials file location (~/.config/xend/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    /// Whether any credential source is present
    pub fn is_available() -> bool {
        Self::embedded().is_some()
            || config::config_exists(CREDENTIALS_FILE)
            || (std::env::var("GMAIL_CLIENT_ID").is_ok()
                && std::env::var("GMAIL_CLIENT_SECRET").is_ok())
    }
}
