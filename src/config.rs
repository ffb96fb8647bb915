//! Environment-driven configuration.
//!
//! Everything optional degrades gracefully: without Discord credentials the
//! server still runs, it just reports auth and the bot as unconfigured.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub archive_dir: PathBuf,
    pub discord_client_id: Option<String>,
    pub discord_client_secret: Option<String>,
    pub discord_redirect_uri: String,
    pub discord_bot_token: Option<String>,
    pub discord_channel_id: Option<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            db_path: PathBuf::from("pipehub.db"),
            archive_dir: PathBuf::from("old-tickets"),
            discord_client_id: None,
            discord_client_secret: None,
            discord_redirect_uri: "http://localhost:8000/auth/callback".to_string(),
            discord_bot_token: None,
            discord_channel_id: None,
        }
    }
}

impl HubConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup function (process env in production, a plain
    /// map in tests). Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            port: get("PIPEHUB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            db_path: get("PIPEHUB_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            archive_dir: get("PIPEHUB_ARCHIVE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.archive_dir),
            discord_client_id: get("DISCORD_CLIENT_ID"),
            discord_client_secret: get("DISCORD_CLIENT_SECRET"),
            discord_redirect_uri: get("DISCORD_REDIRECT_URI")
                .unwrap_or(defaults.discord_redirect_uri),
            discord_bot_token: get("DISCORD_BOT_TOKEN"),
            discord_channel_id: get("DISCORD_CHANNEL_ID"),
        }
    }

    /// True when both OAuth credentials are present.
    pub fn oauth_configured(&self) -> bool {
        self.discord_client_id.is_some() && self.discord_client_secret.is_some()
    }

    /// True when the bot has a token to talk to Discord with.
    pub fn bot_configured(&self) -> bool {
        self.discord_bot_token.is_some()
    }
}
