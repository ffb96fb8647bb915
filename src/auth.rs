//! Discord OAuth2 gateway.
//!
//! Builds the authorization URL the browser is redirected to, exchanges the
//! returned code for an access token, and fetches the user's Discord profile
//! with it. All upstream calls go through one `reqwest::Client` with a
//! request timeout so a stalled Discord API cannot hang a login.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";
const DISCORD_API_BASE: &str = "https://discord.com/api";

/// Scopes requested on login. Includes the bot scopes so one authorization
/// both signs the user in and can install the companion bot into a guild.
const OAUTH_SCOPES: &str = "bot applications.commands identify guilds guilds.members.read";

/// Administrator permission bits requested for the bot install.
const BOT_PERMISSIONS: &str = "8";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Response from Discord's token endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Outcome of a completed login: the Discord profile plus the token the
/// frontend holds onto for the session.
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub user: serde_json::Value,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct DiscordOauth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    api_base: String,
    client: reqwest::Client,
}

impl DiscordOauth {
    /// Returns `None` when either credential is missing, so callers can fall
    /// back to an unconfigured gateway that rejects logins cleanly.
    pub fn from_credentials(
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: String,
    ) -> Option<Self> {
        let client_id = client_id.filter(|s| !s.is_empty())?;
        let client_secret = client_secret.filter(|s| !s.is_empty())?;
        Some(Self::with_api_base(
            client_id,
            client_secret,
            redirect_uri,
            DISCORD_API_BASE.to_string(),
        ))
    }

    fn with_api_base(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        api_base: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            api_base,
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// The URL the login endpoint redirects the browser to.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&permissions={}",
            DISCORD_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            BOT_PERMISSIONS,
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(format!("{}/oauth2/token", self.api_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AuthError::Exchange {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(resp.json::<TokenResponse>().await?)
    }

    /// Fetch the authenticated user's profile with a bearer token.
    pub async fn fetch_user(&self, access_token: &str) -> Result<serde_json::Value, AuthError> {
        let resp = self
            .client
            .get(format!("{}/users/@me", self.api_base))
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AuthError::Profile {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(resp.json::<serde_json::Value>().await?)
    }

    /// Full callback flow: code -> token -> profile.
    pub async fn complete_login(&self, code: &str) -> Result<LoginOutcome, AuthError> {
        let token = self.exchange_code(code).await?;
        let user = self.fetch_user(&token.access_token).await?;
        Ok(LoginOutcome {
            user,
            access_token: token.access_token,
        })
    }
}
