use std::sync::Arc;

use reqwest::{Client, Url};
use tokio::sync::Mutex;

use crate::{
    config::{ApiEndpoints, AUTH_SCOPE, PluginSettings, REDIRECT_URI},
    error,
    host::{LoginWindow, SettingsStore},
    info,
    retry::RetryPolicy,
    spotify::auth::{self, GrantError},
    success,
    types::{Token, TokenResponse},
    warning,
};

/// Owns the OAuth token lifecycle: the login flow, the authorization-code
/// and refresh-token grants, and the "give me a currently valid access
/// token" query the playback layer builds on.
pub struct AuthController {
    settings: Mutex<PluginSettings>,
    token: Mutex<Option<Token>>,
    store: Arc<dyn SettingsStore>,
    login_window: Arc<dyn LoginWindow>,
    endpoints: ApiEndpoints,
    retry: RetryPolicy,
    client: Client,
}

impl AuthController {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        login_window: Arc<dyn LoginWindow>,
        endpoints: ApiEndpoints,
        retry: RetryPolicy,
    ) -> Self {
        let settings = match store.load() {
            Ok(settings) => settings.sanitize(),
            Err(e) => {
                warning!("failed to load plugin settings, starting empty: {}", e);
                PluginSettings::default()
            }
        };

        AuthController {
            settings: Mutex::new(settings),
            token: Mutex::new(None),
            store,
            login_window,
            endpoints,
            retry,
            client: Client::new(),
        }
    }

    /// Opens the login window on the authorization page and, once a code is
    /// captured, runs the token exchange. Returns without side effects when
    /// no client id is configured or the window is closed early.
    pub async fn initiate_login_flow(&self) {
        let client_id = self.settings.lock().await.client_id.clone();
        let Some(client_id) = client_id else {
            warning!("login flow requires a client id; set one in the plugin settings");
            return;
        };

        let url = match Url::parse_with_params(
            &self.endpoints.authorize_url(),
            &[
                ("response_type", "code"),
                ("client_id", client_id.as_str()),
                ("redirect_uri", REDIRECT_URI),
                ("scope", AUTH_SCOPE),
            ],
        ) {
            Ok(url) => url,
            Err(e) => {
                error!("failed to build authorization url: {}", e);
                return;
            }
        };

        info!("opening login window");
        match self.login_window.open_and_await_code(url.as_str()).await {
            Some(code) => {
                {
                    let mut settings = self.settings.lock().await;
                    settings.client_authorization = Some(code.clone());
                    self.save_settings(&settings);
                }
                if self.exchange_code_for_token(&code).await {
                    success!("Spotify login complete");
                }
            }
            None => info!("login window closed without authorization"),
        }
    }

    /// Exchanges a one-time authorization code for the initial token pair.
    /// On success the code is removed from the settings again; it is spent.
    pub async fn exchange_code_for_token(&self, code: &str) -> bool {
        let (client_id, client_secret) = {
            let settings = self.settings.lock().await;
            (settings.client_id.clone(), settings.client_secret.clone())
        };
        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            warning!("token exchange requires a client id and client secret");
            return false;
        };

        match auth::exchange_code(
            &self.client,
            &self.endpoints,
            &self.retry,
            &client_id,
            &client_secret,
            code,
        )
        .await
        {
            Ok(response) => {
                self.install_token(&response).await;
                let mut settings = self.settings.lock().await;
                if let Some(refresh) = response.refresh_token {
                    settings.client_refresh_token = Some(refresh);
                }
                settings.client_authorization = None;
                self.save_settings(&settings);
                true
            }
            Err(e) => {
                error!("token exchange failed: {}", e);
                false
            }
        }
    }

    /// Trades the stored refresh token for a fresh access token. A rotated
    /// refresh token is persisted before the old one is forgotten. An
    /// `invalid_grant` rejection purges the stored refresh token so the only
    /// way forward is a fresh login flow.
    pub async fn refresh_access_token(&self) -> bool {
        let (client_id, client_secret, refresh_token) = {
            let settings = self.settings.lock().await;
            (
                settings.client_id.clone(),
                settings.client_secret.clone(),
                settings.client_refresh_token.clone(),
            )
        };
        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            warning!("token refresh requires a client id and client secret");
            return false;
        };
        let Some(refresh_token) = refresh_token else {
            warning!("no refresh token stored; a new login is required");
            return false;
        };

        match auth::refresh_grant(
            &self.client,
            &self.endpoints,
            &self.retry,
            &client_id,
            &client_secret,
            &refresh_token,
        )
        .await
        {
            Ok(response) => {
                self.install_token(&response).await;
                if let Some(rotated) = response.refresh_token {
                    let mut settings = self.settings.lock().await;
                    settings.client_refresh_token = Some(rotated);
                    self.save_settings(&settings);
                }
                true
            }
            Err(GrantError::InvalidGrant) => {
                warning!("refresh token rejected by Spotify; a new login is required");
                {
                    let mut settings = self.settings.lock().await;
                    settings.client_refresh_token = None;
                    self.save_settings(&settings);
                }
                *self.token.lock().await = None;
                false
            }
            Err(e) => {
                error!("token refresh failed: {}", e);
                false
            }
        }
    }

    /// Returns a currently valid access token, refreshing when the cached
    /// one has expired. `None` means no token can be obtained without a
    /// fresh login flow; this method never runs the code exchange itself.
    pub async fn valid_token(&self) -> Option<String> {
        {
            let token = self.token.lock().await;
            if let Some(token) = token.as_ref() {
                if token.is_valid() {
                    return Some(token.secret().to_string());
                }
            }
        }

        if self.refresh_access_token().await {
            let token = self.token.lock().await;
            return token.as_ref().map(|t| t.secret().to_string());
        }
        None
    }

    /// Drops the cached token so the next request is forced through a
    /// refresh. Called by the playback layer on 401/403 responses.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Stores new client credentials from the host's preference rows.
    pub async fn update_client_credentials(
        &self,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) {
        let mut settings = self.settings.lock().await;
        let updated = PluginSettings {
            client_id,
            client_secret,
            client_authorization: settings.client_authorization.clone(),
            client_refresh_token: settings.client_refresh_token.clone(),
        }
        .sanitize();
        *settings = updated;
        self.save_settings(&settings);
    }

    async fn install_token(&self, response: &TokenResponse) {
        let token = Token::new(response.access_token.clone(), response.expires_in);
        *self.token.lock().await = Some(token);
    }

    fn save_settings(&self, settings: &PluginSettings) {
        if let Err(e) = self.store.save(settings) {
            warning!("failed to persist plugin settings: {}", e);
        }
    }
}
