/// Session manager
///
/// Owns the auth state and every transition of it. Authenticated requests go
/// through [`SessionManager::execute`], which refreshes the access token at
/// most once per request when the backend answers 401.
use super::{
    AuthAction, AuthResponse, AuthState, AuthTokens, LoginRequest, Organization,
    PersistedSession, ProfileUpdate, SessionPhase, SessionStorage, SignupData, User,
};
use crate::{
    client::{decode_body, endpoints, ApiClient, ApiRequest},
    error::{ClientError, ClientResult},
    metrics,
};
use parking_lot::RwLock;
use reqwest::Method;
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use validator::Validate;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// The refresh endpoint has answered both bare and wrapped token pairs
#[derive(Deserialize)]
#[serde(untagged)]
enum RefreshResponse {
    Wrapped { tokens: AuthTokens },
    Bare(AuthTokens),
}

impl RefreshResponse {
    fn into_tokens(self) -> AuthTokens {
        match self {
            RefreshResponse::Wrapped { tokens } | RefreshResponse::Bare(tokens) => tokens,
        }
    }
}

pub struct SessionManager {
    api: ApiClient,
    storage: Arc<dyn SessionStorage>,
    state: RwLock<AuthState>,
    /// Serializes token refreshes
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(api: ApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            api,
            storage,
            state: RwLock::new(AuthState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn dispatch(&self, action: AuthAction) {
        debug!("Auth action {}", action.name());
        let mut state = self.state.write();
        let current = std::mem::take(&mut *state);
        *state = current.apply(action);
    }

    pub fn state(&self) -> AuthState {
        self.state.read().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.read().phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn organization(&self) -> Option<Organization> {
        self.state.read().organization.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .tokens
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.state.read().permissions.contains(permission)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.state
            .read()
            .user
            .as_ref()
            .is_some_and(|user| user.role == role)
    }

    pub fn clear_error(&self) {
        self.dispatch(AuthAction::ClearError);
    }

    /// Reuse a persisted session at startup.
    ///
    /// The stored access token is checked against `/auth/me`; if that fails
    /// the stored refresh token gets one attempt. Anything else ends
    /// unauthenticated with storage cleared. Permissions are not part of the
    /// persisted session and stay empty after a restore.
    pub async fn restore(&self) -> SessionPhase {
        self.dispatch(AuthAction::Start);

        let Some(stored) = PersistedSession::load(self.storage.as_ref()).await else {
            debug!("No persisted session found");
            self.dispatch(AuthAction::Logout);
            return self.phase();
        };

        let me = ApiRequest::get("auth.me", endpoints::ME);
        let checked = self
            .api
            .send_json::<User>(&me, Some(stored.tokens.access_token.as_str()))
            .await;
        match checked {
            Ok(user) => {
                info!("Session restored for {}", user.email);
                self.dispatch(AuthAction::Success {
                    user,
                    organization: stored.organization,
                    tokens: stored.tokens,
                    permissions: Vec::new(),
                });
            }
            Err(e) => {
                debug!("Stored access token rejected ({}), trying refresh", e);
                let _guard = self.refresh_lock.lock().await;

                match self.request_refresh(&stored.tokens.refresh_token).await {
                    Ok(tokens) => {
                        let session = PersistedSession { tokens, ..stored };
                        if let Err(e) = session.save(self.storage.as_ref()).await {
                            error!("Failed to persist refreshed tokens: {}", e);
                        }
                        info!("Session restored for {} after refresh", session.user.email);
                        self.dispatch(AuthAction::Success {
                            user: session.user,
                            organization: session.organization,
                            tokens: session.tokens,
                            permissions: Vec::new(),
                        });
                    }
                    Err(e) => {
                        warn!("Session restore failed: {}", e);
                        let _ = PersistedSession::clear(self.storage.as_ref()).await;
                        self.dispatch(AuthAction::Logout);
                    }
                }
            }
        }

        self.phase()
    }

    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> ClientResult<User> {
        let credentials = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            remember_me,
        };
        credentials.validate()?;

        let request = ApiRequest::post("auth.login", endpoints::LOGIN, &credentials)?;
        self.authenticate(request, "Login failed").await
    }

    pub async fn signup(&self, data: &SignupData) -> ClientResult<User> {
        data.validate()?;

        let request = ApiRequest::post("auth.signup", endpoints::SIGNUP, data)?;
        self.authenticate(request, "Signup failed").await
    }

    async fn authenticate(&self, request: ApiRequest, fallback: &str) -> ClientResult<User> {
        self.dispatch(AuthAction::Start);

        let response = match self.api.send_json::<AuthResponse>(&request, None).await {
            Ok(response) => response,
            Err(e) => {
                let message = failure_message(&e, fallback);
                warn!("{}: {}", fallback, message);
                self.dispatch(AuthAction::Failure(message));
                return Err(e);
            }
        };

        let session = PersistedSession {
            tokens: response.tokens.clone(),
            user: response.user.clone(),
            organization: response.organization.clone(),
        };
        if let Err(e) = session.save(self.storage.as_ref()).await {
            error!("Failed to persist session: {}", e);
        }

        info!(
            "Signed in as {} ({})",
            response.user.email, response.organization.name
        );
        let user = response.user.clone();
        self.dispatch(AuthAction::Success {
            user: response.user,
            organization: response.organization,
            tokens: response.tokens,
            permissions: response.permissions,
        });
        Ok(user)
    }

    /// Sign out. The backend call is best effort; local state and storage
    /// are always cleared.
    pub async fn logout(&self) {
        if let Some(token) = self.access_token() {
            let request = ApiRequest {
                method: Method::POST,
                path: endpoints::LOGOUT.to_string(),
                body: None,
                endpoint: "auth.logout",
            };
            if let Err(e) = self.api.send_json::<IgnoredAny>(&request, Some(token.as_str())).await {
                warn!("Logout request failed: {}", e);
            }
        }

        // Failures are logged by `clear`
        let _ = PersistedSession::clear(self.storage.as_ref()).await;
        self.dispatch(AuthAction::Logout);
        info!("Signed out");
    }

    /// Exchange the current refresh token for a new pair
    pub async fn refresh_tokens(&self) -> ClientResult<AuthTokens> {
        let _guard = self.refresh_lock.lock().await;
        let refresh_token = self
            .state
            .read()
            .tokens
            .as_ref()
            .map(|tokens| tokens.refresh_token.clone())
            .ok_or(ClientError::NotAuthenticated)?;

        let tokens = self.request_refresh(&refresh_token).await?;
        self.store_tokens(&tokens).await;
        Ok(tokens)
    }

    /// Refresh after `failed_access` was rejected.
    ///
    /// Callers that queued behind another refresh find a different access
    /// token in the state and reuse it without a second round trip. A failed
    /// refresh signs the session out before the lock is released.
    async fn refresh_after_rejection(&self, failed_access: &str) -> ClientResult<AuthTokens> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.state.read().tokens.clone();
        let Some(current) = current else {
            return Err(ClientError::NotAuthenticated);
        };
        if current.access_token != failed_access {
            debug!("Access token already refreshed by another request");
            return Ok(current);
        }

        match self.request_refresh(&current.refresh_token).await {
            Ok(tokens) => {
                self.store_tokens(&tokens).await;
                Ok(tokens)
            }
            Err(e) => {
                warn!("Token refresh failed, signing out: {}", e);
                self.logout().await;
                Err(e)
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> ClientResult<AuthTokens> {
        let request = ApiRequest::post(
            "auth.refresh",
            endpoints::REFRESH,
            &RefreshRequest { refresh_token },
        )?;
        let result = self.api.send_json::<RefreshResponse>(&request, None).await;
        metrics::record_token_refresh(result.is_ok());

        let tokens = result?.into_tokens();
        debug!("Access token refreshed");
        Ok(tokens)
    }

    async fn store_tokens(&self, tokens: &AuthTokens) {
        self.dispatch(AuthAction::UpdateTokens(tokens.clone()));

        if let Some(mut stored) = PersistedSession::load(self.storage.as_ref()).await {
            stored.tokens = tokens.clone();
            if let Err(e) = stored.save(self.storage.as_ref()).await {
                error!("Failed to persist refreshed tokens: {}", e);
            }
        }
    }

    /// Send an authenticated request.
    ///
    /// A 401 triggers one refresh and one resend. If the refresh fails the
    /// session is signed out and the original 401 is returned.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let token = self.access_token().ok_or(ClientError::NotAuthenticated)?;

        let rejected = match self.api.send(&request, Some(token.as_str())).await {
            Ok(body) => return decode_body(&body),
            Err(e) if e.is_unauthorized() => e,
            Err(e) => return Err(e),
        };

        debug!(
            "{} {} rejected, refreshing token before retry",
            request.method, request.path
        );
        let tokens = match self.refresh_after_rejection(&token).await {
            Ok(tokens) => tokens,
            Err(_) => return Err(rejected),
        };

        self.api
            .send_json(&request, Some(tokens.access_token.as_str()))
            .await
    }

    /// `PUT /auth/me`, then update the state and the persisted user
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User> {
        let request = ApiRequest::put("auth.me.update", endpoints::ME, update)?;
        let user: User = self.execute(request).await?;

        self.dispatch(AuthAction::UpdateUser(user.clone()));
        if let Some(mut stored) = PersistedSession::load(self.storage.as_ref()).await {
            stored.user = user.clone();
            if let Err(e) = stored.save(self.storage.as_ref()).await {
                error!("Failed to persist updated profile: {}", e);
            }
        }

        info!("Profile updated for {}", user.email);
        Ok(user)
    }
}

/// Server detail when there is one, otherwise the generic message
fn failure_message(error: &ClientError, fallback: &str) -> String {
    match error {
        ClientError::Unauthorized(detail) | ClientError::Api { detail, .. }
            if !detail.trim().is_empty() =>
        {
            detail.clone()
        }
        _ => fallback.to_string(),
    }
}
