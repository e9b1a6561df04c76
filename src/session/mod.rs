/// Authentication session
///
/// Auth state, the actions that are allowed to change it, persisted tokens,
/// and the session manager that drives login, restore and token refresh.

mod manager;
pub mod storage;

pub use manager::SessionManager;
pub use storage::{
    FileSessionStorage, MemorySessionStorage, PersistedSession, SessionStorage,
    ORGANIZATION_STORAGE_KEY, TOKEN_STORAGE_KEY, USER_STORAGE_KEY,
};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Organization the user belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub subscription_plan: String,
    #[serde(default)]
    pub subscription_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Token pair issued by the backend
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: u64,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Body of a successful login or signup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub organization: Organization,
    pub tokens: AuthTokens,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Login request
#[derive(Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
    pub remember_me: bool,
}

/// Signup request
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SignupData {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "must match password"))]
    pub confirm_password: String,
    #[validate(length(min = 1, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Partial profile update for `PUT /auth/me`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<User>,
    pub organization: Option<Organization>,
    pub tokens: Option<AuthTokens>,
    pub permissions: HashSet<String>,
    pub phase: SessionPhase,
    pub error: Option<String>,
}

/// The only ways session state can change
#[derive(Debug, Clone)]
pub enum AuthAction {
    Start,
    Success {
        user: User,
        organization: Organization,
        tokens: AuthTokens,
        permissions: Vec<String>,
    },
    Failure(String),
    Logout,
    UpdateUser(User),
    UpdateTokens(AuthTokens),
    ClearError,
}

impl AuthAction {
    pub fn name(&self) -> &'static str {
        match self {
            AuthAction::Start => "AUTH_START",
            AuthAction::Success { .. } => "AUTH_SUCCESS",
            AuthAction::Failure(_) => "AUTH_FAILURE",
            AuthAction::Logout => "AUTH_LOGOUT",
            AuthAction::UpdateUser(_) => "UPDATE_USER",
            AuthAction::UpdateTokens(_) => "UPDATE_TOKENS",
            AuthAction::ClearError => "CLEAR_ERROR",
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SessionPhase::Uninitialized | SessionPhase::Loading)
    }

    /// Reducer: the next state after `action`
    pub fn apply(self, action: AuthAction) -> AuthState {
        match action {
            AuthAction::Start => AuthState {
                phase: SessionPhase::Loading,
                error: None,
                ..self
            },
            AuthAction::Success {
                user,
                organization,
                tokens,
                permissions,
            } => AuthState {
                user: Some(user),
                organization: Some(organization),
                tokens: Some(tokens),
                permissions: permissions.into_iter().collect(),
                phase: SessionPhase::Authenticated,
                error: None,
            },
            AuthAction::Failure(message) => AuthState {
                phase: SessionPhase::Unauthenticated,
                error: Some(message),
                ..AuthState::default()
            },
            AuthAction::Logout => AuthState {
                phase: SessionPhase::Unauthenticated,
                ..AuthState::default()
            },
            AuthAction::UpdateUser(user) => AuthState {
                user: Some(user),
                ..self
            },
            AuthAction::UpdateTokens(tokens) => AuthState {
                tokens: Some(tokens),
                ..self
            },
            AuthAction::ClearError => AuthState {
                error: None,
                ..self
            },
        }
    }
}
