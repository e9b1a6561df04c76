// In-process mock of the MedInventory REST API
#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use medinventory::{
    config::{ApiConfig, ClientConfig, ExpiryConfig, LoggingConfig, StorageConfig},
    session::{AuthTokens, MemorySessionStorage, Organization, PersistedSession, User},
    AppContext,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const PASSWORD: &str = "correct-horse";
pub const TAKEN_EMAIL: &str = "taken@stlukes.org";

type Reply = (StatusCode, Json<Value>);

#[derive(Default)]
pub struct MockBackend {
    pub valid_access: Mutex<String>,
    pub refresh_ok: AtomicBool,
    pub refresh_delay: Mutex<Duration>,
    pub logout_fails: AtomicBool,

    pub login_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
    pub profile_updates: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub items_calls: AtomicUsize,
    pub alert_creates: AtomicUsize,
    pub alert_updates: AtomicUsize,

    pub items: Mutex<Vec<Value>>,
    pub alerts: Mutex<Vec<Value>>,
    pub expiry_bodies: Mutex<Vec<(String, Value)>>,
    issued: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let mock = Self::default();
        mock.refresh_ok.store(true, Ordering::SeqCst);
        Arc::new(mock)
    }

    /// Invalidate whatever access token the client currently holds
    pub fn expire_access_token(&self) {
        *self.valid_access.lock() = "rotated-by-server".to_string();
    }

    fn issue_tokens(&self) -> Value {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("access-{}", n);
        *self.valid_access.lock() = access.clone();
        json!({
            "access_token": access,
            "refresh_token": format!("refresh-{}", n),
            "token_type": "bearer",
            "expires_in": 1800
        })
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let valid = self.valid_access.lock().clone();
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| !valid.is_empty() && token == valid)
    }
}

fn reply(status: StatusCode, body: Value) -> Reply {
    (status, Json(body))
}

fn unauthorized(detail: &str) -> Reply {
    reply(StatusCode::UNAUTHORIZED, json!({ "detail": detail }))
}

pub fn user_json() -> Value {
    json!({
        "id": "usr_1",
        "email": "amina@stlukes.org",
        "first_name": "Amina",
        "last_name": "Okafor",
        "role": "pharmacist",
        "status": "active",
        "organization_id": "org_1",
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}

pub fn organization_json() -> Value {
    json!({
        "id": "org_1",
        "name": "St Luke's General",
        "type": "hospital",
        "country": "NG",
        "subscription_plan": "pro",
        "subscription_status": "active",
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z",
        "is_active": true
    })
}

pub fn date_in(days: i64) -> String {
    (Utc::now().date_naive() + ChronoDuration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

pub fn item_json(id: &str, name: &str, expires_in_days: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "category": "Antibiotics",
        "batch_number": format!("B-{}", id),
        "expiry_date": date_in(expires_in_days),
        "extended_date": null,
        "quantity": 40,
        "supplier": "MediSupply",
        "location": "Pharmacy A",
        "alert_days": 30,
        "alert_enabled": false,
        "notes": null
    })
}

async fn login(State(mock): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Reply {
    mock.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["password"] != PASSWORD {
        return unauthorized("Invalid email or password");
    }
    let tokens = mock.issue_tokens();
    reply(
        StatusCode::OK,
        json!({
            "user": user_json(),
            "organization": organization_json(),
            "tokens": tokens,
            "permissions": ["inventory:read", "inventory:write"]
        }),
    )
}

async fn signup(State(mock): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Reply {
    mock.signup_calls.fetch_add(1, Ordering::SeqCst);
    if body["email"] == TAKEN_EMAIL {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "detail": "Email already registered" }),
        );
    }

    let mut user = user_json();
    for field in ["email", "first_name", "last_name", "role"] {
        user[field] = body[field].clone();
    }
    let tokens = mock.issue_tokens();
    reply(
        StatusCode::OK,
        json!({
            "user": user,
            "organization": organization_json(),
            "tokens": tokens,
            "permissions": ["inventory:read"]
        }),
    )
}

async fn update_me(
    State(mock): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    mock.profile_updates.fetch_add(1, Ordering::SeqCst);
    if !mock.authorized(&headers) {
        return unauthorized("Token expired");
    }

    let mut user = user_json();
    if let Some(changes) = body.as_object() {
        for (field, value) in changes {
            user[field.as_str()] = value.clone();
        }
    }
    reply(StatusCode::OK, user)
}

async fn refresh(State(mock): State<Arc<MockBackend>>, Json(_body): Json<Value>) -> Reply {
    mock.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *mock.refresh_delay.lock();
    tokio::time::sleep(delay).await;

    if !mock.refresh_ok.load(Ordering::SeqCst) {
        return unauthorized("Invalid refresh token");
    }
    reply(StatusCode::OK, mock.issue_tokens())
}

async fn me(State(mock): State<Arc<MockBackend>>, headers: HeaderMap) -> Reply {
    mock.me_calls.fetch_add(1, Ordering::SeqCst);
    if !mock.authorized(&headers) {
        return unauthorized("Token expired");
    }
    reply(StatusCode::OK, user_json())
}

async fn logout(State(mock): State<Arc<MockBackend>>) -> Reply {
    mock.logout_calls.fetch_add(1, Ordering::SeqCst);
    if mock.logout_fails.load(Ordering::SeqCst) {
        return reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "detail": "session store unavailable" }),
        );
    }
    reply(StatusCode::OK, json!({ "message": "Logged out" }))
}

async fn list_items(State(mock): State<Arc<MockBackend>>, headers: HeaderMap) -> Reply {
    mock.items_calls.fetch_add(1, Ordering::SeqCst);
    if !mock.authorized(&headers) {
        return unauthorized("Token expired");
    }
    let items = mock.items.lock().clone();
    reply(StatusCode::OK, json!({ "items": items }))
}

async fn list_alerts(State(mock): State<Arc<MockBackend>>, headers: HeaderMap) -> Reply {
    if !mock.authorized(&headers) {
        return unauthorized("Token expired");
    }
    let alerts = mock.alerts.lock().clone();
    reply(StatusCode::OK, json!({ "alerts": alerts }))
}

fn mirror_alert_onto_item(mock: &MockBackend, alert: &Value) {
    let mut items = mock.items.lock();
    if let Some(item) = items.iter_mut().find(|i| i["id"] == alert["medicine_id"]) {
        item["alert_enabled"] = alert["enabled"].clone();
        item["alert_days"] = alert["days_before_expiry"].clone();
    }
}

async fn create_alert(
    State(mock): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    mock.alert_creates.fetch_add(1, Ordering::SeqCst);
    if !mock.authorized(&headers) {
        return unauthorized("Token expired");
    }

    let id = format!("ALERT{:03}", mock.alerts.lock().len() + 1);
    let mut alert = body.clone();
    alert["id"] = json!(id);
    alert["medicine_name"] = json!("");
    mirror_alert_onto_item(&mock, &alert);
    mock.alerts.lock().push(alert);

    reply(
        StatusCode::OK,
        json!({ "message": "Alert created", "alert_id": id }),
    )
}

async fn update_alert(
    State(mock): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(alert_id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    mock.alert_updates.fetch_add(1, Ordering::SeqCst);
    if !mock.authorized(&headers) {
        return unauthorized("Token expired");
    }

    let updated = {
        let mut alerts = mock.alerts.lock();
        let Some(alert) = alerts.iter_mut().find(|a| a["id"] == alert_id.as_str()) else {
            return reply(StatusCode::NOT_FOUND, json!({ "detail": "Alert not found" }));
        };
        for field in ["days_before_expiry", "notification_type", "enabled"] {
            alert[field] = body[field].clone();
        }
        alert.clone()
    };
    mirror_alert_onto_item(&mock, &updated);

    reply(StatusCode::OK, json!({ "message": "Alert updated" }))
}

async fn update_item_expiry(
    State(mock): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if !mock.authorized(&headers) {
        return unauthorized("Token expired");
    }
    mock.expiry_bodies.lock().push((item_id.clone(), body.clone()));

    let mut items = mock.items.lock();
    let Some(item) = items.iter_mut().find(|i| i["id"] == item_id.as_str()) else {
        return reply(StatusCode::NOT_FOUND, json!({ "detail": "Item not found" }));
    };
    if let Some(date) = body.get("expiry_date") {
        item["expiry_date"] = date.clone();
    }
    if body.get("extended_date").is_some() {
        item["extended_date"] = body["extended_date"].clone();
        item["notes"] = body["notes"].clone();
    }

    reply(StatusCode::OK, json!({ "message": "Expiry updated" }))
}

/// Bind the mock on an ephemeral port and return its base URL
pub async fn spawn(mock: Arc<MockBackend>) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/me", get(me).put(update_me))
        .route("/api/auth/logout", post(logout))
        .route("/api/inventory/expiry", get(list_items))
        .route(
            "/api/inventory/expiry/alerts",
            get(list_alerts).post(create_alert),
        )
        .route("/api/inventory/expiry/alerts/:id", put(update_alert))
        .route("/api/inventory/items/:id/expiry", put(update_item_expiry))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn config(base_url: &str) -> ClientConfig {
    ClientConfig {
        api: ApiConfig::with_base_url(base_url),
        storage: StorageConfig {
            directory: PathBuf::from("unused"),
        },
        expiry: ExpiryConfig {
            poll_interval_secs: 1,
        },
        credentials: None,
        logging: LoggingConfig {
            level: "medinventory=debug".to_string(),
            json: false,
        },
    }
}

/// Mock backend, in-memory storage and a context wired to both
pub async fn setup() -> (Arc<MockBackend>, Arc<MemorySessionStorage>, AppContext) {
    let mock = MockBackend::new();
    let base_url = spawn(mock.clone()).await;
    let storage = Arc::new(MemorySessionStorage::new());
    let ctx = AppContext::with_storage(config(&base_url), storage.clone()).unwrap();
    (mock, storage, ctx)
}

pub fn persisted(access: &str, refresh: &str) -> PersistedSession {
    PersistedSession {
        tokens: AuthTokens {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            token_type: "bearer".to_string(),
            expires_in: 1800,
        },
        user: serde_json::from_value::<User>(user_json()).unwrap(),
        organization: serde_json::from_value::<Organization>(organization_json()).unwrap(),
    }
}
