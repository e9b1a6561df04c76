/// REST endpoint table
pub const LOGIN: &str = "/api/auth/login";
pub const SIGNUP: &str = "/api/auth/signup";
pub const REFRESH: &str = "/api/auth/refresh";
pub const ME: &str = "/api/auth/me";
pub const LOGOUT: &str = "/api/auth/logout";

pub const EXPIRY_ITEMS: &str = "/api/inventory/expiry";
pub const EXPIRY_ALERTS: &str = "/api/inventory/expiry/alerts";

pub fn expiry_alert(alert_id: &str) -> String {
    format!("{}/{}", EXPIRY_ALERTS, urlencoding::encode(alert_id))
}

pub fn item_expiry(item_id: &str) -> String {
    format!(
        "/api/inventory/items/{}/expiry",
        urlencoding::encode(item_id)
    )
}
