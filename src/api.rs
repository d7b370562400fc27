// API client module: a small blocking HTTP client for the mailcow
// mailbox endpoints. One `reqwest` client is kept for the lifetime of
// `MailcowClient` so connections are reused between calls.

use crate::config::Config;
use crate::error::{MailcowError, Result};
use crate::mailbox::{
    generate_password, split_email, ActiveState, AddMailbox, EditRequest, MailboxEdit,
    MailboxStatus, SyncOutcome, UserAcl,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const ADD_MAILBOX: &str = "api/v1/add/mailbox";
pub const EDIT_USER_ACL: &str = "api/v1/edit/user-acl";
pub const EDIT_MAILBOX: &str = "api/v1/edit/mailbox";
pub const DELETE_MAILBOX: &str = "api/v1/delete/mailbox";
pub const GET_MAILBOX: &str = "api/v1/get/mailbox";

/// Value of `type` in a successful response envelope.
const SUCCESS: &str = "success";

/// Client for the mailcow mailbox API. Holds the HTTP session, the base
/// URL of the instance and the headers sent with every request.
#[derive(Clone, Debug)]
pub struct MailcowClient {
    client: Client,
    api_host: String,
    headers: HeaderMap,
}

impl MailcowClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| MailcowError::Config("API key is not a valid header value".into()))?;
        headers.insert("X-API-Key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_host = config.api_host.trim_end_matches('/').to_string();
        match Url::parse(&api_host) {
            Ok(url) if !url.cannot_be_a_base() => {}
            _ => {
                return Err(MailcowError::Config(format!(
                    "API host {:?} is not a base URL",
                    config.api_host
                )))
            }
        }

        let client = Client::builder().build()?;
        Ok(MailcowClient {
            client,
            api_host,
            headers,
        })
    }

    /// Build a client from `Config::load()`.
    pub fn from_env() -> Result<Self> {
        Self::new(&Config::load()?)
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_host, endpoint)
    }

    /// `endpoint` followed by `segment` as a single, percent-encoded path
    /// segment.
    fn url_with_segment(&self, endpoint: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url(endpoint))
            .map_err(|e| MailcowError::Config(format!("invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| MailcowError::Config("API host is not a base URL".into()))?
            .push(segment);
        Ok(url)
    }

    /// Create a mailbox and grant it the default user ACL. Returns the
    /// generated password.
    ///
    /// The two calls are not atomic: if the ACL update fails the mailbox
    /// stays created without it and the error is returned.
    pub fn add_user(
        &self,
        email: &str,
        name: &str,
        active: impl Into<ActiveState>,
        quota_mb: u64,
    ) -> Result<String> {
        let (local_part, domain) = split_email(email)?;
        let password = generate_password();
        let body = AddMailbox {
            local_part,
            domain,
            name,
            quota: quota_mb.to_string(),
            password: &password,
            password2: &password,
            active: active.into(),
        };
        self.post_request(ADD_MAILBOX, &body)?;
        info!("created mailbox {}", email);

        let acl = EditRequest {
            items: vec![email],
            attr: UserAcl::default(),
        };
        if let Err(e) = self.post_request(EDIT_USER_ACL, &acl) {
            warn!("mailbox {} created but user ACL not applied: {}", email, e);
            return Err(e);
        }
        Ok(password)
    }

    /// Apply a partial update. Fields left as `None` in `edit` are not sent.
    pub fn edit_user(&self, email: &str, edit: &MailboxEdit) -> Result<()> {
        let body = EditRequest {
            items: vec![email],
            attr: edit,
        };
        self.post_request(EDIT_MAILBOX, &body)?;
        info!("edited mailbox {}", email);
        Ok(())
    }

    pub fn edit_user_fields(
        &self,
        email: &str,
        active: Option<ActiveState>,
        name: Option<&str>,
    ) -> Result<()> {
        let edit = MailboxEdit {
            active,
            name: name.map(str::to_string),
            sender_acl: None,
        };
        self.edit_user(email, &edit)
    }

    pub fn delete_user(&self, email: &str) -> Result<()> {
        self.post_request(DELETE_MAILBOX, &[email])?;
        info!("deleted mailbox {}", email);
        Ok(())
    }

    /// Look up a mailbox. An empty object from the server means the
    /// mailbox does not exist.
    pub fn check_user(&self, email: &str) -> Result<MailboxStatus> {
        let endpoint = format!("{}/{}", GET_MAILBOX, email);
        let url = self.url_with_segment(GET_MAILBOX, email)?;
        debug!("GET {}", url.path());
        let req = self.client.get(url);
        let rsp = self.send(&endpoint, req)?;
        parse_mailbox(&endpoint, rsp)
    }

    /// Bring a mailbox in line with the wanted name and active state:
    /// create it when missing, otherwise send only the attributes that
    /// differ. `quota_mb` is used only on creation.
    pub fn sync_user(
        &self,
        email: &str,
        name: &str,
        active: impl Into<ActiveState>,
        quota_mb: u64,
    ) -> Result<SyncOutcome> {
        let active = active.into();
        let status = self.check_user(email)?;
        if !status.exists {
            let password = self.add_user(email, name, active, quota_mb)?;
            return Ok(SyncOutcome::Created { password });
        }

        let mut changes = MailboxEdit::default();
        if status.state != Some(active) {
            changes = changes.active(active);
        }
        if status.name.as_deref() != Some(name) {
            changes = changes.name(name);
        }
        if changes.is_empty() {
            debug!("mailbox {} already in sync", email);
            return Ok(SyncOutcome::Unchanged);
        }
        self.edit_user(email, &changes)?;
        Ok(SyncOutcome::Updated { changes })
    }

    /// Disable a mailbox that should no longer accept mail or logins.
    /// Missing or already disabled mailboxes are left alone.
    pub fn deactivate_user(&self, email: &str) -> Result<SyncOutcome> {
        let status = self.check_user(email)?;
        if !status.exists || status.state == Some(ActiveState::Disabled) {
            return Ok(SyncOutcome::Unchanged);
        }
        let changes = MailboxEdit::default().active(ActiveState::Disabled);
        self.edit_user(email, &changes)?;
        Ok(SyncOutcome::Updated { changes })
    }

    fn post_request<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<()> {
        debug!("POST {}", endpoint);
        let req = self.client.post(self.url(endpoint)).json(body);
        let rsp = self.send(endpoint, req)?;
        validate_envelope(endpoint, rsp)
    }

    fn send(&self, endpoint: &str, req: RequestBuilder) -> Result<Value> {
        let res = req.headers(self.headers.clone()).send()?;
        let status = res.status();
        let text = res.text()?;
        debug!("{} answered {}", endpoint, status);
        serde_json::from_str(&text).map_err(|e| {
            MailcowError::malformed(endpoint, format!("HTTP {} with non-JSON body: {}", status, e))
        })
    }
}

/// Check a write-call response: an object, or a list whose first element
/// is an object, carrying `type` and `msg`, with `type` equal to `success`.
pub fn validate_envelope(endpoint: &str, rsp: Value) -> Result<()> {
    let rsp = match rsp {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| MailcowError::malformed(endpoint, "empty response list"))?,
        other => other,
    };
    let obj = match rsp {
        Value::Object(obj) => obj,
        _ => return Err(MailcowError::malformed(endpoint, "response is not an object")),
    };
    let (kind, msg) = match (obj.get("type"), obj.get("msg")) {
        (Some(kind), Some(msg)) => (kind, msg),
        _ => {
            return Err(MailcowError::malformed(
                endpoint,
                "got response without type or msg",
            ))
        }
    };
    if kind.as_str() == Some(SUCCESS) {
        return Ok(());
    }
    Err(api_error(endpoint, kind, msg))
}

fn parse_mailbox(endpoint: &str, rsp: Value) -> Result<MailboxStatus> {
    let obj = match rsp {
        Value::Object(obj) => obj,
        _ => return Err(MailcowError::malformed(endpoint, "response is not an object")),
    };
    if obj.is_empty() {
        return Ok(MailboxStatus::not_found());
    }

    let active_int = match obj.get("active_int") {
        Some(v) => v,
        None => {
            return match (obj.get("type"), obj.get("msg")) {
                (Some(kind), Some(msg)) if kind.as_str() == Some("error") => {
                    Err(api_error(endpoint, kind, msg))
                }
                _ => Err(MailcowError::malformed(endpoint, "missing active_int")),
            };
        }
    };
    let active_int = as_int(active_int)
        .ok_or_else(|| MailcowError::malformed(endpoint, "active_int is not an integer"))?;

    let name = match obj.get("name") {
        Some(Value::String(name)) => Some(name.clone()),
        Some(Value::Null) | None => None,
        Some(_) => return Err(MailcowError::malformed(endpoint, "name is not a string")),
    };

    Ok(MailboxStatus {
        exists: true,
        active: active_int != 0,
        state: ActiveState::try_from(active_int).ok(),
        name,
    })
}

// mailcow sends active_int as a number, older releases as a string.
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn api_error(endpoint: &str, kind: &Value, msg: &Value) -> MailcowError {
    MailcowError::Api {
        endpoint: endpoint.to_string(),
        kind: render(kind),
        msg: render(msg),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_object_and_list_pass() {
        assert!(validate_envelope("e", json!({"type": "success", "msg": "ok"})).is_ok());
        assert!(validate_envelope("e", json!([{"type": "success", "msg": ["mailbox_added"]}])).is_ok());
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = validate_envelope("e", json!({"type": "success"})).unwrap_err();
        assert!(matches!(err, MailcowError::MalformedResponse { .. }));
        let err = validate_envelope("e", json!([])).unwrap_err();
        assert!(matches!(err, MailcowError::MalformedResponse { .. }));
        let err = validate_envelope("e", json!(["success"])).unwrap_err();
        assert!(matches!(err, MailcowError::MalformedResponse { .. }));
    }

    #[test]
    fn reported_failure_carries_type_and_msg() {
        let err = validate_envelope("e", json!({"type": "error", "msg": "boom"})).unwrap_err();
        match &err {
            MailcowError::Api { kind, msg, .. } => {
                assert_eq!(kind, "error");
                assert_eq!(msg, "boom");
            }
            other => panic!("unexpected {:?}", other),
        }
        let text = err.to_string();
        assert!(text.contains("error") && text.contains("boom"));
    }

    #[test]
    fn non_string_msg_is_rendered_as_json() {
        let err = validate_envelope("e", json!({"type": "danger", "msg": ["access_denied"]}))
            .unwrap_err();
        assert!(err.to_string().contains("[\"access_denied\"]"));
    }

    #[test]
    fn empty_mailbox_object_means_absent() {
        let status = parse_mailbox("e", json!({})).unwrap();
        assert_eq!(status.as_tuple(), (false, false, None));
    }

    #[test]
    fn mailbox_with_active_int() {
        let status = parse_mailbox("e", json!({"active_int": 1, "name": "X"})).unwrap();
        assert_eq!(status.as_tuple(), (true, true, Some("X")));
        assert_eq!(status.state, Some(ActiveState::Active));

        let status = parse_mailbox("e", json!({"active_int": "0", "name": "Y"})).unwrap();
        assert_eq!(status.as_tuple(), (true, false, Some("Y")));
        assert_eq!(status.state, Some(ActiveState::Disabled));
    }

    #[test]
    fn mailbox_error_envelope_is_reported() {
        let err = parse_mailbox("e", json!({"type": "error", "msg": "denied"})).unwrap_err();
        assert!(err.is_api_error());
    }

    #[test]
    fn mailbox_shape_violations() {
        assert!(matches!(
            parse_mailbox("e", json!([])),
            Err(MailcowError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_mailbox("e", json!({"name": "X"})),
            Err(MailcowError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn host_trailing_slash_is_trimmed() {
        let client = MailcowClient::new(&Config::new("https://mail.example.org/", "key")).unwrap();
        assert_eq!(client.api_host(), "https://mail.example.org");
        assert_eq!(client.url(ADD_MAILBOX), "https://mail.example.org/api/v1/add/mailbox");
    }

    #[test]
    fn email_is_pushed_as_one_encoded_segment() {
        let client = MailcowClient::new(&Config::new("https://mail.example.org", "key")).unwrap();
        let url = client.url_with_segment(GET_MAILBOX, "a#b/c?d@x.org").unwrap();
        assert_eq!(url.path(), "/api/v1/get/mailbox/a%23b%2Fc%3Fd@x.org");
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn host_must_be_a_base_url() {
        let err = MailcowClient::new(&Config::new("mailto:admin@example.org", "key")).unwrap_err();
        assert!(matches!(err, MailcowError::Config(_)));
        assert!(MailcowClient::new(&Config::new("not a url", "key")).is_err());
    }

    #[test]
    fn invalid_key_is_a_config_error() {
        let err = MailcowClient::new(&Config::new("https://mail", "bad\nkey")).unwrap_err();
        assert!(matches!(err, MailcowError::Config(_)));
    }
}
