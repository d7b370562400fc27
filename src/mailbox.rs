// Mailbox data model: the active-state flag, request payloads sent to the
// mailcow API and the status returned when checking a mailbox.

use crate::error::{MailcowError, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// Length of the password generated for new mailboxes.
pub const PASSWORD_LENGTH: usize = 20;

/// User-ACL capabilities granted to every mailbox created through
/// `MailcowClient::add_user`.
pub const DEFAULT_USER_ACL: &[&str] = &[
    "spam_alias",
    "tls_policy",
    "spam_score",
    "spam_policy",
    "delimiter_action",
    "quarantine",
    "quarantine_notification",
];

/// Whether a mailbox may log in and receive mail. Sent to the API as
/// the integers 0, 1 and 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "i64")]
pub enum ActiveState {
    /// No incoming mail, no login.
    Disabled,
    /// Incoming mail and login allowed.
    Active,
    /// Incoming mail allowed, login refused.
    ReceiveOnly,
}

impl From<ActiveState> for u8 {
    fn from(state: ActiveState) -> u8 {
        match state {
            ActiveState::Disabled => 0,
            ActiveState::Active => 1,
            ActiveState::ReceiveOnly => 2,
        }
    }
}

impl TryFrom<i64> for ActiveState {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(ActiveState::Disabled),
            1 => Ok(ActiveState::Active),
            2 => Ok(ActiveState::ReceiveOnly),
            other => Err(format!("unknown active state {}", other)),
        }
    }
}

/// `true` maps to a fully active mailbox, `false` to receive-only.
impl From<bool> for ActiveState {
    fn from(active: bool) -> Self {
        if active {
            ActiveState::Active
        } else {
            ActiveState::ReceiveOnly
        }
    }
}

impl std::fmt::Display for ActiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActiveState::Disabled => "disabled",
            ActiveState::Active => "active",
            ActiveState::ReceiveOnly => "receive only",
        };
        f.write_str(label)
    }
}

/// Split an address into `(local_part, domain)` on the first `@`.
pub fn split_email(email: &str) -> Result<(&str, &str)> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok((local, domain)),
        _ => Err(MailcowError::InvalidEmail(email.to_string())),
    }
}

/// Random alphanumeric password of `PASSWORD_LENGTH` characters.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Body of `POST api/v1/add/mailbox`.
#[derive(Serialize, Debug)]
pub(crate) struct AddMailbox<'a> {
    pub local_part: &'a str,
    pub domain: &'a str,
    pub name: &'a str,
    pub quota: String,
    pub password: &'a str,
    pub password2: &'a str,
    pub active: ActiveState,
}

/// Body shared by the `edit/*` endpoints: the affected mailboxes plus the
/// attributes to change.
#[derive(Serialize, Debug)]
pub(crate) struct EditRequest<'a, T> {
    pub items: Vec<&'a str>,
    pub attr: T,
}

#[derive(Serialize, Debug)]
pub(crate) struct UserAcl {
    pub user_acl: Vec<&'static str>,
}

impl Default for UserAcl {
    fn default() -> Self {
        UserAcl {
            user_acl: DEFAULT_USER_ACL.to_vec(),
        }
    }
}

/// Partial update of a mailbox. Only the fields that are `Some` are sent;
/// everything else is left untouched on the server.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct MailboxEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Addresses this mailbox may send as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_acl: Option<Vec<String>>,
}

impl MailboxEdit {
    pub fn active(mut self, active: impl Into<ActiveState>) -> Self {
        self.active = Some(active.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sender_acl<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sender_acl = Some(senders.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.name.is_none() && self.sender_acl.is_none()
    }
}

/// Result of `MailcowClient::check_user`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailboxStatus {
    pub exists: bool,
    pub active: bool,
    /// Decoded `active_int`, when the server sent a known value.
    pub state: Option<ActiveState>,
    pub name: Option<String>,
}

impl MailboxStatus {
    pub fn not_found() -> Self {
        MailboxStatus::default()
    }

    pub fn as_tuple(&self) -> (bool, bool, Option<&str>) {
        (self.exists, self.active, self.name.as_deref())
    }
}

/// What `MailcowClient::sync_user` or `deactivate_user` had to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The mailbox was missing and has been created with this password.
    Created { password: String },
    /// The mailbox existed; these attributes were sent.
    Updated { changes: MailboxEdit },
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_is_twenty_alphanumerics() {
        for _ in 0..50 {
            let password = generate_password();
            assert_eq!(password.len(), PASSWORD_LENGTH);
            assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn split_email_on_first_at() {
        assert_eq!(split_email("jane@example.org").unwrap(), ("jane", "example.org"));
        assert!(matches!(split_email("jane"), Err(MailcowError::InvalidEmail(_))));
        assert!(split_email("@example.org").is_err());
        assert!(split_email("jane@").is_err());
    }

    #[test]
    fn bool_maps_to_one_or_two() {
        assert_eq!(serde_json::to_value(ActiveState::from(true)).unwrap(), json!(1));
        assert_eq!(serde_json::to_value(ActiveState::from(false)).unwrap(), json!(2));
        assert_eq!(serde_json::to_value(ActiveState::Disabled).unwrap(), json!(0));
    }

    #[test]
    fn active_state_rejects_unknown_values() {
        assert_eq!(ActiveState::try_from(2_i64), Ok(ActiveState::ReceiveOnly));
        assert!(ActiveState::try_from(7_i64).is_err());
        assert!(serde_json::from_value::<ActiveState>(json!(3)).is_err());
    }

    #[test]
    fn empty_edit_serializes_to_empty_object() {
        let edit = MailboxEdit::default();
        assert!(edit.is_empty());
        assert_eq!(serde_json::to_value(&edit).unwrap(), json!({}));
    }

    #[test]
    fn edit_only_carries_supplied_fields() {
        let edit = MailboxEdit::default().active(false);
        assert_eq!(serde_json::to_value(&edit).unwrap(), json!({ "active": 2 }));

        let edit = MailboxEdit::default()
            .name("")
            .sender_acl(["alias@example.org"]);
        assert_eq!(
            serde_json::to_value(&edit).unwrap(),
            json!({ "name": "", "sender_acl": ["alias@example.org"] })
        );
    }

    #[test]
    fn add_payload_shape() {
        let body = AddMailbox {
            local_part: "jane",
            domain: "example.org",
            name: "Jane",
            quota: 3072_u64.to_string(),
            password: "pw",
            password2: "pw",
            active: true.into(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "local_part": "jane",
                "domain": "example.org",
                "name": "Jane",
                "quota": "3072",
                "password": "pw",
                "password2": "pw",
                "active": 1,
            })
        );
    }

    #[test]
    fn acl_request_wraps_email_in_items() {
        let body = EditRequest {
            items: vec!["jane@example.org"],
            attr: UserAcl::default(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["items"], json!(["jane@example.org"]));
        assert_eq!(value["attr"]["user_acl"].as_array().unwrap().len(), DEFAULT_USER_ACL.len());
    }
}
