// Library root
// -----------
// Client for the mailcow mailbox-management API plus the interactive
// front-end used by the `mailcow-admin` binary.
//
// Module responsibilities:
// - `api`: HTTP calls against the mailcow endpoints and validation of
//   the `type`/`msg` response envelope.
// - `mailbox`: active-state flag, request payloads, password generation.
// - `config`: API host and key from the config file and environment.
// - `error`: the `MailcowError` type every operation returns.
// - `ui`: terminal menu that drives `api`.
pub mod api;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod ui;

pub use api::MailcowClient;
pub use config::Config;
pub use error::{MailcowError, Result};
pub use mailbox::{ActiveState, MailboxEdit, MailboxStatus, SyncOutcome};
