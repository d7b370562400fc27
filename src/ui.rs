// UI layer: interactive mailbox administration menu using `dialoguer`.
// Every action reports its own failure and returns to the menu, so one
// rejected request does not end the session.

use crate::api::MailcowClient;
use crate::mailbox::{ActiveState, MailboxEdit, SyncOutcome};
use anyhow::Result;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const DEFAULT_QUOTA_MB: u64 = 3072;

const STATES: [ActiveState; 3] = [
    ActiveState::Active,
    ActiveState::ReceiveOnly,
    ActiveState::Disabled,
];

/// Main interactive menu. Runs a select loop until the user chooses
/// "Exit".
pub fn main_menu(api: &MailcowClient) -> Result<()> {
    loop {
        let items = vec![
            "Add mailbox",
            "Edit mailbox",
            "Check mailbox",
            "Delete mailbox",
            "Sync mailbox",
            "Deactivate mailbox",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_add(api)?,
            1 => handle_edit(api)?,
            2 => handle_check(api)?,
            3 => handle_delete(api)?,
            4 => handle_sync(api)?,
            5 => handle_deactivate(api)?,
            6 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Spinner shown while a request is in flight.
fn spinner(msg: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Ask for an address, re-prompting until it has a local part and domain.
fn prompt_email() -> Result<String> {
    let email: String = Input::new()
        .with_prompt("Email")
        .validate_with(|input: &String| -> std::result::Result<(), &'static str> {
            if crate::mailbox::split_email(input).is_ok() {
                Ok(())
            } else {
                Err("expected local-part@domain")
            }
        })
        .interact_text()?;
    Ok(email)
}

/// Pick one of the three active states.
fn prompt_state(prompt: &str) -> Result<ActiveState> {
    let labels: Vec<String> = STATES.iter().map(ToString::to_string).collect();
    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(STATES[idx])
}

/// Collect the new mailbox fields and call `MailcowClient::add_user`.
fn handle_add(api: &MailcowClient) -> Result<()> {
    let email = prompt_email()?;
    let name: String = Input::new().with_prompt("Display name").interact_text()?;
    let active = prompt_state("Active state")?;
    let quota: u64 = Input::new()
        .with_prompt("Quota (MiB)")
        .default(DEFAULT_QUOTA_MB)
        .interact_text()?;

    let pb = spinner("Creating mailbox...")?;
    let result = api.add_user(&email, &name, active, quota);
    pb.finish_and_clear();

    match result {
        Ok(password) => {
            println!("Created {}.", email);
            println!("Initial password (shown once): {}", password);
        }
        Err(e) => println!("Add failed: {}", e),
    }
    Ok(())
}

/// Ask which attributes to change and send only those.
fn handle_edit(api: &MailcowClient) -> Result<()> {
    let email = prompt_email()?;
    let mut edit = MailboxEdit::default();

    let name: String = Input::new()
        .with_prompt("New display name (empty to keep)")
        .allow_empty(true)
        .interact_text()?;
    if !name.is_empty() {
        edit = edit.name(name);
    }

    if Confirm::new()
        .with_prompt("Change active state?")
        .default(false)
        .interact()?
    {
        edit = edit.active(prompt_state("New active state")?);
    }

    let senders: String = Input::new()
        .with_prompt("Send-as addresses (comma separated, empty to keep)")
        .allow_empty(true)
        .interact_text()?;
    let senders = parse_senders(&senders);
    if !senders.is_empty() {
        edit = edit.sender_acl(senders);
    }

    if edit.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    let pb = spinner("Updating mailbox...")?;
    let result = api.edit_user(&email, &edit);
    pb.finish_and_clear();

    match result {
        Ok(()) => println!("Updated {}.", email),
        Err(e) => println!("Edit failed: {}", e),
    }
    Ok(())
}

/// Look a mailbox up and print its name and state.
fn handle_check(api: &MailcowClient) -> Result<()> {
    let email = prompt_email()?;

    let pb = spinner("Looking up mailbox...")?;
    let result = api.check_user(&email);
    pb.finish_and_clear();

    match result {
        Ok(status) if !status.exists => println!("{} does not exist.", email),
        Ok(status) => {
            let state = match status.state {
                Some(state) => state.to_string(),
                None if status.active => "active".to_string(),
                None => "inactive".to_string(),
            };
            println!(
                "{}: {} ({})",
                email,
                status.name.as_deref().unwrap_or("<no name>"),
                state
            );
        }
        Err(e) => println!("Check failed: {}", e),
    }
    Ok(())
}

/// Delete a mailbox after confirmation.
fn handle_delete(api: &MailcowClient) -> Result<()> {
    let email = prompt_email()?;
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete {} and all its mail?", email))
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(());
    }

    let pb = spinner("Deleting mailbox...")?;
    let result = api.delete_user(&email);
    pb.finish_and_clear();

    match result {
        Ok(()) => println!("Deleted {}.", email),
        Err(e) => println!("Delete failed: {}", e),
    }
    Ok(())
}

/// Split a comma separated address list, dropping blanks.
fn parse_senders(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Create the mailbox if missing, otherwise fix up its name and state.
fn handle_sync(api: &MailcowClient) -> Result<()> {
    let email = prompt_email()?;
    let name: String = Input::new().with_prompt("Display name").interact_text()?;
    let active = prompt_state("Active state")?;
    let quota: u64 = Input::new()
        .with_prompt("Quota if created (MiB)")
        .default(DEFAULT_QUOTA_MB)
        .interact_text()?;

    let pb = spinner("Syncing mailbox...")?;
    let result = api.sync_user(&email, &name, active, quota);
    pb.finish_and_clear();

    report_sync(&email, result);
    Ok(())
}

/// Disable a mailbox that should no longer be used.
fn handle_deactivate(api: &MailcowClient) -> Result<()> {
    let email = prompt_email()?;

    let pb = spinner("Deactivating mailbox...")?;
    let result = api.deactivate_user(&email);
    pb.finish_and_clear();

    report_sync(&email, result);
    Ok(())
}

fn report_sync(email: &str, result: crate::error::Result<SyncOutcome>) {
    match result {
        Ok(SyncOutcome::Created { password }) => {
            println!("Created {}.", email);
            println!("Initial password (shown once): {}", password);
        }
        Ok(SyncOutcome::Updated { changes }) => {
            let mut fields = Vec::new();
            if let Some(state) = changes.active {
                fields.push(format!("state -> {}", state));
            }
            if let Some(name) = &changes.name {
                fields.push(format!("name -> {}", name));
            }
            println!("Updated {}: {}.", email, fields.join(", "));
        }
        Ok(SyncOutcome::Unchanged) => println!("{} already up to date.", email),
        Err(e) => println!("Sync failed: {}", e),
    }
}
