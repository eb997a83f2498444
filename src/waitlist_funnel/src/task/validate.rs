//! Input shape checks. All of these run before any network call.

use crate::{error::ValidationError, task::TaskId};

fn required(raw: &str, task: TaskId) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(task));
    }
    Ok(trimmed)
}

fn is_handle_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain.
pub fn email(raw: &str) -> Result<String, ValidationError> {
    let email = required(raw, TaskId::Email)?;
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    let dotted = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !dotted {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(email.to_string())
}

/// `0x` followed by 40 hex digits.
pub fn wallet_address(raw: &str) -> Result<String, ValidationError> {
    let address = required(raw, TaskId::Wallet)?;
    let hex = address
        .strip_prefix("0x")
        .ok_or(ValidationError::InvalidWallet)?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidWallet);
    }
    Ok(address.to_string())
}

/// 1-15 word characters, one leading `@` tolerated.
pub fn twitter_handle(raw: &str) -> Result<String, ValidationError> {
    let handle = required(raw, TaskId::Twitter)?;
    let handle = handle.strip_prefix('@').unwrap_or(handle);
    let len = handle.chars().count();
    if !(1..=15).contains(&len) || !handle.chars().all(is_handle_char) {
        return Err(ValidationError::InvalidTwitter);
    }
    Ok(handle.to_string())
}

/// 2-32 word characters with an optional `#NNNN` discriminator.
pub fn discord_handle(raw: &str) -> Result<String, ValidationError> {
    let handle = required(raw, TaskId::Discord)?;
    let (name, discriminator) = match handle.split_once('#') {
        Some((name, tag)) => (name, Some(tag)),
        None => (handle, None),
    };

    let len = name.chars().count();
    if !(2..=32).contains(&len) || !name.chars().all(is_handle_char) {
        return Err(ValidationError::InvalidDiscord);
    }
    if let Some(tag) = discriminator {
        if tag.len() != 4 || !tag.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidDiscord);
        }
    }
    Ok(handle.to_string())
}
