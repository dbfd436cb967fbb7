//! Field validation for incoming records
//!
//! Every check runs on a normalized [`NewRecord`] before anything is written.
//! A failing check reports the offending field by name.

use crate::record::NewRecord;

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Shortest accepted username, in characters
pub const USERNAME_MIN_LEN: usize = 3;

/// Longest accepted username, in characters
pub const USERNAME_MAX_LEN: usize = 20;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));

static NICKNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("nickname pattern compiles"));

/// A record failed validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: &'static str,
    /// Human-readable reason
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }

    /// A value collides with one already present
    pub fn duplicate(field: &'static str, value: &str) -> Self {
        Self::new(field, format!("duplicate key: {} `{}` already exists", field, value))
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::new("email", "email is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new("email", "Please enter a valid email"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::new("username", "username is required"));
    }

    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(ValidationError::new(
            "username",
            format!("`{}` is shorter than the minimum length ({})", username, USERNAME_MIN_LEN),
        ));
    }
    if len > USERNAME_MAX_LEN {
        return Err(ValidationError::new(
            "username",
            format!("`{}` is longer than the maximum length ({})", username, USERNAME_MAX_LEN),
        ));
    }
    Ok(())
}

pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    if !NICKNAME_RE.is_match(nickname) {
        return Err(ValidationError::new(
            "nickname",
            format!("{} is not a valid nickname!", nickname),
        ));
    }
    Ok(())
}

/// Run every per-record check on a normalized record
pub fn validate_record(record: &NewRecord) -> Result<(), ValidationError> {
    validate_email(&record.email)?;
    validate_username(&record.username)?;
    if let Some(nickname) = &record.nickname {
        validate_nickname(nickname)?;
    }
    Ok(())
}

/// Reject a batch that repeats a username or email within itself
pub fn check_batch_unique(records: &[NewRecord]) -> Result<(), ValidationError> {
    let mut usernames = HashSet::new();
    let mut emails = HashSet::new();

    for record in records {
        if !usernames.insert(record.username.as_str()) {
            return Err(ValidationError::duplicate("username", &record.username));
        }
        if !emails.insert(record.email.as_str()) {
            return Err(ValidationError::duplicate("email", &record.email));
        }
    }
    Ok(())
}

/// Normalize and validate a whole batch, stopping at the first failure
pub fn prepare_batch(records: Vec<NewRecord>) -> Result<Vec<NewRecord>, ValidationError> {
    let records: Vec<NewRecord> = records.into_iter().map(NewRecord::normalize).collect();
    for record in &records {
        validate_record(record)?;
    }
    check_batch_unique(&records)?;
    Ok(records)
}
