use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const MIN_USERNAME_LEN: usize = 4;
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 4;
const MAX_NOTES_LEN: usize = 2000;
const MAX_REPORT_TEXT_LEN: usize = 256 * 1024;
const DEFAULT_HISTORY_LIMIT: i64 = 100;
const MAX_HISTORY_LIMIT: i64 = 500;

pub fn validate_username(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < MIN_USERNAME_LEN {
        Err(AppError::BadRequest(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )))
    } else if len > MAX_USERNAME_LEN {
        Err(AppError::BadRequest(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )))
    } else {
        Ok(())
    }
}

pub fn validate_report_text(text: &str) -> Result<&str, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(AppError::BadRequest("Report text is empty".into()))
    } else if trimmed.len() > MAX_REPORT_TEXT_LEN {
        Err(AppError::BadRequest("Report text too large".into()))
    } else {
        Ok(trimmed)
    }
}

/// Trims notes; blank notes are stored as absent.
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().chars().take(MAX_NOTES_LEN).collect::<String>())
        .filter(|n| !n.is_empty())
}

/// Parses an ISO-8601 instant from a path parameter. Offsets are converted to naive UTC.
pub fn parse_timestamp_param(raw: &str) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date format: {}", raw)))
}

/// Accepts `YYYY-MM` month keys.
pub fn validate_month_key(key: &str) -> Result<String, AppError> {
    let key = key.trim();
    let valid = key.len() == 7
        && NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d").is_ok();
    if valid {
        Ok(key.to_string())
    } else {
        Err(AppError::BadRequest(format!("Invalid month key: {}", key)))
    }
}

pub fn clamp_pagination(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let skip = skip.unwrap_or(0).max(0);
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    (skip, limit)
}
