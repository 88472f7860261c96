//! Phone number candidate generation and directory matching.

use tracing::{debug, info};

use crate::{
    directory::{UserDirectory, UserRecord},
    errors::AppError,
};

/// Removes the `+91` country code, any `+`, spaces and hyphens.
pub fn clean_phone(raw: &str) -> String {
    raw.replace("+91", "")
        .replace('+', "")
        .replace(' ', "")
        .replace('-', "")
}

/// Forms to try, in priority order. An empty input yields none.
pub fn phone_candidates(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }

    let clean = clean_phone(raw);
    vec![
        raw.to_string(),
        format!("+91{clean}"),
        format!("91{clean}"),
        clean.clone(),
        format!("+{clean}"),
    ]
}

/// Returns the first directory entry matching any candidate, scanning in order.
///
/// The directory is consulted once per lookup. No tie-break is attempted when
/// different candidates would match different records; the earliest candidate wins.
pub async fn find_user_by_phone(
    directory: &dyn UserDirectory,
    phone: &str,
) -> Result<Option<UserRecord>, AppError> {
    let candidates = phone_candidates(phone);
    debug!(?candidates, "searching user by phone candidates");

    if candidates.is_empty() {
        return Ok(None);
    }

    let user = directory.find_by_phones(&candidates).await?;
    match &user {
        Some(user) => info!(user = %user.full_name, phone = %user.phone, "resolved caller"),
        None => info!(phone = %phone, "no user matches phone"),
    }
    Ok(user)
}
