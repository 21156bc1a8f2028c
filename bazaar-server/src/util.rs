//! Shared utility functions for bazaar-server

pub use shared::util::{now_millis, snowflake_id};

/// Salted one-way hash of a KYC identifier
pub fn hash_identifier(identifier: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(identifier.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Last four characters, for display
pub fn last4(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

/// Clamp a page/limit pair into (limit, offset)
pub fn page_window(page: Option<i64>, limit: Option<i64>, default: i64, max: i64) -> (i64, i64) {
    let limit = limit.unwrap_or(default).clamp(1, max);
    let page = page.unwrap_or(1).max(1);
    (limit, (page - 1) * limit)
}
