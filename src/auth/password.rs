//! Customer password rules and argon2id storage.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

pub const MIN_PASSWORD_CHARS: usize = 8;
/// Bounds hashing work per request.
pub const MAX_PASSWORD_CHARS: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordRuleError {
    #[error("Password too short")]
    TooShort,
    #[error("Password too long")]
    TooLong,
}

/// Checks a new password against the account rules. Length counts characters, so
/// non-ASCII passphrases are not penalised.
pub fn check_new_password(plain: &str) -> Result<(), PasswordRuleError> {
    match plain.chars().count() {
        n if n < MIN_PASSWORD_CHARS => Err(PasswordRuleError::TooShort),
        n if n > MAX_PASSWORD_CHARS => Err(PasswordRuleError::TooLong),
        _ => Ok(()),
    }
}

fn argon_failure(op: &'static str) -> impl FnOnce(password_hash::Error) -> anyhow::Error {
    move |e| {
        error!(error = %e, op, "argon2 failure");
        anyhow::anyhow!("argon2 {op}: {e}")
    }
}

/// PHC string (`$argon2id$...`) stored in `users.password_hash`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(argon_failure("hash"))?
        .to_string())
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(argon_failure("parse"))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(argon_failure("verify")(e)),
    }
}
