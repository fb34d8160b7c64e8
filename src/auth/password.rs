use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    // Verified against when the username is unknown, so a miss costs the same
    // Argon2 work as a wrong password. Built at startup by `init_dummy_hash`.
    static ref DUMMY_HASH: Option<String> = match hash_password("not-a-real-password") {
        Ok(hash) => Some(hash),
        Err(e) => {
            error!(error = %e, "dummy password hash unavailable");
            None
        }
    };
}

/// Forces the dummy hash to be computed now rather than on the first login
/// for an unknown username.
pub fn init_dummy_hash() -> anyhow::Result<()> {
    match DUMMY_HASH.as_deref() {
        Some(_) => Ok(()),
        None => anyhow::bail!("dummy password hash unavailable"),
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Argon2 compares the derived digest in constant time.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Burns one verification for a login whose username matched nothing.
/// Always reports a mismatch.
pub fn verify_dummy(plain: &str) -> bool {
    match DUMMY_HASH.as_deref() {
        Some(hash) => {
            let _ = verify_password(plain, hash);
        }
        None => error!("no dummy password hash; unknown-user login skipped verification"),
    }
    false
}
