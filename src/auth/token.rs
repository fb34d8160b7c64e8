use rand::{rngs::OsRng, RngCore};

/// Random bytes behind every access token.
pub const ACCESS_TOKEN_BYTES: usize = 128;

/// Fresh bearer token from the OS CSPRNG, hex-encoded.
pub fn generate_access_token() -> String {
    let mut buf = [0u8; ACCESS_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Accepts both `Authorization: <token>` and `Authorization: Bearer <token>`.
pub fn parse_authorization(value: &str) -> Option<&str> {
    let value = value.trim_start();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();
    (!token.is_empty()).then_some(token)
}
