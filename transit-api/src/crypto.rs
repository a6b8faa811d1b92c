//! Cryptographic utilities for the backend

/// Default bcrypt cost factor
pub const BCRYPT_COST: u32 = 12;

/// Prefix of Auth0-style ids minted for admin-created users
pub const LOCAL_ID_PREFIX: &str = "local|";

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, BCRYPT_COST)
}

/// Verify a password against a bcrypt hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

/// Compare a presented token with the configured one in constant time
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Subject id for a user that has no Auth0 account yet
pub fn generate_local_auth0_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4())
}
