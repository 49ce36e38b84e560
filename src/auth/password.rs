//! bcrypt password hashing on the blocking pool.

use crate::error::AuthError;

/// Hash `password` with bcrypt at `cost`.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("task join error: {}", e)))?
}

/// Check `password` against a bcrypt digest. A digest bcrypt cannot parse never matches.
pub async fn verify_password(password: &str, digest: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let digest = digest.to_string();
    tokio::task::spawn_blocking(move || match bcrypt::verify(password, &digest) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "stored password digest is not valid bcrypt");
            false
        }
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("task join error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn hash_then_verify() {
        let digest = hash_password("pw", TEST_COST).await.unwrap();
        assert!(digest.starts_with("$2"));
        assert_ne!(digest, "pw");
        assert!(verify_password("pw", &digest).await.unwrap());
        assert!(!verify_password("other", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_distinct_salts() {
        let a = hash_password("pw", TEST_COST).await.unwrap();
        let b = hash_password("pw", TEST_COST).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_digest_does_not_match() {
        assert!(!verify_password("pw", "not-a-bcrypt-hash").await.unwrap());
        assert!(!verify_password("pw", "").await.unwrap());
    }
}
