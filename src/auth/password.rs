use super::AuthError;

// bcrypt is CPU bound; keep it off the async workers

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password.as_bytes(), cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let matches =
        tokio::task::spawn_blocking(move || bcrypt::verify(password.as_bytes(), &hash)).await??;
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_and_verifies() {
        let hash = hash_password("correct horse", 4).await.unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("battery staple", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("anything", "not-a-bcrypt-hash").await,
            Err(AuthError::Hash(_))
        ));
    }
}
