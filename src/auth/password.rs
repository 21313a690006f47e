use crate::error::AppError;
use bcrypt::{hash, verify};

/// Input hashed once at startup so that logins for unknown emails still pay for a
/// full bcrypt verification.
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// One-way password hashing with bcrypt.
///
/// Every digest embeds its own random salt and cost, so digests produced with an
/// older cost setting keep verifying after `BCRYPT_COST` changes.
pub struct CredentialHasher {
    cost: u32,
    decoy_digest: String,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Result<Self, AppError> {
        let decoy_digest = hash(DECOY_PASSWORD, cost)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(Self { cost, decoy_digest })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Returns whether `password` matches `digest`. A malformed digest never matches.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        match verify(password, digest) {
            Ok(matches) => matches,
            Err(e) => {
                log::warn!("Stored password digest could not be parsed: {}", e);
                false
            }
        }
    }

    /// Spends the same work as [`verify`](Self::verify) and always fails.
    pub fn verify_decoy(&self, password: &str) -> bool {
        // Only the hashing cost matters here; the result is discarded.
        let _ = verify(password, &self.decoy_digest);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(4).unwrap()
    }

    #[test]
    fn test_password_hashing_and_verification() {
        let hasher = hasher();
        let password = "test_password123";
        let hashed = hasher.hash(password).unwrap();

        assert_ne!(hashed, password);
        assert!(hasher.verify(password, &hashed));
        assert!(!hasher.verify("wrong_password", &hashed));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("pw1").unwrap();
        let second = hasher.hash("pw1").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("pw1", &first));
        assert!(hasher.verify("pw1", &second));
    }

    #[test]
    fn test_digest_from_other_cost_still_verifies() {
        let digest = CredentialHasher::new(5).unwrap().hash("pw1").unwrap();
        assert!(hasher().verify("pw1", &digest));
    }

    #[test_log::test]
    fn test_verify_with_invalid_hash() {
        assert!(!hasher().verify("test_password123", "invalidhashformat"));
        assert!(!hasher().verify("test_password123", ""));
    }

    #[test]
    fn test_decoy_never_matches() {
        let hasher = hasher();
        assert!(!hasher.verify_decoy(DECOY_PASSWORD));
        assert!(!hasher.verify_decoy("anything"));
    }

    #[test]
    fn test_invalid_cost_is_an_error() {
        assert!(CredentialHasher::new(2).is_err());
    }
}
