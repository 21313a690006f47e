pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::{validate_not_blank, validate_password, UserRole, NAME_REGEX};

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::CredentialHasher;
pub use token::{Claims, MemoryRevocationList, RevocationList, TokenError, TokenService};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// User's password.
    /// Must be between 1 and 72 bytes long.
    #[validate(custom = "validate_password")]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name for the new account.
    /// Must be between 1 and 100 characters: letters, digits, spaces and `.'_-`.
    #[validate(
        length(min = 1, max = 100),
        regex(path = "NAME_REGEX", message = "Name contains unsupported characters"),
        custom = "validate_not_blank"
    )]
    pub name: String,
    /// Email address for the new account.
    /// Must be a valid email format. Stored lowercased.
    #[validate(email)]
    pub email: String,
    /// Password for the new account.
    #[validate(custom = "validate_password")]
    pub password: String,
    /// Global role; defaults to `member`. Registration cannot grant `admin`.
    pub role: Option<UserRole>,
}

/// Response structure after a successful login.
/// Carries the user's identity alongside the bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// The JWT for session authentication.
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            email: "a@x.com".to_string(),
            password: "pw1".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let invalid_email_login = LoginRequest {
            email: "testexample.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(invalid_email_login.validate().is_err());

        let empty_password_login = LoginRequest {
            email: "test@example.com".to_string(),
            password: String::new(),
        };
        assert!(empty_password_login.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let valid_register = RegisterRequest {
            name: "Ada O'Neil-Smith".to_string(),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            role: None,
        };
        assert!(valid_register.validate().is_ok());

        let invalid_name_register = RegisterRequest {
            name: "test user!".to_string(), // Contains an exclamation mark
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            role: None,
        };
        assert!(invalid_name_register.validate().is_err());

        let blank_name_register = RegisterRequest {
            name: "   ".to_string(),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            role: None,
        };
        assert!(blank_name_register.validate().is_err());

        let long_password_register = RegisterRequest {
            name: "Ada".to_string(),
            email: "test@example.com".to_string(),
            password: "p".repeat(73),
            role: Some(UserRole::Guest),
        };
        assert!(long_password_register.validate().is_err());
    }

    #[test]
    fn test_register_request_role_is_optional() {
        let parsed: RegisterRequest = serde_json::from_str(
            r#"{"name": "Ada", "email": "a@x.com", "password": "pw1"}"#,
        )
        .unwrap();
        assert_eq!(parsed.role, None);
    }
}
