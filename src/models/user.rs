use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::{Validate, ValidationError};

use crate::error::AppError;

lazy_static! {
    // Display names: letters, digits, spaces, apostrophes, dots, underscores, hyphens.
    pub(crate) static ref NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[\p{L}\p{N} .'_-]+$").unwrap();
}

/// bcrypt ignores input past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Rejects empty passwords and passwords bcrypt would silently truncate.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() || password.len() > MAX_PASSWORD_BYTES {
        let mut error = ValidationError::new("password_length");
        error.message = Some("Password must be between 1 and 72 bytes".into());
        return Err(error);
    }
    Ok(())
}

/// Rejects names and titles made only of whitespace, which are stored trimmed.
pub fn validate_not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Must contain a non-whitespace character".into());
        return Err(error);
    }
    Ok(())
}

/// Lowercases and trims an email so uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Coarse global privilege, independent of any per-project role.
/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Member,
    Guest,
}

/// A user as returned by the API. The password digest is never part of it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// The subset of a user embedded in task listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Login lookup row: identity plus the stored digest.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub password_hash: String,
}

/// A user ready for insertion, with the password already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Partial update of a user. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(
        length(min = 1, max = 100),
        regex(path = "NAME_REGEX", message = "Name contains unsupported characters"),
        custom = "validate_not_blank"
    )]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "validate_password")]
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none() && self.role.is_none()
    }
}

const USER_COLUMNS: &str = "id, name, email, role, created_at";

impl User {
    pub async fn create(pool: &PgPool, new_user: &NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    pub async fn credentials_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, name, email, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(credentials)
    }

    /// Applies the supplied fields; `password_hash` replaces the stored digest when set.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        changes: &UserUpdate,
        password_hash: Option<&str>,
    ) -> Result<User, AppError> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");

        if let Some(name) = &changes.name {
            fields.push("name = ").push_bind_unseparated(name.trim().to_string());
        }
        if let Some(email) = &changes.email {
            fields.push("email = ").push_bind_unseparated(normalize_email(email));
        }
        if let Some(hash) = password_hash {
            fields.push("password_hash = ").push_bind_unseparated(hash.to_string());
        }
        if let Some(role) = changes.role {
            fields.push("role = ").push_bind_unseparated(role);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", USER_COLUMNS));

        let user = builder.build_query_as::<User>().fetch_one(pool).await?;
        Ok(user)
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_user_update_validation() {
        let valid = UserUpdate {
            name: Some("Ada Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
            password: Some("pw1".to_string()),
            role: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = UserUpdate {
            email: Some("invalid-email".to_string()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());

        let bad_name = UserUpdate {
            name: Some("<script>".to_string()),
            ..Default::default()
        };
        assert!(bad_name.validate().is_err());

        let blank_name = UserUpdate {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank_name.validate().is_err());

        let empty_password = UserUpdate {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn test_password_byte_limit() {
        assert!(validate_password("pw1").is_ok());
        assert!(validate_password(&"a".repeat(72)).is_ok());
        assert!(validate_password(&"a".repeat(73)).is_err());
        // 25 three-byte characters exceed the limit despite being 25 chars long.
        assert!(validate_password(&"€".repeat(25)).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }

    #[test]
    fn test_role_defaults_to_member() {
        assert_eq!(UserRole::default(), UserRole::Member);
        let role: UserRole = serde_json::from_str(r#""guest""#).unwrap();
        assert_eq!(role, UserRole::Guest);
    }

    #[test]
    fn test_empty_update() {
        assert!(UserUpdate::default().is_empty());
        let update = UserUpdate {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
