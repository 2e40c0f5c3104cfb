// User request validation and response shapes

use crate::db::schema::User;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 254;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CreateUserRequest {
    pub fn validate(&self, password_min_length: usize) -> Result<()> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;

        if self.password.chars().count() < password_min_length {
            return Err(AppError::ValidationError(format!(
                "password must be at least {} characters",
                password_min_length
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateUserRequest {
    /// Fields that are present must satisfy the create rules; empty strings are ignored
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.name() {
            validate_name(name)?;
        }
        if let Some(email) = self.email() {
            validate_email(email)?;
        }
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|s| !s.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(AppError::ValidationError("email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::ValidationError("password is required".to_string()));
        }
        Ok(())
    }
}

/// Public view of a user; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.trim().chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "name must be between {} and {} characters",
            NAME_MIN, NAME_MAX
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };

    if !valid || email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return Err(AppError::ValidationError("Invalid email format".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(name: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_create_user_validation() {
        assert!(create_request("Ada", "ada@example.com", "secret1").validate(6).is_ok());
        assert!(create_request("A", "ada@example.com", "secret1").validate(6).is_err());
        assert!(create_request("Ada", "ada@example.com", "short").validate(6).is_err());
    }

    #[test]
    fn test_email_validation() {
        for email in ["", "ada", "ada@", "@example.com", "ada@example", "a da@example.com", "ada@@example.com"] {
            assert!(validate_email(email).is_err(), "{} should be rejected", email);
        }
        assert!(validate_email("ada.lovelace@math.example.org").is_ok());
    }

    #[test]
    fn test_update_ignores_empty_fields() {
        let request = UpdateUserRequest {
            name: Some(String::new()),
            email: Some("new@example.com".to_string()),
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.name(), None);
        assert_eq!(request.email(), Some("new@example.com"));

        let invalid = UpdateUserRequest {
            name: Some("X".to_string()),
            email: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_login_validation() {
        let request = LoginRequest {
            email: " ".to_string(),
            password: "secret".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_user_response_hides_password() {
        let now = Utc::now();
        let response = UserResponse::from(User {
            id: 1,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at: now,
            updated_at: now,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }
}
