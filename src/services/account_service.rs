use crate::{
    entities::{user, UserId, UserModel},
    errors::ServiceError,
    repositories::UserRepository,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserInput {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.username.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Username must not be empty".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(ServiceError::ValidationError(
                "Password must not be empty".to_string(),
            ));
        }
        if !self.email.contains('@') {
            return Err(ServiceError::ValidationError(
                "Email must contain '@'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Registration and credential checks for storefront users.
///
/// Passwords are opaque: they are stored and compared verbatim.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    users: UserRepository,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            users: UserRepository::new(),
        }
    }

    /// Register a new user, rejecting a username that is already taken
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterUserInput) -> Result<UserId, ServiceError> {
        input.validate()?;

        let existing = self
            .users
            .find_one(
                &*self.db,
                Condition::all().add(user::Column::Username.eq(input.username.as_str())),
            )
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        let username = input.username.clone();
        let created = self
            .users
            .insert(
                &*self.db,
                user::ActiveModel {
                    username: Set(input.username),
                    email: Set(input.email),
                    password: Set(input.password),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            // A concurrent registration can win between the check and the insert
            .map_err(|e| {
                ServiceError::from_write(e, || format!("Username '{}' is already taken", username))
            })?;

        info!(user_id = created.id, "User registered");
        Ok(created.id)
    }

    /// Resolve a user id from an exact username and password match
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserId, ServiceError> {
        let found = self
            .users
            .find_one(
                &*self.db,
                Condition::all()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Password.eq(password)),
            )
            .await?;

        match found {
            Some(user) => Ok(user.id),
            None => {
                warn!("Authentication failed");
                Err(ServiceError::AuthError("Invalid credentials".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: UserId) -> Result<UserModel, ServiceError> {
        self.users
            .find_by_id(&*self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn input(username: &str, email: &str, password: &str) -> RegisterUserInput {
        RegisterUserInput {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_registration() {
        assert!(input("alice", "alice@example.com", "pw").validate().is_ok());
    }

    #[test]
    fn rejects_blank_username() {
        assert_matches!(
            input("   ", "a@example.com", "pw").validate(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn rejects_empty_password() {
        assert_matches!(
            input("alice", "a@example.com", "").validate(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn rejects_email_without_at_sign() {
        assert_matches!(
            input("alice", "alice.example.com", "pw").validate(),
            Err(ServiceError::ValidationError(msg)) if msg.contains('@')
        );
    }

    #[test]
    fn register_input_deserializes_from_json() {
        let json = r#"{"username":"bob","email":"bob@example.com","password":"s3cret"}"#;
        let parsed: RegisterUserInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.username, "bob");
        assert_eq!(parsed.password, "s3cret");
    }
}
