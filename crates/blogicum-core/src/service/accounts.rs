//! Registration and login on top of the password and token ports.

use std::sync::Arc;

use crate::domain::{NewUser, User, is_valid_username};
use crate::error::{DomainError, ValidationErrors};
use crate::ports::{AuthError, BaseRepository, PasswordService, TokenService, UserRepository};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Submitted registration form.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !is_valid_username(&self.username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password1",
                "This password is too short. It must contain at least 8 characters.",
            );
        }
        if self.password != self.password_confirmation {
            errors.add("password2", "The two password fields didn't match.");
        }
        errors.into_result()
    }
}

/// An authenticated account and its freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenService> {
        &self.tokens
    }

    /// Creates an account and logs it in.
    pub async fn register(&self, form: Registration) -> Result<Session, DomainError> {
        form.validate()?;
        if self.users.find_by_username(&form.username).await?.is_some() {
            return Err(ValidationErrors::single(
                "username",
                "A user with that username already exists.",
            )
            .into());
        }

        let hash = self.passwords.hash(&form.password).map_err(internal)?;
        let user = self
            .users
            .create(NewUser::new(form.username, form.email, hash))
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        self.open_session(user)
    }

    /// Wrong username and wrong password fail the same way.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, DomainError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Err(invalid_login());
        };
        if !self
            .passwords
            .verify(password, &user.password_hash)
            .map_err(internal)?
        {
            tracing::warn!(username, "Failed login attempt");
            return Err(invalid_login());
        }

        tracing::info!(user_id = user.id, "User logged in");
        self.open_session(user)
    }

    fn open_session(&self, user: User) -> Result<Session, DomainError> {
        let token = self
            .tokens
            .generate_token(user.id, &user.username)
            .map_err(internal)?;
        Ok(Session { user, token })
    }
}

fn invalid_login() -> DomainError {
    ValidationErrors::single(
        "__all__",
        "Please enter a correct username and password. Note that both fields may be case-sensitive.",
    )
    .into()
}

fn internal(err: AuthError) -> DomainError {
    DomainError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> Registration {
        Registration {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "correct-horse".to_string(),
            password_confirmation: "correct-horse".to_string(),
        }
    }

    #[test]
    fn test_registration_accepts_valid_form() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn test_registration_rejects_short_or_mismatched_password() {
        let mut short = form();
        short.password = "short".to_string();
        short.password_confirmation = "short".to_string();
        assert!(short.validate().unwrap_err().contains("password1"));

        let mut mismatch = form();
        mismatch.password_confirmation = "different-one".to_string();
        assert!(mismatch.validate().unwrap_err().contains("password2"));
    }

    #[test]
    fn test_registration_rejects_bad_username() {
        let mut bad = form();
        bad.username = "no spaces".to_string();
        assert!(bad.validate().unwrap_err().contains("username"));
    }
}
