use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::clock::SharedClock;
use crate::error::{AppError, Result};
use crate::models::{NewUser, Settings, Unit, User};
use crate::store::Store;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AccountService<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> AccountService<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        let email = new_user.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if new_user.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.store.get::<User>(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "This email is already registered".to_string(),
            ));
        }

        let user = User {
            email,
            password_hash: hash_password(&new_user.password)?,
            role: new_user.role,
            name: new_user
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_at: self.clock.now(),
        };
        self.store.put(&user).await?;

        tracing::info!("Registered {} as {}", user.email, user.role.as_str());
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = self.user(email).await?;

        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            tracing::debug!("Rejected login for {}", user.email);
            Err(AppError::Unauthorized)
        }
    }

    pub async fn user(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        self.store
            .get::<User>(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn unit(&self, email: &str) -> Result<Unit> {
        let settings = self.store.get::<Settings>(&Settings::key_for(email)).await?;
        Ok(settings.map(|s| s.unit).unwrap_or_default())
    }

    pub async fn set_unit(&self, email: &str, unit: Unit) -> Result<Settings> {
        let settings = Settings {
            user_key: Settings::key_for(email),
            unit,
            updated_at: self.clock.now(),
        };
        self.store.put(&settings).await?;
        Ok(settings)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AppError::PasswordHash)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AppError::PasswordHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
