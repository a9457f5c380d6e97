//! Authentication and account management.
//!
//! Issues short-lived JWT access tokens alongside opaque refresh tokens.
//! Refresh tokens are random strings stored server-side in the `sessions`
//! collection, so revocation is just a delete; they are rotated on every
//! refresh.

mod error;

pub use error::AuthError;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use himorganic_core::{AdminRole, Email};

use crate::config::{ACCESS_TOKEN_DAYS, REFRESH_TOKEN_DAYS, ServerConfig};
use crate::models::{Admin, PublicProfile, Session, User};
use crate::store::{Filter, Store, Update};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Email of the admin account bootstrapped on first run.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@himorganic.com";

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// JWT access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Account id (user or admin).
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Authentication service over the shared store.
pub struct AuthService<'a> {
    store: &'a Store,
    config: &'a ServerConfig,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub fn new(store: &'a Store, config: &'a ServerConfig) -> Self {
        Self { store, config }
    }

    /// Register a new customer account and log them in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountExists`] if the email is taken, or a
    /// validation error for a bad email or short password.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(PublicProfile, TokenPair), AuthError> {
        let email = Email::parse(email)?;
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
        }

        let users = self.store.collection::<User>();
        if users
            .exists(Filter::all().eq("email", email.as_str()))
            .await?
        {
            return Err(AuthError::AccountExists);
        }

        let hash = self.hash_password(password)?;
        let user = User::new(name.trim().to_string(), email, hash);
        users.create(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");

        let tokens = self
            .issue_tokens(user.id.as_uuid(), user.email.as_str(), &user.name, false)
            .await?;
        Ok((user.public(), tokens))
    }

    /// Log a customer in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email, wrong
    /// password, or deactivated account.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(PublicProfile, TokenPair), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let users = self.store.collection::<User>();
        let user = users
            .find_one(Filter::all().eq("email", email.as_str()))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active || !self.verify_password(password, &user.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let user = users
            .update_by_id(user.id, Update::default().set("lastLogin", Utc::now()))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let tokens = self
            .issue_tokens(user.id.as_uuid(), user.email.as_str(), &user.name, false)
            .await?;
        Ok((user.public(), tokens))
    }

    /// Log an admin in against the `admins` collection.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for unknown email or wrong
    /// password.
    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(PublicProfile, TokenPair), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let admins = self.store.collection::<Admin>();
        let admin = admins
            .find_one(Filter::all().eq("email", email.as_str()))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &admin.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let admin = admins
            .update_by_id(admin.id, Update::default().set("lastLogin", Utc::now()))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let tokens = self
            .issue_tokens(admin.id.as_uuid(), admin.email.as_str(), &admin.name, true)
            .await?;
        Ok((admin.public(), tokens))
    }

    /// Exchange a refresh token for a new token pair, rotating the session.
    ///
    /// The presented token is deleted whether or not a new pair is issued, so
    /// a stolen-and-replayed token dies on first use.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRefreshToken`] if the token is unknown or
    /// expired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let sessions = self.store.collection::<Session>();
        let session = sessions
            .find_one(Filter::all().eq("refreshToken", refresh_token))
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        sessions.delete_by_id(session.id).await?;
        if session.is_expired(Utc::now()) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let (email, name) = if session.is_admin {
            let admin = self
                .store
                .collection::<Admin>()
                .find_by_id(session.user_id)
                .await?
                .ok_or(AuthError::InvalidRefreshToken)?;
            (admin.email.into_inner(), admin.name)
        } else {
            let user = self
                .store
                .collection::<User>()
                .find_by_id(session.user_id)
                .await?
                .ok_or(AuthError::InvalidRefreshToken)?;
            (user.email.into_inner(), user.name)
        };

        self.issue_tokens(session.user_id, &email, &name, session.is_admin)
            .await
    }

    /// Revoke a refresh token. Unknown tokens are silently accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] only on a storage failure.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.store
            .collection::<Session>()
            .delete_one(Filter::all().eq("refreshToken", refresh_token))
            .await?;
        Ok(())
    }

    /// Load the profile for an authenticated account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountNotFound`] if the account behind the token
    /// no longer exists.
    pub async fn profile(&self, claims: &Claims) -> Result<PublicProfile, AuthError> {
        if claims.is_admin {
            let admin = self
                .store
                .collection::<Admin>()
                .find_by_id(claims.sub)
                .await?
                .ok_or(AuthError::AccountNotFound)?;
            Ok(admin.public())
        } else {
            let user = self
                .store
                .collection::<User>()
                .find_by_id(claims.sub)
                .await?
                .ok_or(AuthError::AccountNotFound)?;
            Ok(user.public())
        }
    }

    /// Update the authenticated account's own profile, customer or admin.
    ///
    /// Changing the password requires the current password; changing the
    /// email enforces uniqueness within the account's collection.
    ///
    /// # Errors
    ///
    /// Returns validation or credential errors per field, or
    /// [`AuthError::AccountNotFound`] for a stale token.
    pub async fn update_profile(
        &self,
        claims: &Claims,
        changes: ProfileUpdate,
    ) -> Result<PublicProfile, AuthError> {
        if claims.is_admin {
            self.update_admin_profile(claims.sub, changes).await
        } else {
            self.update_user_profile(claims.sub, changes).await
        }
    }

    async fn update_user_profile(
        &self,
        account_id: Uuid,
        changes: ProfileUpdate,
    ) -> Result<PublicProfile, AuthError> {
        let users = self.store.collection::<User>();
        let user = users
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let mut update = Update::default();

        if let Some(name) = changes.name {
            update = update.set("name", name.trim());
        }
        if let Some(phone) = changes.phone {
            update = update.set("phone", phone);
        }
        if let Some(email) = changes.email {
            let email = Email::parse(&email)?;
            if email != user.email {
                if users
                    .exists(Filter::all().eq("email", email.as_str()))
                    .await?
                {
                    return Err(AuthError::AccountExists);
                }
                update = update.set("email", email.as_str());
            }
        }
        if let Some(new_password) = changes.new_password {
            update = update.set(
                "password",
                self.rehash_password(changes.current_password.as_deref(), &new_password, &user.password)?,
            );
        }

        if update.is_empty() {
            return Ok(user.public());
        }

        let updated = users
            .update_by_id(user.id, update)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        Ok(updated.public())
    }

    async fn update_admin_profile(
        &self,
        account_id: Uuid,
        changes: ProfileUpdate,
    ) -> Result<PublicProfile, AuthError> {
        let admins = self.store.collection::<Admin>();
        let admin = admins
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let mut update = Update::default();

        if let Some(name) = changes.name {
            update = update.set("name", name.trim());
        }
        if let Some(email) = changes.email {
            let email = Email::parse(&email)?;
            if email != admin.email {
                if admins
                    .exists(Filter::all().eq("email", email.as_str()))
                    .await?
                {
                    return Err(AuthError::AccountExists);
                }
                update = update.set("email", email.as_str());
            }
        }
        if let Some(new_password) = changes.new_password {
            update = update.set(
                "password",
                self.rehash_password(changes.current_password.as_deref(), &new_password, &admin.password)?,
            );
        }

        if update.is_empty() {
            return Ok(admin.public());
        }

        let updated = admins
            .update_by_id(admin.id, update)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        Ok(updated.public())
    }

    /// Verify the current password and hash the replacement.
    fn rehash_password(
        &self,
        current: Option<&str>,
        new_password: &str,
        stored_hash: &str,
    ) -> Result<String, AuthError> {
        let current = current.ok_or(AuthError::CurrentPasswordRequired)?;
        if !self.verify_password(current, stored_hash)? {
            return Err(AuthError::WrongCurrentPassword);
        }
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
        }
        self.hash_password(new_password)
    }

    /// Create the bootstrap admin account if no admins exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on a storage or hashing failure.
    pub async fn ensure_default_admin(&self) -> Result<(), AuthError> {
        let admins = self.store.collection::<Admin>();
        if admins.count(Filter::all()).await? > 0 {
            return Ok(());
        }

        let admin = Admin::new(
            "Admin".to_string(),
            Email::parse(DEFAULT_ADMIN_EMAIL)?,
            self.hash_password(DEFAULT_ADMIN_PASSWORD)?,
            AdminRole::SuperAdmin,
            Admin::all_permissions(),
        );
        admins.create(&admin).await?;
        tracing::warn!(
            email = DEFAULT_ADMIN_EMAIL,
            "created default admin account; change its password"
        );
        Ok(())
    }

    /// Decode and verify an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for a bad signature, malformed
    /// token, or expired claims.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let key = DecodingKey::from_secret(self.config.jwt_secret.expose_secret().as_bytes());
        let mut validation = Validation::default();
        validation.set_required_spec_claims(&["exp"]);
        jsonwebtoken::decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    async fn issue_tokens(
        &self,
        account_id: Uuid,
        email: &str,
        name: &str,
        is_admin: bool,
    ) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            name: name.to_string(),
            is_admin,
            iat: now.timestamp(),
            exp: (now + Duration::days(ACCESS_TOKEN_DAYS)).timestamp(),
        };
        let access_token = self.encode_claims(&claims)?;

        let refresh_token = generate_refresh_token();
        let session = Session::new(
            account_id,
            is_admin,
            refresh_token.clone(),
            Duration::days(REFRESH_TOKEN_DAYS),
        );
        self.store.collection::<Session>().create(&session).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        let key = EncodingKey::from_secret(self.config.jwt_secret.expose_secret().as_bytes());
        jsonwebtoken::encode(&Header::default(), claims, &key).map_err(AuthError::TokenSigning)
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, self.config.bcrypt_cost)?)
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
