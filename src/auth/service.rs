//! Login, signup and bearer-token resolution on top of the record accessor.

use super::password::{hash_password, verify_password};
use super::token::TokenService;
use crate::error::{AccessError, AuthError, TokenError};
use crate::models::User;
use crate::record::Record;
use crate::registry::{is_valid_email, Entity, Registry};
use crate::service::Accessor;
use crate::store::{Store, UnitOfWork};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

/// Decoded view of a still-valid token, as returned by `/auth/token/validate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub exp: DateTime<Utc>,
    pub sub: Option<String>,
    pub expires_in: i64,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    registry: Arc<Registry>,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, registry: Arc<Registry>, tokens: TokenService, bcrypt_cost: u32) -> Self {
        AuthService {
            store,
            registry,
            tokens,
            bcrypt_cost,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    async fn begin(&self) -> Result<UnitOfWork, AuthError> {
        Ok(UnitOfWork::begin(self.store.as_ref())
            .await
            .map_err(AccessError::from)?)
    }

    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn login(&self, creds: &Credentials) -> Result<AccessToken, AuthError> {
        let mut uow = self.begin().await?;
        let filters = Record::new().with("email", creds.email.as_str());
        let found = Accessor::new(&self.registry, &mut uow)
            .find_one(User::TABLE, &filters)
            .await;
        let row = match found {
            Ok(row) => row,
            Err(AccessError::NotFound(_)) | Err(AccessError::Validation(_)) => {
                tracing::warn!("login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };
        let digest = row.get_str("hashed_password").unwrap_or_default();
        if !verify_password(&creds.password, digest).await? {
            tracing::warn!("login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        let user_id = row
            .get_str("id")
            .ok_or_else(|| AccessError::Internal("user row without id".into()))?;
        let access_token = self.tokens.issue(user_id)?;
        Ok(AccessToken {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Create an account. A taken email, whether seen at insert or at commit,
    /// is `CouldNotCreate`.
    pub async fn signup(&self, creds: &Credentials) -> Result<User, AuthError> {
        if !is_valid_email(&creds.email) {
            return Err(AuthError::InvalidEmail);
        }
        let hashed = hash_password(&creds.password, self.bcrypt_cost).await?;
        let data = Record::new()
            .with("email", creds.email.as_str())
            .with("hashed_password", hashed)
            .with("is_active", true);

        let mut uow = self.begin().await?;
        let created = Accessor::new(&self.registry, &mut uow)
            .create(User::TABLE, &data)
            .await
            .map_err(could_not_create)?;
        uow.commit()
            .await
            .map_err(|e| could_not_create(AccessError::from(e)))?;

        tracing::info!(user_id = ?created.get_str("id"), "user signed up");
        Ok(created
            .into_typed::<User>()
            .map_err(|e| AccessError::Internal(e.to_string()))?)
    }

    /// Decode a token for `/auth/token/validate`. Unlike [`Self::authenticate`],
    /// this surfaces expiry and signature failures as distinct errors.
    pub fn inspect(&self, token: &str) -> Result<TokenInfo, AuthError> {
        let claims = self.tokens.validate(token)?;
        let exp = claims.exp.ok_or(AuthError::MissingExpiry)?;
        let exp_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| TokenError::Invalid(format!("exp out of range: {}", exp)))?;
        Ok(TokenInfo {
            exp: exp_at,
            sub: claims.sub,
            expires_in: (exp_at - Utc::now()).num_seconds(),
        })
    }

    /// Resolve a bearer token to the stored user. Every failure except a store
    /// fault reads as `Unauthenticated`.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.validate(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AuthError::Unauthenticated
        })?;
        if claims.exp.is_none() {
            return Err(AuthError::Unauthenticated);
        }
        let user_id = claims
            .sub
            .as_deref()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .ok_or(AuthError::Unauthenticated)?;

        let mut uow = self.begin().await?;
        let filters = Record::new().with("id", user_id.to_string());
        let row = match Accessor::new(&self.registry, &mut uow)
            .find_one(User::TABLE, &filters)
            .await
        {
            Ok(row) => row,
            Err(AccessError::NotFound(_)) => return Err(AuthError::Unauthenticated),
            Err(e) => return Err(e.into()),
        };
        Ok(row
            .into_typed::<User>()
            .map_err(|e| AccessError::Internal(e.to_string()))?)
    }
}

fn could_not_create(e: AccessError) -> AuthError {
    match e {
        AccessError::Conflict(_) | AccessError::Constraint(_) | AccessError::Validation(_) => {
            tracing::warn!(error = %e, "signup rejected");
            AuthError::CouldNotCreate
        }
        other => other.into(),
    }
}
