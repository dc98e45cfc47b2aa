//! Accounts and login sessions.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests with a per-user salt
//! and round count. A login issues an HS256 JWT; its `jti` must still be
//! listed in `sessions.json` for `me` to accept it, so dropping a session
//! record revokes the token.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::storage::{Collection, Storage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Employee => write!(f, "employee"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(Error::invalid("role", format!("'{other}' is not employee or admin"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub eid: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "passwordHash")]
    pub password_hash: String,
    pub salt: String,
    pub iterations: u32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// User record without credential material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub eid: String,
    pub name: String,
    pub role: Role,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            eid: user.eid.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// A live login. `id` is the `jti` of the token issued for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub eid: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    jti: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SigningKey {
    secret: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub eid: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

#[derive(Debug, Clone)]
pub struct UserStore {
    storage: Storage,
    config: AuthConfig,
}

impl UserStore {
    pub fn new(storage: Storage, config: AuthConfig) -> Self {
        Self { storage, config }
    }

    pub fn register(&self, input: Registration) -> Result<PublicUser> {
        let eid = input.eid.trim().to_string();
        if eid.is_empty() {
            return Err(Error::MissingField("eid".to_string()));
        }
        if input.password.is_empty() {
            return Err(Error::MissingField("password".to_string()));
        }
        if input.password.chars().count() < self.config.min_password_len {
            return Err(Error::invalid(
                "password",
                format!("must be at least {} characters", self.config.min_password_len),
            ));
        }

        let salt = random_bytes::<16>();
        let iterations = self.config.pbkdf2_iterations;
        let user = User {
            name: input.name.trim().to_string(),
            role: input.role,
            password_hash: hex::encode(derive_key(&input.password, &salt, iterations)),
            salt: hex::encode(salt),
            iterations,
            created_at: Utc::now(),
            eid,
        };

        self.storage.update(Collection::Users, |users: &mut Vec<User>| {
            if users.iter().any(|u| u.eid == user.eid) {
                return Err(Error::AlreadyExists(format!("user '{}'", user.eid)));
            }
            users.push(user.clone());
            Ok(())
        })?;
        tracing::info!(eid = %user.eid, role = %user.role, "user registered");
        Ok(PublicUser::from(&user))
    }

    /// Verify credentials and issue a session token.
    ///
    /// An unknown eid and a wrong password fail the same way, and both pay
    /// for one key derivation.
    pub fn login(&self, eid: &str, password: &str) -> Result<LoginOutcome> {
        let users: Vec<User> = self.storage.read(Collection::Users)?;
        let user = users.iter().find(|u| u.eid == eid.trim());
        let verified = match user {
            Some(user) => verify_password(user, password),
            None => {
                derive_key(password, &[0u8; 16], self.config.pbkdf2_iterations);
                false
            }
        };
        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::debug!(eid, "login rejected");
                return Err(Error::InvalidCredentials);
            }
        };

        let now = Utc::now();
        let expires_at = TimeDelta::try_hours(self.config.session_ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "auth.session_ttl_hours {} is out of range",
                    self.config.session_ttl_hours
                ))
            })?;
        let session = Session {
            id: Uuid::new_v4().to_string(),
            eid: user.eid.clone(),
            expires_at,
        };
        let claims = Claims {
            sub: user.eid.clone(),
            role: user.role,
            jti: session.id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let secret = self.signing_secret()?;
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&secret),
        )
        .map_err(|e| Error::OperationFailed(format!("token signing failed: {e}")))?;

        self.storage
            .update(Collection::Sessions, |sessions: &mut Vec<Session>| {
                sessions.retain(|s| s.expires_at > now);
                sessions.push(session.clone());
                Ok(())
            })?;
        tracing::info!(eid = %user.eid, session = %session.id, "session opened");

        Ok(LoginOutcome {
            token,
            expires_at,
            user: PublicUser::from(user),
        })
    }

    /// Resolve a session token to its user.
    ///
    /// A bad signature, an expired token and a revoked session all read as
    /// an unknown session.
    pub fn me(&self, token: &str) -> Result<PublicUser> {
        let unknown = || Error::not_found("session", "token");
        let secret = self.signing_secret()?;
        let claims = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&secret),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            unknown()
        })?
        .claims;

        let sessions: Vec<Session> = self.storage.read(Collection::Sessions)?;
        let session = sessions
            .iter()
            .find(|s| s.id == claims.jti && s.eid == claims.sub && s.expires_at > Utc::now())
            .ok_or_else(unknown)?;

        let users: Vec<User> = self.storage.read(Collection::Users)?;
        users
            .iter()
            .find(|u| u.eid == session.eid)
            .map(PublicUser::from)
            .ok_or_else(|| Error::not_found("user", session.eid.clone()))
    }

    /// Token secret from config, or the one kept in `keys.json`, created on
    /// first use.
    fn signing_secret(&self) -> Result<Vec<u8>> {
        if let Some(secret) = &self.config.jwt_secret {
            return Ok(secret.as_bytes().to_vec());
        }

        let keys: Vec<SigningKey> = self.storage.read(Collection::Keys)?;
        let secret = match keys.first() {
            Some(key) => key.secret.clone(),
            None => self
                .storage
                .update(Collection::Keys, |keys: &mut Vec<SigningKey>| {
                    if keys.is_empty() {
                        keys.push(SigningKey {
                            secret: hex::encode(random_bytes::<32>()),
                            created_at: Utc::now(),
                        });
                        tracing::info!("token signing key generated");
                    }
                    Ok(keys[0].secret.clone())
                })?,
        };
        hex::decode(secret).map_err(|e| Error::OperationFailed(format!("keys.json: {e}")))
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn verify_password(user: &User, password: &str) -> bool {
    let (Ok(salt), Ok(expected)) = (hex::decode(&user.salt), hex::decode(&user.password_hash))
    else {
        tracing::warn!(eid = %user.eid, "stored credential is not valid hex");
        return false;
    };
    let actual = derive_key(password, &salt, user.iterations);
    bool::from(actual.as_slice().ct_eq(expected.as_slice()))
}

/// OS-random bytes, drawn through v4 uuids.
fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    for chunk in out.chunks_mut(16) {
        let id = Uuid::new_v4();
        chunk.copy_from_slice(&id.as_bytes()[..chunk.len()]);
    }
    out
}
