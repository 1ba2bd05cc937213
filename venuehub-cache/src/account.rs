//! Account provisioning: signup and login across the role collections.
//!
//! Accounts are not cached. Signup writes one record to the shared `auth`
//! collection and one profile record to the role's own collection, then
//! links the two. Login checks the configured built-in credentials before
//! looking in `auth`.

use crate::error::ServiceError;
use crate::sync::transport_error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use venuehub_model::{
    AuthAccount, CREATED_AT, Fields, Hotel, Record, Role, Status, UPDATED_AT, User, Vendor,
    decode, validate_draft,
};
use venuehub_store::{DocumentStore, Query, server_timestamp};
use venuehub_types::DocumentId;

const AUTH_COLLECTION: &str = "auth";
const MIN_PASSWORD_LEN: usize = 6;

/// Result type for account operations.
pub type AccountResult<T> = Result<T, AccountError>;

#[derive(Debug, Error)]
pub enum AccountError {
    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account exists but is not active.
    #[error("account {0} is not active")]
    Inactive(String),

    #[error("an account for {0} already exists")]
    EmailTaken(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<venuehub_model::ModelError> for AccountError {
    fn from(err: venuehub_model::ModelError) -> Self {
        Self::Service(err.into())
    }
}

fn invalid(reason: impl Into<String>) -> AccountError {
    AccountError::Service(ServiceError::Validation(reason.into()))
}

/// Hex-encoded SHA-256 of a password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A login accepted without an `auth` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltinCredential {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
}

impl BuiltinCredential {
    pub fn new(email: &str, password: &str, role: Role, name: &str) -> Self {
        Self {
            email: normalize_email(email),
            password_hash: hash_password(password),
            role,
            name: name.to_string(),
        }
    }
}

/// Everything needed to open an account.
///
/// `profile` holds the role-specific fields (a vendor's `businessName` and
/// `serviceType`, a hotel's `name` and `location`, ...). Contact fields the
/// account already carries are filled in when absent.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub role: Role,
    pub email: String,
    pub password: String,
    pub name: String,
    pub profile: Fields,
}

/// A successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// `None` for built-in credentials.
    pub account_id: Option<DocumentId>,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub profile_id: Option<DocumentId>,
}

impl Session {
    pub fn is_builtin(&self) -> bool {
        self.account_id.is_none()
    }
}

/// Signup and login over the store.
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    builtin: Vec<BuiltinCredential>,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, builtin: Vec<BuiltinCredential>) -> Self {
        Self { store, builtin }
    }

    /// Opens an account: an `auth` record plus a profile in the role's
    /// collection, linked both ways.
    ///
    /// The profile is written straight to the store; use
    /// [`Services::signup`](crate::Services::signup) to also refresh the
    /// profile collection's mirror.
    pub async fn signup(&self, request: SignupRequest) -> AccountResult<AuthAccount> {
        let role = request.role;
        let Some(profile_collection) = role.profile_collection() else {
            return Err(invalid(format!("cannot sign up as {role}")));
        };
        let email = normalize_email(&request.email);
        if !email.contains('@') {
            return Err(invalid(format!("`{email}` is not an email address")));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut auth_fields = Fields::new();
        auth_fields.insert("email".into(), Value::String(email.clone()));
        auth_fields.insert(
            "passwordHash".into(),
            Value::String(hash_password(&request.password)),
        );
        auth_fields.insert("role".into(), Value::String(role.as_str().into()));
        auth_fields.insert("name".into(), Value::String(request.name.trim().into()));
        auth_fields.insert("status".into(), Value::String(Status::Active.to_string()));
        validate_draft::<AuthAccount>(&auth_fields)?;

        let mut profile = profile_fields(role, &email, &request);
        validate_profile(role, &profile)?;

        if self.email_taken(&email).await? {
            return Err(AccountError::EmailTaken(email));
        }

        stamp_new(&mut auth_fields);
        let auth_id = self
            .store
            .add(AUTH_COLLECTION, auth_fields)
            .await
            .map_err(|e| transport_error(AUTH_COLLECTION, "signup", e))?;

        let link_key = if role == Role::Hotel { "ownerId" } else { "authId" };
        profile.insert(link_key.into(), Value::String(auth_id.to_string()));
        stamp_new(&mut profile);
        let profile_id = match self.store.add(profile_collection, profile).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Profile creation for {} failed, removing auth record {}", email, auth_id);
                if let Err(cleanup) = self.store.delete(AUTH_COLLECTION, &auth_id).await {
                    warn!("Could not remove auth record {}: {}", auth_id, cleanup);
                }
                return Err(transport_error(profile_collection, "signup", e).into());
            }
        };

        let mut link = Fields::new();
        link.insert("profileId".into(), Value::String(profile_id.to_string()));
        link.insert(UPDATED_AT.into(), server_timestamp());
        self.store
            .update(AUTH_COLLECTION, &auth_id, link)
            .await
            .map_err(|e| transport_error(AUTH_COLLECTION, "signup", e))?;

        info!("Signed up {} as {} ({}/{})", email, role, profile_collection, profile_id);
        self.read_account(&auth_id).await
    }

    /// Checks credentials. Built-in credentials win over `auth` records.
    pub async fn login(&self, email: &str, password: &str) -> AccountResult<Session> {
        let email = normalize_email(email);
        let hash = hash_password(password);

        if let Some(builtin) = self.builtin.iter().find(|c| c.email == email) {
            if builtin.password_hash != hash {
                return Err(AccountError::InvalidCredentials);
            }
            info!("Built-in login for {}", email);
            return Ok(Session {
                account_id: None,
                email,
                role: builtin.role,
                name: builtin.name.clone(),
                profile_id: None,
            });
        }

        let account = self
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if account.password_hash != hash {
            return Err(AccountError::InvalidCredentials);
        }
        if !account.is_active() {
            return Err(AccountError::Inactive(email));
        }

        info!("Login for {} ({})", email, account.role);
        Ok(Session {
            account_id: Some(account.id),
            email: account.email,
            role: account.role,
            name: account.name,
            profile_id: account.profile_id,
        })
    }

    /// Looks an account up by email.
    pub async fn find_by_email(&self, email: &str) -> AccountResult<Option<AuthAccount>> {
        let query = Query::all()
            .filter("email", normalize_email(email))
            .limit(1);
        let docs = self
            .store
            .query(AUTH_COLLECTION, &query)
            .await
            .map_err(|e| transport_error(AUTH_COLLECTION, "login", e))?;
        Ok(docs.first().map(decode::<AuthAccount>).transpose()?)
    }

    /// Changes an account's status, e.g. to suspend it.
    pub async fn set_status(&self, account_id: &DocumentId, status: Status) -> AccountResult<()> {
        let mut patch = Fields::new();
        patch.insert("status".into(), Value::String(status.to_string()));
        patch.insert(UPDATED_AT.into(), server_timestamp());
        self.store
            .update(AUTH_COLLECTION, account_id, patch)
            .await
            .map_err(|e| transport_error(AUTH_COLLECTION, "set status", e))?;
        info!("Account {} is now {}", account_id, status);
        Ok(())
    }

    async fn email_taken(&self, email: &str) -> AccountResult<bool> {
        if self.builtin.iter().any(|c| c.email == email) {
            return Ok(true);
        }
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn read_account(&self, id: &DocumentId) -> AccountResult<AuthAccount> {
        let doc = self
            .store
            .get(AUTH_COLLECTION, id)
            .await
            .map_err(|e| transport_error(AUTH_COLLECTION, "read", e))?
            .ok_or_else(|| ServiceError::not_found(AUTH_COLLECTION, id))?;
        Ok(decode::<AuthAccount>(&doc)?)
    }
}

/// Builds the role record, filling in what the account already knows.
fn profile_fields(role: Role, email: &str, request: &SignupRequest) -> Fields {
    let mut profile = request.profile.clone();
    let name = Value::String(request.name.trim().to_string());
    let mut fill = |key: &str, value: Value| {
        profile.entry(key.to_string()).or_insert(value);
    };
    match role {
        Role::User => {
            fill("name", name);
            fill("email", Value::String(email.to_string()));
            fill("role", Value::String(role.as_str().into()));
        }
        Role::Vendor => {
            fill("ownerName", name);
            fill("email", Value::String(email.to_string()));
        }
        Role::Hotel => fill("name", name),
        Role::Admin => {}
    }
    fill("status", Value::String(Status::Active.to_string()));
    profile
}

fn validate_profile(role: Role, profile: &Fields) -> AccountResult<()> {
    match role {
        Role::User => validate_draft::<User>(profile)?,
        Role::Vendor => validate_draft::<Vendor>(profile)?,
        Role::Hotel => validate_draft::<Hotel>(profile)?,
        Role::Admin => return Err(invalid("admins have no profile")),
    }
    Ok(())
}

fn stamp_new(fields: &mut Fields) {
    fields.insert(CREATED_AT.into(), server_timestamp());
    fields.insert(UPDATED_AT.into(), server_timestamp());
}
