//! Identity provider interface and a local, store-backed provider.
//!
//! The rest of the crate only cares whether a user is signed in and who it
//! is. [`IdentityProvider::watch`] hands out a receiver that changes whenever
//! that answer does.

use std::sync::Arc;

use taskboard_proto::document::{Fields, Snapshot, Value};
use taskboard_proto::path;
use taskboard_proto::user::{self, UserId};
use tokio::sync::watch;

use crate::store::{DocumentStore, Query, StoreError};

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authentication failures. Their messages are shown to the user as-is.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// The email address is malformed.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// The password is too short.
    #[error("password should be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    /// No password was given.
    #[error("missing password")]
    MissingPassword,
    /// An account already exists for the address.
    #[error("email already in use: {0}")]
    EmailInUse(String),
    /// No account exists for the address.
    #[error("no account found for {0}")]
    UserNotFound(String),
    /// The store behind the provider failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Source of the current user.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<UserId>;

    /// Receiver that observes every sign-in and sign-out.
    fn watch(&self) -> watch::Receiver<Option<UserId>>;

    /// Ends the current session. Does nothing when signed out.
    fn sign_out(&self);
}

/// Email accounts kept as profile records in the document store.
///
/// Each account is a `users/{uid}` record holding its email and signup time.
/// Passwords are length-checked but not stored or verified.
pub struct LocalIdentity<S> {
    store: Arc<S>,
    state: watch::Sender<Option<UserId>>,
}

impl<S: DocumentStore> LocalIdentity<S> {
    /// Creates a signed-out provider over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        let (state, _) = watch::channel(None);
        Self { store, state }
    }

    /// Registers a new account and signs it in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`], [`AuthError::WeakPassword`] or
    /// [`AuthError::EmailInUse`] before anything is written, and
    /// [`AuthError::Store`] if the profile cannot be created.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<UserId, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.lookup(&email).await?.is_some() {
            return Err(AuthError::EmailInUse(email));
        }

        let profile = Fields::from([
            (user::FIELD_EMAIL.to_string(), Value::from(email.as_str())),
            (user::FIELD_SIGNUP_TIME.to_string(), Value::ServerTimestamp),
        ]);
        let record = self.store.create_record(&path::users(), profile).await?;
        let uid = UserId::new(record.id());
        tracing::info!(user = %uid, "account created");
        self.set_user(Some(uid.clone()));
        Ok(uid)
    }

    /// Signs in an existing account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`], [`AuthError::MissingPassword`] or
    /// [`AuthError::UserNotFound`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserId, AuthError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        self.resume(&email).await
    }

    /// Restores a remembered session for `email` without a password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`] or [`AuthError::UserNotFound`].
    pub async fn resume(&self, email: &str) -> Result<UserId, AuthError> {
        let email = normalize_email(email)?;
        let uid = self
            .lookup(&email)
            .await?
            .ok_or(AuthError::UserNotFound(email))?;
        tracing::info!(user = %uid, "signed in");
        self.set_user(Some(uid.clone()));
        Ok(uid)
    }

    async fn lookup(&self, email: &str) -> Result<Option<UserId>, AuthError> {
        let profiles = self.profiles().await?;
        Ok(profiles
            .documents
            .iter()
            .find(|doc| {
                matches!(doc.fields.get(user::FIELD_EMAIL), Some(Value::String(e)) if e == email)
            })
            .map(|doc| UserId::new(doc.id())))
    }

    /// One-shot read of the profile collection.
    async fn profiles(&self) -> Result<Snapshot, AuthError> {
        let mut sub = self
            .store
            .subscribe(Query::ascending(path::users(), user::FIELD_SIGNUP_TIME))?;
        sub.next()
            .await
            .ok_or_else(|| StoreError::Unavailable("profile query closed".into()).into())
    }

    fn set_user(&self, uid: Option<UserId>) {
        self.state.send_if_modified(|current| {
            if *current == uid {
                false
            } else {
                *current = uid;
                true
            }
        });
    }
}

impl<S: DocumentStore> IdentityProvider for LocalIdentity<S> {
    fn current_user(&self) -> Option<UserId> {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.state.subscribe()
    }

    fn sign_out(&self) {
        if let Some(uid) = self.current_user() {
            tracing::info!(user = %uid, "signed out");
        }
        self.set_user(None);
    }
}

/// Trims and lowercases an address, rejecting anything without a local part
/// and a dotted domain.
fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
    });
    if valid && !email.contains(char::is_whitespace) {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}
