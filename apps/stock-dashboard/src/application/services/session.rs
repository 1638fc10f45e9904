//! Session Service
//!
//! Login stores the bearer token locally and installs it on the client;
//! logout removes both. A stored token is reinstalled by [`SessionService::restore`].

use std::sync::Arc;

use thiserror::Error;

use super::preferences::AUTH_TOKEN_KEY;
use crate::application::ports::{ApiError, AuthPort, KeyValueStore, NewUser, StorageError, UserProfile};

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Backend rejected or failed the request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Token could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Authentication state backed by local storage.
#[derive(Clone)]
pub struct SessionService {
    auth: Arc<dyn AuthPort>,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish_non_exhaustive()
    }
}

impl SessionService {
    /// Create a session over `auth` and `store`.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthPort>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { auth, store }
    }

    /// Install a previously stored token. Returns whether one was found.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    pub fn restore(&self) -> Result<bool, SessionError> {
        let token = self.store.get(AUTH_TOKEN_KEY)?.filter(|t| !t.is_empty());
        let found = token.is_some();
        self.auth.set_bearer_token(token);
        Ok(found)
    }

    /// Log in and persist the token.
    ///
    /// # Errors
    ///
    /// Fails when the backend rejects the credentials or the token cannot be stored.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        let token = self.auth.login(username, password).await?;
        self.store.set(AUTH_TOKEN_KEY, &token.access_token)?;
        self.auth.set_bearer_token(Some(token.access_token));
        tracing::info!(username, "Logged in");
        Ok(())
    }

    /// Forget the token.
    ///
    /// # Errors
    ///
    /// Fails when the stored token cannot be removed.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.store.remove(AUTH_TOKEN_KEY)?;
        self.auth.set_bearer_token(None);
        tracing::info!("Logged out");
        Ok(())
    }

    /// Whether a token is stored.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    pub fn is_authenticated(&self) -> Result<bool, SessionError> {
        Ok(self
            .store
            .get(AUTH_TOKEN_KEY)?
            .is_some_and(|t| !t.is_empty()))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Fails when the backend rejects the registration.
    pub async fn register(&self, user: &NewUser) -> Result<UserProfile, SessionError> {
        Ok(self.auth.register(user).await?)
    }

    /// The logged-in user, or `None` when the token is missing or rejected.
    ///
    /// # Errors
    ///
    /// Fails on backend errors other than an authentication failure.
    pub async fn current_user(&self) -> Result<Option<UserProfile>, SessionError> {
        match self.auth.current_user().await {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::Unauthorized) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
