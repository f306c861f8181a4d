//! Ties the board's lifetime to the signed-in user.
//!
//! A board is opened when a user signs in and closed, with all of its
//! subscriptions, when they sign out or another user takes over.

use std::sync::Arc;

use taskboard_proto::user::UserId;
use tokio::sync::watch;

use crate::store::DocumentStore;
use crate::tasks::{Board, BoardError, BoardSettings};

/// Follows an identity provider and keeps a matching [`Board`].
pub struct Session<S> {
    store: Arc<S>,
    settings: BoardSettings,
    auth: watch::Receiver<Option<UserId>>,
    board: Option<Board<S>>,
}

impl<S: DocumentStore> Session<S> {
    /// Starts following `auth`, opening a board right away if a user is
    /// already signed in.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Subscribe`] if the initial board cannot open.
    pub fn new(
        store: Arc<S>,
        mut auth: watch::Receiver<Option<UserId>>,
        settings: BoardSettings,
    ) -> Result<Self, BoardError> {
        let current = auth.borrow_and_update().clone();
        let mut session = Self {
            store,
            settings,
            auth,
            board: None,
        };
        session.switch_to(current)?;
        Ok(session)
    }

    /// Picks up an auth change that already happened, if any.
    ///
    /// Returns whether the board was replaced or closed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Subscribe`] if the new board cannot open.
    pub fn refresh(&mut self) -> Result<bool, BoardError> {
        if !self.auth.has_changed().unwrap_or(false) {
            return Ok(false);
        }
        let current = self.auth.borrow_and_update().clone();
        self.switch_to(current)
    }

    /// Waits for the next auth change and applies it.
    ///
    /// Returns `false` if the provider has gone away.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Subscribe`] if the new board cannot open.
    pub async fn next_change(&mut self) -> Result<bool, BoardError> {
        if self.auth.changed().await.is_err() {
            return Ok(false);
        }
        let current = self.auth.borrow_and_update().clone();
        self.switch_to(current)?;
        Ok(true)
    }

    /// The signed-in user's board.
    #[must_use]
    pub const fn board(&self) -> Option<&Board<S>> {
        self.board.as_ref()
    }

    /// Mutable access to the signed-in user's board.
    pub const fn board_mut(&mut self) -> Option<&mut Board<S>> {
        self.board.as_mut()
    }

    /// User the current board belongs to.
    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        self.board.as_ref().map(Board::user)
    }

    fn switch_to(&mut self, user: Option<UserId>) -> Result<bool, BoardError> {
        if self.user() == user.as_ref() {
            return Ok(false);
        }
        if let Some(board) = self.board.take() {
            board.close();
        }
        if let Some(user) = user {
            self.board = Some(Board::open(Arc::clone(&self.store), user, self.settings)?);
        } else {
            tracing::info!("no user signed in");
        }
        Ok(true)
    }
}
