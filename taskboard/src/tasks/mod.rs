//! Task lists for a signed-in user.
//!
//! A [`Board`] keeps a local [`Mirror`] of the user's lists and tasks in
//! step with the store. Drag gestures go through the reorder engine
//! ([`reorder::plan`]) and the [`MutationDispatcher`], which patches the
//! mirror right away and commits the matching writes as one batch.

pub mod board;
pub mod dispatch;
pub mod mirror;
pub mod reorder;

pub use board::{Board, BoardSettings, DragOutcome};
pub use dispatch::MutationDispatcher;
pub use mirror::{Mirror, SyncState, dedup_by_id};
pub use reorder::{Container, DragEvent, Location, ReorderPlan, plan};

use taskboard_proto::ValidationError;
use taskboard_proto::list::ListId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during board operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    /// Input was rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The target list is not on the board.
    #[error("list not found: {0}")]
    UnknownList(ListId),
    /// The list's tasks have not been loaded yet.
    #[error("list {0} is still loading, please try again")]
    NotSynced(ListId),
    /// The store refused a write. Local state is left as it is.
    #[error("could not save changes, please try again")]
    CommitFailed(#[source] StoreError),
    /// A live query could not be opened.
    #[error("could not subscribe: {0}")]
    Subscribe(#[source] StoreError),
}
