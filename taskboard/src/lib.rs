//! `Taskboard`: ordered task lists kept in sync with a document store.

pub mod auth;
pub mod config;
pub mod session;
pub mod shell;
pub mod store;
pub mod sync;
pub mod tasks;
