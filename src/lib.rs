//! Hour tracking core: a per-user month summary cache, day loader, hour
//! editor and calendar presenter over an `EntryStore`, plus the axum shell
//! that serves them.

pub mod api;
pub mod calendar;
pub mod config;
pub mod day_loader;
pub mod editor;
pub mod error;
pub mod generation;
pub mod models;
pub mod month_cache;
pub mod session;
pub mod sqlite;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, SessionError, StoreError};
pub use session::Session;
pub use store::{EntryStore, Identity, UserId};
