//! Write-behind cached key-value preferences store.
//!
//! `prefstore` keeps typed preferences (strings, booleans, integers, floats
//! and serde-serializable objects) in an in-memory cache and persists them
//! to an embedded table in the background.
//!
//! - [`store`] - the cached store, its builder and value types
//! - [`backend`] - durable table backends (SQLite, redb, memory)
//! - [`crypto`] - optional value encryption
//! - [`config`] - TOML configuration
//!
//! # Example
//!
//! ```ignore
//! use prefstore::PrefsStore;
//!
//! let prefs = PrefsStore::open("prefs.db")?;
//! prefs.put("name", "Sami").put("age", 23).commit();
//! assert_eq!(prefs.get("age", 0), 23);
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod store;
pub mod utils;

pub use error::{Error, Result};
pub use store::{FromValue, LoadState, PrefsStore, PrefsStoreBuilder, Value, ValueKind};
