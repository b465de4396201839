//! Write-behind preferences store.
//!
//! Typed key-value preferences served from an in-memory cache and persisted
//! to a table backend by a small pool of background workers.
//!
//! - Writes are staged with `put` and published atomically to the cache by
//!   `commit`; persistence happens afterwards, off the caller's thread
//! - Reads never touch the backend once the cache is loaded
//! - Values may be encrypted before they reach the backend
//!
//! # Example
//!
//! ```ignore
//! use prefstore::PrefsStore;
//! use prefstore::crypto::NonceMode;
//!
//! let prefs = PrefsStore::builder()
//!     .path("prefs.db")
//!     .encryption("my secret", NonceMode::Random)
//!     .build()?;
//!
//! prefs.load(false);
//! prefs.put("name", "Sami").put("age", 23).commit();
//! prefs.put_object("user", &user).commit();
//!
//! let age: i32 = prefs.get("age", 0);
//! let user: Option<User> = prefs.get_object("user");
//! ```

mod async_ops;
mod builder;
pub mod keys;
mod objects;
mod persist;
mod pool;
mod prefs;
mod value;


// Re-export the public API
pub use builder::PrefsStoreBuilder;
pub use keys::{KeyShape, list_key, object_key, shape_of};
pub use prefs::{LoadState, PrefsStore};
pub use value::{FromValue, Value, ValueKind};
