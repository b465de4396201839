//! Shared defaults for the store, its backends and the CLI.

/// Default number of background persistence workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on background persistence workers.
pub const MAX_WORKERS: usize = 64;

/// How long dropping a store waits for in-flight writes (milliseconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Default database file name.
pub const DEFAULT_DB_FILE: &str = "sql_preferences.db";

/// Default table name.
pub const DEFAULT_TABLE: &str = "table_preferences";

/// Column holding the entry key.
pub const COLUMN_KEY: &str = "data_key";

/// Column holding the persisted type tag.
pub const COLUMN_TYPE: &str = "data_type";

/// Column holding the (possibly encrypted) value text.
pub const COLUMN_VALUE: &str = "data_value";

/// Key prefix for single serialized objects.
pub const PREFIX_OBJECT: &str = "pref_obj_";

/// Key prefix for serialized lists of objects.
pub const PREFIX_LIST: &str = "pref_list_obj_";

/// AES key size in bytes. Secrets are truncated or zero-padded to this.
pub const CIPHER_KEY_LEN: usize = 16;

/// AES-GCM nonce size in bytes.
pub const NONCE_LEN: usize = 12;

/// Thread name for background persistence workers.
pub const WORKER_THREAD_NAME: &str = "prefstore-io";
