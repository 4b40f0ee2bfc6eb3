//! Orderline Core - Order Types
//!
//! Pure data structures with no behavior beyond derived arithmetic helpers.
//! All other crates depend on this. Validation lives in
//! `orderline-validation`, persistence and caching in `orderline-storage`.

pub mod entities;
pub mod error;

pub use entities::{Delivery, Item, Order, Payment};
pub use error::{
    ConfigError, DecodeError, OrderlineError, OrderlineResult, Section, SourceError, StorageError,
    StorageResult, ValidationError,
};

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Order identifier. Cache key and store primary key.
pub type OrderUid = String;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Minimum accepted length of an `order_uid`.
pub const ORDER_UID_MIN_LEN: usize = 5;

/// Maximum accepted length of an `order_uid`.
pub const ORDER_UID_MAX_LEN: usize = 100;

/// Oldest acceptable `date_created`, in years before now.
pub const MAX_ORDER_AGE_YEARS: u32 = 10;

/// Locales an order may carry.
pub const SUPPORTED_LOCALES: &[&str] = &["en", "ru", "fr", "de", "es"];

/// Lowest item status code considered valid.
pub const MIN_ITEM_STATUS: i32 = 100;
