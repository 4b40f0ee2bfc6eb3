//! Error types for Orderline operations

use std::fmt;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Order not found: {order_uid}")]
    NotFound { order_uid: String },

    #[error("Order already exists: {order_uid}")]
    Conflict { order_uid: String },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },
}

impl StorageError {
    /// Whether a retry (through transport redelivery) could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. } | StorageError::QueryFailed { .. })
    }
}

/// Validation phase that reported a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Header,
    Delivery,
    Payment,
    Items,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Header => "order",
            Section::Delivery => "delivery",
            Section::Payment => "payment",
            Section::Items => "items",
        };
        f.write_str(name)
    }
}

/// Semantic defects found in a decoded order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Order cannot be empty")]
    MissingOrder,

    #[error("{section} validation failed: {field} {reason}")]
    InvalidField {
        section: Section,
        field: &'static str,
        reason: String,
    },

    #[error("items validation failed: item {index}: {field} {reason}")]
    InvalidItem {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Name of the offending field, if the defect is field-level.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingOrder => None,
            ValidationError::InvalidField { field, .. } | ValidationError::InvalidItem { field, .. } => {
                Some(field)
            }
        }
    }

    /// Phase that produced the defect.
    pub fn section(&self) -> Option<Section> {
        match self {
            ValidationError::MissingOrder => None,
            ValidationError::InvalidField { section, .. } => Some(*section),
            ValidationError::InvalidItem { .. } => Some(Section::Items),
        }
    }
}

/// Payload could not be decoded into an order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed payload: {reason}")]
    Malformed { reason: String },
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Malformed {
            reason: e.to_string(),
        }
    }
}

/// Message transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The bounded wait elapsed without a message. Not a failure.
    #[error("Fetch timed out")]
    Timeout,

    #[error("Source closed")]
    Closed,

    #[error("Transport error: {reason}")]
    Transport { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Orderline errors.
#[derive(Debug, Clone, Error)]
pub enum OrderlineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Orderline operations.
pub type OrderlineResult<T> = Result<T, OrderlineError>;

/// Result type alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// TESTS
// =============================================================================
