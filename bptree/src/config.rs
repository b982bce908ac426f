//! Index configuration.
//!
//! Configuration is loaded from environment variables, each falling back
//! to a default when unset.
//!
//! # Environment Variables
//!
//! - `BPTREE_ORDER`: maximum entries per node (default: `4`, minimum `3`)
//! - `BPTREE_METADATA_SIZE`: bytes reserved at the start of a store file
//!   for the allocation table and relation tree (default: `65536`)
//! - `BPTREE_CACHE_CAPACITY`: objects kept in a store's cache
//!   (default: `1024`)

use crate::store::metadata::HEADER_SIZE;
use crate::tree::MIN_ORDER;

/// Configuration for a tree and its backing store.
///
/// # Post-conditions
///
/// When constructed via `from_env()`:
/// - `order >= MIN_ORDER`
/// - `metadata_size` is larger than the fixed metadata header
/// - `cache_capacity >= 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum entries per node.
    pub order: usize,
    /// Bytes reserved for the metadata region of a new store file.
    pub metadata_size: u64,
    /// Number of objects a store keeps cached.
    pub cache_capacity: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order: Self::DEFAULT_ORDER,
            metadata_size: Self::DEFAULT_METADATA_SIZE,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl IndexConfig {
    /// Default node order.
    pub const DEFAULT_ORDER: usize = 4;
    /// Default metadata region size.
    pub const DEFAULT_METADATA_SIZE: u64 = 64 * 1024;
    /// Default object cache capacity.
    pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse, or is
    /// outside its valid range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let order = parse_var(&lookup, "BPTREE_ORDER", Self::DEFAULT_ORDER)?;
        if order < MIN_ORDER {
            return Err(ConfigError::InvalidValue {
                name: "BPTREE_ORDER".to_string(),
                message: format!("{order} is below the minimum order {MIN_ORDER}"),
            });
        }

        let metadata_size = parse_var(
            &lookup,
            "BPTREE_METADATA_SIZE",
            Self::DEFAULT_METADATA_SIZE,
        )?;
        if metadata_size <= HEADER_SIZE as u64 {
            return Err(ConfigError::InvalidValue {
                name: "BPTREE_METADATA_SIZE".to_string(),
                message: format!("{metadata_size} leaves no room after the {HEADER_SIZE}-byte header"),
            });
        }

        let cache_capacity = parse_var(
            &lookup,
            "BPTREE_CACHE_CAPACITY",
            Self::DEFAULT_CACHE_CAPACITY,
        )?;
        if cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "BPTREE_CACHE_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            order,
            metadata_size,
            cache_capacity,
        })
    }

    /// Set the node order.
    #[must_use]
    pub const fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Set the metadata region size.
    #[must_use]
    pub const fn with_metadata_size(mut self, metadata_size: u64) -> Self {
        self.metadata_size = metadata_size;
        self
    }

    /// Set the cache capacity.
    #[must_use]
    pub const fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }
}

/// Parse one variable, returning `default` when it is unset.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a valid number"),
        }),
        None => Ok(default),
    }
}
