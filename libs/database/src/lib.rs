//! Database connectivity for the storefront services
//!
//! Wraps the MongoDB driver with environment-driven configuration, connection
//! retry with exponential backoff and a lightweight health probe.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB connector, config and health check
//! - `config` - `core_config::FromEnv` support for [`mongodb::MongoConfig`]
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{self, MongoConfig};
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "storefront");
//! let client = mongodb::connect_from_config_with_retry(&config, None).await?;
//! let db = client.database(config.database());
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::{DatabaseError, DatabaseResult};
