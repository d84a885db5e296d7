//! Client-side logic for managing feature flags on a remote flag service.
//!
//! ```no_run
//! use flagops_lib::{ops, resolve, ConfigStore, ConnectionArgs, HttpFlagClient};
//!
//! # fn main() -> Result<(), flagops_lib::Error> {
//! let store = ConfigStore::default_location()?;
//! let conn = resolve::resolve(&ConnectionArgs::default(), &store)?;
//! let client = HttpFlagClient::new(&conn)?;
//! ops::set_enabled(&client, "new-checkout", &conn.environment, false)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod merge;
pub mod ops;
pub mod record;
pub mod resolve;

pub use client::{FlagApi, HttpFlagClient};
pub use config::{ConfigStore, EnvConfig, PersistedConfig};
pub use error::{ClientError, ConfigError, Error, ResolveError, ValidationError};
pub use merge::{build_replacement, Override, RawOverrides, UpdateOverrides};
pub use record::{FlagRecord, Variant};
pub use resolve::{ConnectionArgs, ResolvedConnection};
