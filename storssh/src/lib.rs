//! # Storssh
//!
//! Async polling core for storage arrays managed over SSH.
//!
//! Storssh keeps a bounded pool of authenticated sessions per array, runs
//! CLI commands through it with typed errors and retry, and turns the
//! vendor's text output into ordered records.
//!
//! ## Features
//!
//! - Bounded per-device session pools with fair waiting and eviction
//! - One-shot exec or persistent interactive shell execution
//! - Centralized error classification (credentials, host keys, timeouts)
//! - Generic key/value and table parsing shared by every vendor
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storssh::parser::{KeyValueSpec, RecordParser};
//! use storssh::{CommandExecutor, DeviceEndpoint, DeviceProfile, ExecOptions, SessionPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), storssh::Error> {
//!     let endpoint = DeviceEndpoint::builder("192.168.1.50")
//!         .username("monitor")
//!         .password("secret")
//!         .max_pool_size(2)
//!         .build()?;
//!
//!     let pool = SessionPool::ssh(endpoint);
//!     let executor = CommandExecutor::new(pool.clone(), DeviceProfile::default());
//!
//!     let response = executor
//!         .run("show enclosure-status", &ExecOptions::default())
//!         .await?;
//!     let status = RecordParser::new().get_attribute_map(&response.text);
//!     println!("{:?}", status.get("Enclosure Status"));
//!
//!     let disks = RecordParser::new().parse(&response.text, &KeyValueSpec::bracket().into());
//!     println!("{} records", disks.len());
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod executor;
pub mod parser;
pub mod pool;
pub mod profile;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use executor::{Command, CommandExecutor, ExecOptions, RawResponse};
pub use parser::{ParseSpec, Record, RecordParser};
pub use pool::{PoolStatus, PooledSession, SessionPool};
pub use profile::{DeviceProfile, StatusTable};
pub use transport::{AuthMethod, DeviceEndpoint, HostKeyVerification};
