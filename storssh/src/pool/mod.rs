//! Bounded pool of authenticated sessions for one device.
//!
//! A [`SessionPool`] never holds more than `max_size` connections to its
//! device. Callers check a session out with [`SessionPool::acquire`], own it
//! exclusively while running commands, and hand it back with
//! [`SessionPool::release`] (healthy) or [`SessionPool::evict`] (suspect).
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use storssh::pool::SessionPool;
//! use storssh::transport::{Connection, DeviceEndpoint};
//!
//! # async fn example() -> Result<(), storssh::Error> {
//! let endpoint = DeviceEndpoint::builder("10.0.0.5")
//!     .username("monitor")
//!     .password("secret")
//!     .max_pool_size(2)
//!     .build()?;
//! let pool = SessionPool::ssh(endpoint);
//!
//! let mut session = pool.acquire(Duration::from_secs(10)).await?;
//! let output = session
//!     .connection_mut()
//!     .exec("show disks", Duration::from_secs(30))
//!     .await;
//! match output {
//!     Ok(_) => pool.release(session).await,
//!     Err(_) => pool.evict(session).await,
//! }
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod manager;
mod session;

pub use manager::{PoolStatus, SessionPool};
pub use session::{PooledSession, Session, SessionId};
