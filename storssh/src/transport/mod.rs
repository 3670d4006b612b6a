//! Transport layer: how a session talks to a device.
//!
//! The pool and executor are transport-agnostic; they only see the
//! [`Transport`] and [`Connection`] traits. [`SshTransport`] is the
//! russh-backed implementation.

mod builder;
pub mod config;
mod ssh;

pub use builder::EndpointBuilder;
pub use config::{AuthMethod, DeviceEndpoint, HostKeyVerification};
pub use ssh::{SshConnection, SshTransport};

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Factory for authenticated connections to a device.
pub trait Transport: Send + Sync + 'static {
    /// The connection handle this transport produces.
    type Connection: Connection;

    /// Perform the full handshake and authentication.
    ///
    /// Implementations honour [`DeviceEndpoint::connect_timeout`].
    fn connect(
        &self,
        endpoint: &DeviceEndpoint,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// One authenticated connection to a device.
///
/// A connection supports one-shot execution ([`exec`](Self::exec)) and a
/// single persistent interactive shell ([`open_shell`](Self::open_shell),
/// [`send`](Self::send), [`receive`](Self::receive)).
pub trait Connection: Send + 'static {
    /// Run one command on a fresh channel and collect its output until the
    /// channel closes.
    fn exec(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Open the interactive shell. Opening an already open shell is a no-op.
    fn open_shell(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Write one line of input to the shell.
    fn send(&mut self, input: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read the next chunk of shell output.
    ///
    /// Returns `Ok(None)` at end-of-stream and `Err(TransportError::Timeout)`
    /// when nothing arrived within `timeout`.
    fn receive(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Check if the underlying connection is still usable.
    fn is_alive(&self) -> bool;
}
