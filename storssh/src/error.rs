//! Error types for storssh.
//!
//! [`Error`] is the typed taxonomy callers match on. [`TransportError`] is the
//! raw layer produced by [`Connection`](crate::transport::Connection)
//! implementations; it is turned into an [`Error`] exactly once, by
//! [`Error::classify`].

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::transport::DeviceEndpoint;

/// Main error type for storssh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The device rejected the supplied credentials.
    #[error("Authentication failed for user '{user}' on {host}")]
    Credential { host: String, user: String },

    /// The server's host key was unknown or did not match.
    #[error("Host key verification failed for {host}:{port}: {reason}")]
    HostKey {
        host: String,
        port: u16,
        reason: String,
    },

    /// Key material (private key or host-key pin) could not be used.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// A connect or read deadline was exceeded.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Connection reset, broken pipe, name resolution failure and the like.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No session became available within the wait deadline.
    #[error("No session available within {0:?}")]
    PoolExhausted(Duration),

    /// The pool has been shut down.
    #[error("Session pool is closed")]
    PoolClosed,

    /// The device answered with text flagged as a hard failure.
    #[error("Unexpected response to '{command}': matched '{marker}'")]
    UnexpectedResponse { command: String, marker: String },

    /// Invalid configuration supplied by the caller.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Parse specification errors.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl Error {
    /// Map a raw transport failure onto the typed taxonomy.
    ///
    /// Structured variants map directly. Errors that only carry text
    /// (russh, I/O, `Other`) are classified by their message.
    pub fn classify(err: TransportError, endpoint: &DeviceEndpoint) -> Self {
        match err {
            TransportError::AuthenticationFailed { user } => Error::Credential {
                host: endpoint.host().to_string(),
                user,
            },
            TransportError::HostKeyChanged { host, port, line } => Error::HostKey {
                host,
                port,
                reason: format!("key changed (known_hosts line {line})"),
            },
            TransportError::HostKeyUnknown { host, port } => Error::HostKey {
                host,
                port,
                reason: "host not present in known_hosts".to_string(),
            },
            TransportError::HostKeyMismatch {
                host,
                port,
                expected,
                actual,
            } => Error::HostKey {
                host,
                port,
                reason: format!("expected {expected}, got {actual}"),
            },
            TransportError::KnownHosts(reason) => Error::HostKey {
                host: endpoint.host().to_string(),
                port: endpoint.port(),
                reason,
            },
            TransportError::Key(message) => Error::InvalidKey(message),
            TransportError::Timeout(after) => Error::Timeout(after),
            TransportError::ConnectionFailed { host, port, source } => {
                Error::Transport(format!("connection to {host}:{port} failed: {source}"))
            }
            TransportError::Disconnected => Error::Transport("connection disconnected".into()),
            other => Self::classify_message(&other.to_string(), endpoint),
        }
    }

    fn classify_message(message: &str, endpoint: &DeviceEndpoint) -> Self {
        let lower = message.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["authentication failed", "permission denied", "not authenticated"]) {
            Error::Credential {
                host: endpoint.host().to_string(),
                user: endpoint.username().to_string(),
            }
        } else if has(&["host key", "known_hosts", "server key"]) {
            Error::HostKey {
                host: endpoint.host().to_string(),
                port: endpoint.port(),
                reason: message.to_string(),
            }
        } else if has(&["private key", "invalid key", "not a valid"]) {
            Error::InvalidKey(message.to_string())
        } else if has(&["timed out", "timeout"]) {
            Error::Timeout(endpoint.connect_timeout())
        } else {
            Error::Transport(message.to_string())
        }
    }

    /// Whether the executor may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Transport(_) | Error::PoolExhausted(_)
        )
    }

    /// Whether this error must never be retried (bad credentials or keys).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Credential { .. } | Error::HostKey { .. } | Error::InvalidKey(_)
        )
    }

    /// Whether the session that produced this error must be discarded.
    pub fn evicts_session(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Transport(_))
    }
}

/// Raw transport layer errors, as produced by a connection implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host not present in known_hosts under strict checking
    #[error("Host {host}:{port} not found in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match the pinned fingerprint
    #[error("Host key for {host}:{port} does not match pin: expected {expected}, got {actual}")]
    HostKeyMismatch {
        host: String,
        port: u16,
        expected: String,
        actual: String,
    },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Anything else a transport reports only as text.
    #[error("{0}")]
    Other(String),
}

/// Errors in a parse specification. Malformed input text is never an error.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Layout name not recognised
    #[error("Unknown parse layout '{0}'")]
    UnknownLayout(String),

    /// Key/value or column delimiter is empty
    #[error("Delimiter must not be empty")]
    EmptyDelimiter,

    /// Header or boundary regex failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Result type alias using storssh's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> DeviceEndpoint {
        DeviceEndpoint::builder("array1")
            .username("admin")
            .password("secret")
            .build()
            .unwrap()
    }

    #[test]
    fn test_structured_variants_map_directly() {
        let ep = endpoint();
        let err = Error::classify(
            TransportError::AuthenticationFailed {
                user: "admin".into(),
            },
            &ep,
        );
        assert!(matches!(err, Error::Credential { .. }));
        assert!(err.is_fatal());
        assert!(!err.is_retryable());

        let err = Error::classify(TransportError::Timeout(Duration::from_secs(3)), &ep);
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(3)));
        assert!(err.is_retryable());
        assert!(err.evicts_session());

        let err = Error::classify(TransportError::Disconnected, &ep);
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_message_classification() {
        let ep = endpoint();
        let cases = [
            ("Authentication failed.", "credential"),
            ("Unknown server key", "hostkey"),
            ("not a valid RSA private key file", "key"),
            ("Unable to connect: timed out", "timeout"),
            ("Connection reset by peer", "transport"),
        ];
        for (message, expected) in cases {
            let err = Error::classify(TransportError::Other(message.into()), &ep);
            let kind = match err {
                Error::Credential { .. } => "credential",
                Error::HostKey { .. } => "hostkey",
                Error::InvalidKey(_) => "key",
                Error::Timeout(_) => "timeout",
                Error::Transport(_) => "transport",
                _ => "other",
            };
            assert_eq!(kind, expected, "message: {message}");
        }
    }

    #[test]
    fn test_pool_errors_are_not_fatal() {
        assert!(Error::PoolExhausted(Duration::from_secs(1)).is_retryable());
        assert!(!Error::PoolExhausted(Duration::from_secs(1)).evicts_session());
        assert!(!Error::PoolClosed.is_retryable());
        assert!(!Error::PoolClosed.is_fatal());
    }
}
