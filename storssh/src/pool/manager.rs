//! The per-device session pool.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::session::{Lease, PooledSession, Session, SessionId};
use crate::error::{Error, Result, TransportError};
use crate::transport::{DeviceEndpoint, SshTransport, Transport};

/// Point-in-time view of a pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Sessions that exist or are being opened.
    pub current_size: usize,
    pub idle: usize,
    pub in_use: usize,
    /// Callers blocked in `acquire`.
    pub waiters: usize,
    pub max_size: usize,
    pub closed: bool,
}

struct PoolState<C> {
    idle: VecDeque<Session<C>>,
    current_size: usize,
    max_size: usize,
    waiters: usize,
    closed: bool,
    next_id: u64,
}

pub(super) struct Shared<T: Transport> {
    transport: T,
    endpoint: DeviceEndpoint,
    state: Mutex<PoolState<T::Connection>>,
    available: Notify,
}

impl<T: Transport> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, PoolState<T::Connection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return one slot to the pool and wake the next waiter.
    pub(super) fn free_slot(&self) {
        {
            let mut state = self.lock();
            state.current_size = state.current_size.saturating_sub(1);
        }
        self.available.notify_one();
    }
}

/// Counts one blocked `acquire`; uncounted on wake, timeout or cancellation.
struct Waiting<'a, T: Transport>(&'a Shared<T>);

impl<T: Transport> Drop for Waiting<'_, T> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.waiters = state.waiters.saturating_sub(1);
    }
}

enum Checkout<C> {
    Idle(Session<C>),
    Open(SessionId),
    Wait,
}

/// Bounded set of authenticated sessions to one device.
///
/// Cloning is cheap; all clones share the same sessions.
pub struct SessionPool<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for SessionPool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl SessionPool<SshTransport> {
    /// Pool of SSH sessions.
    pub fn ssh(endpoint: DeviceEndpoint) -> Self {
        Self::new(SshTransport, endpoint)
    }
}

impl<T: Transport> SessionPool<T> {
    /// Create an empty pool. Sessions are opened lazily by `acquire`.
    pub fn new(transport: T, endpoint: DeviceEndpoint) -> Self {
        let max_size = endpoint.max_pool_size();
        Self {
            shared: Arc::new(Shared {
                transport,
                endpoint,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    current_size: 0,
                    max_size,
                    waiters: 0,
                    closed: false,
                    next_id: 0,
                }),
                available: Notify::new(),
            }),
        }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.shared.endpoint
    }

    /// Check out a session, opening one if the pool has room.
    ///
    /// An idle session is probed first and replaced when dead. When the pool
    /// is full the caller waits, in arrival order, until a session is
    /// released or evicted. Fails with [`Error::PoolExhausted`] once
    /// `timeout` elapses and with [`Error::PoolClosed`] after shutdown.
    pub async fn acquire(&self, timeout: Duration) -> Result<PooledSession<T>> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.shared.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let checkout = {
                let mut state = self.shared.lock();
                if state.closed {
                    return Err(Error::PoolClosed);
                }
                if let Some(session) = state.idle.pop_front() {
                    Checkout::Idle(session)
                } else if state.current_size < state.max_size {
                    state.current_size += 1;
                    state.next_id += 1;
                    Checkout::Open(SessionId::new(state.next_id))
                } else {
                    state.waiters += 1;
                    Checkout::Wait
                }
            };

            match checkout {
                Checkout::Idle(session) => {
                    let lease = Lease::new(Arc::clone(&self.shared));
                    if session.is_alive() {
                        debug!(
                            "pool: reusing {} for {}",
                            session.id(),
                            self.shared.endpoint.host()
                        );
                        return Ok(PooledSession { session, lease });
                    }
                    debug!("pool: {} failed liveness probe, replacing", session.id());
                    lease.free();
                    session.close().await;
                }
                Checkout::Open(id) => return self.open(id, deadline).await,
                Checkout::Wait => {
                    let _waiting = Waiting(&self.shared);
                    debug!(
                        "pool: {} at capacity, waiting for a session",
                        self.shared.endpoint.host()
                    );
                    let woken = tokio::time::timeout_at(deadline, notified).await.is_ok();
                    if !woken {
                        return Err(Error::PoolExhausted(timeout));
                    }
                }
            }
        }
    }

    /// Connect a new session, bounded by the connect timeout and by the
    /// caller's acquire deadline, whichever comes first.
    async fn open(&self, id: SessionId, deadline: Instant) -> Result<PooledSession<T>> {
        let lease = Lease::new(Arc::clone(&self.shared));
        let endpoint = &self.shared.endpoint;
        let start = Instant::now();
        let limit = deadline.min(start + endpoint.connect_timeout());

        debug!("pool: opening {} to {}", id, endpoint.socket_addr());
        let connected = tokio::time::timeout_at(limit, self.shared.transport.connect(endpoint))
            .await
            .unwrap_or_else(|_| Err(TransportError::Timeout(limit - start)));

        let conn = match connected {
            Ok(conn) => conn,
            Err(err) => {
                let err = Error::classify(err, endpoint);
                debug!("pool: failed to open {}: {}", id, err);
                return Err(err);
            }
        };

        let session = Session::new(id, conn);
        if self.shared.lock().closed {
            lease.free();
            session.close().await;
            return Err(Error::PoolClosed);
        }

        info!("pool: opened {} to {}", id, endpoint.socket_addr());
        Ok(PooledSession { session, lease })
    }

    /// Return a healthy session for reuse.
    ///
    /// The session is closed instead when it is no longer alive, the pool
    /// has shut down, or the pool shrank below its current size.
    pub async fn release(&self, pooled: PooledSession<T>) {
        let PooledSession { session, lease } = pooled;

        let reason = {
            let mut state = self.shared.lock();
            let reason = if state.closed {
                Some("pool closed")
            } else if state.current_size > state.max_size {
                Some("pool shrunk")
            } else if !session.is_alive() {
                Some("session not alive")
            } else {
                None
            };
            match reason {
                Some(reason) => Some((reason, session)),
                None => {
                    state.idle.push_back(session);
                    None
                }
            }
        };

        match reason {
            None => {
                lease.disarm();
                self.shared.available.notify_one();
            }
            Some((reason, session)) => {
                debug!("pool: closing {} on release ({})", session.id(), reason);
                lease.free();
                session.close().await;
            }
        }
    }

    /// Close a session whose state is suspect and free its slot.
    pub async fn evict(&self, pooled: PooledSession<T>) {
        let PooledSession { session, lease } = pooled;
        debug!("pool: evicting {}", session.id());
        lease.free();
        session.close().await;
    }

    /// Change the maximum size.
    ///
    /// Growing wakes waiters. Shrinking closes surplus idle sessions now;
    /// surplus sessions in use are closed when released.
    pub async fn resize(&self, max_size: usize) -> Result<()> {
        if max_size == 0 {
            return Err(Error::InvalidConfig {
                message: "pool size must be at least 1".to_string(),
            });
        }

        let (grew, surplus) = {
            let mut state = self.shared.lock();
            let grew = max_size > state.max_size;
            state.max_size = max_size;
            let mut surplus = Vec::new();
            while state.current_size > state.max_size {
                let Some(session) = state.idle.pop_back() else {
                    break;
                };
                state.current_size -= 1;
                surplus.push(session);
            }
            (grew, surplus)
        };

        info!(
            "pool: {} resized to {}",
            self.shared.endpoint.host(),
            max_size
        );
        if grew {
            self.shared.available.notify_waiters();
        }
        for session in surplus {
            session.close().await;
        }
        Ok(())
    }

    /// Close every idle session and fail all current and future acquires.
    ///
    /// Sessions in use are closed when released or evicted.
    pub async fn shutdown(&self) {
        let idle: Vec<_> = {
            let mut state = self.shared.lock();
            state.closed = true;
            let idle: Vec<_> = state.idle.drain(..).collect();
            state.current_size -= idle.len();
            idle
        };

        info!(
            "pool: shutting down {} ({} idle sessions)",
            self.shared.endpoint.host(),
            idle.len()
        );
        self.shared.available.notify_waiters();
        for session in idle {
            session.close().await;
        }
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.shared.lock();
        PoolStatus {
            current_size: state.current_size,
            idle: state.idle.len(),
            in_use: state.current_size - state.idle.len(),
            waiters: state.waiters,
            max_size: state.max_size,
            closed: state.closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}
