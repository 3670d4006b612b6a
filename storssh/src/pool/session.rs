//! Sessions and checked-out session handles.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::manager::Shared;
use crate::transport::{Connection, Transport};

/// Identity of one session within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(super) fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One authenticated connection plus bookkeeping.
pub struct Session<C> {
    id: SessionId,
    conn: C,
    created_at: Instant,
    last_used: Instant,
    uses: u64,
    /// Cleared when the session's protocol state can no longer be trusted.
    healthy: bool,
}

impl<C: Connection> Session<C> {
    pub(super) fn new(id: SessionId, conn: C) -> Self {
        let now = Instant::now();
        Self {
            id,
            conn,
            created_at: now,
            last_used: now,
            uses: 0,
            healthy: true,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Mutable access to the connection; counts as one use.
    pub fn connection_mut(&mut self) -> &mut C {
        self.uses += 1;
        self.last_used = Instant::now();
        &mut self.conn
    }

    /// Liveness flag combined with the connection's own probe.
    pub fn is_alive(&self) -> bool {
        self.healthy && self.conn.is_alive()
    }

    /// Flag the session so the pool closes it instead of reusing it.
    pub fn mark_broken(&mut self) {
        self.healthy = false;
    }

    pub fn uses(&self) -> u64 {
        self.uses
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub(super) async fn close(mut self) {
        if let Err(e) = self.conn.close().await {
            warn!("pool: error closing {}: {}", self.id, e);
        }
    }
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("uses", &self.uses)
            .field("healthy", &self.healthy)
            .finish()
    }
}

/// A claim on one of the pool's `max_size` slots.
///
/// Dropping an armed lease gives the slot back, so a cancelled acquire or a
/// session dropped without `release`/`evict` never leaks capacity.
pub(super) struct Lease<T: Transport> {
    shared: Arc<Shared<T>>,
    armed: bool,
}

impl<T: Transport> Lease<T> {
    pub(super) fn new(shared: Arc<Shared<T>>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    /// The slot now belongs to a session sitting in the idle set.
    pub(super) fn disarm(mut self) {
        self.armed = false;
    }

    /// Give the slot back.
    pub(super) fn free(mut self) {
        self.armed = false;
        self.shared.free_slot();
    }
}

impl<T: Transport> Drop for Lease<T> {
    fn drop(&mut self) {
        if self.armed {
            debug!("pool: lease dropped without release, freeing slot");
            self.shared.free_slot();
        }
    }
}

/// A session checked out of a [`SessionPool`](super::SessionPool).
///
/// Owned by exactly one caller until handed back with `release` or `evict`.
/// Dropping it counts as an eviction.
pub struct PooledSession<T: Transport> {
    pub(super) session: Session<T::Connection>,
    pub(super) lease: Lease<T>,
}

impl<T: Transport> Deref for PooledSession<T> {
    type Target = Session<T::Connection>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<T: Transport> DerefMut for PooledSession<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl<T: Transport> fmt::Debug for PooledSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledSession").field(&self.session).finish()
    }
}
