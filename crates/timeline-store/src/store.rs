//! Connection ownership and the single-writer transaction discipline.
//!
//! One `Mutex<Connection>` serializes every operation, reads included. A
//! transaction keeps the guard until it is committed or rolled back, so no
//! other caller can observe a half-written batch.

use crate::error::Result;
use crate::schema;
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::UtcOffset;
use timeline_core::EventId;
use tracing::{error, warn};

/// Sent to subscribers after a transaction committed with `notify = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreNotice {
    EventsAdded(Vec<EventId>),
    Reinitialized,
}

/// The timeline event store.
pub struct EventStore {
    conn: Mutex<Connection>,
    listeners: Mutex<Vec<Sender<StoreNotice>>>,
    display_offset: AtomicI32,
}

impl EventStore {
    /// Open or create the database at `db_path` and bring its schema up to date.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Like [`EventStore::open`], but logs the failure and returns `None`.
    /// Callers treat `None` as "timeline unavailable".
    pub fn connect(db_path: &Path) -> Option<Self> {
        match Self::open(db_path) {
            Ok(store) => Some(store),
            Err(e) => {
                error!(path = %db_path.display(), error = %e, "error creating database connection");
                None
            }
        }
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::configure(&conn)?;
        schema::ensure_schema(&conn);
        Ok(Self {
            conn: Mutex::new(conn),
            listeners: Mutex::new(Vec::new()),
            display_offset: AtomicI32::new(0),
        })
    }

    /// Acquire the store lock. A panic in another holder does not leave the
    /// connection in a state we cannot use, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the lock. On failure log `what` and return `fallback`.
    pub(crate) fn with_conn<T>(
        &self,
        what: &str,
        fallback: T,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> T {
        let conn = self.lock();
        match f(&conn) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "{what}");
                fallback
            }
        }
    }

    /// Start a transaction. Blocks until every other caller has released the
    /// store, and holds it until commit or rollback.
    ///
    /// Calling other `EventStore` methods from the same thread while the
    /// transaction is open deadlocks; do all transactional work through the
    /// returned handle.
    pub fn begin_transaction(&self) -> EventTransaction<'_> {
        let guard = self.lock();
        let began = match guard.execute_batch("BEGIN") {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to begin transaction; statements will autocommit");
                false
            }
        };
        EventTransaction {
            store: self,
            guard: Some(guard),
            began,
            inserted: Vec::new(),
        }
    }

    /// Drop and recreate every table, e.g. before a full rebuild from the case.
    pub fn reinitialize(&self) {
        {
            let conn = self.lock();
            schema::drop_all(&conn);
            schema::ensure_schema(&conn);
        }
        self.notify(StoreNotice::Reinitialized);
    }

    /// Receive a [`StoreNotice`] for every notifying commit and reinitialization.
    pub fn subscribe(&self) -> Receiver<StoreNotice> {
        let (tx, rx) = mpsc::channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn notify(&self, notice: StoreNotice) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    /// Offset used to truncate timestamps into display buckets.
    pub fn display_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.display_offset.load(Ordering::Relaxed))
            .unwrap_or(UtcOffset::UTC)
    }

    pub fn set_display_offset(&self, offset: UtcOffset) {
        self.display_offset
            .store(offset.whole_seconds(), Ordering::Relaxed);
    }
}

/// An open write transaction. Holds the store lock until closed.
///
/// Closing twice through [`EventTransaction::commit`] is a programming error
/// and panics. Dropping an open transaction rolls it back.
///
/// If `BEGIN` failed the handle still serializes writers, but each statement
/// commits on its own: commit and rollback then issue no SQL, and a rollback
/// cannot undo what was already written.
pub struct EventTransaction<'a> {
    store: &'a EventStore,
    guard: Option<MutexGuard<'a, Connection>>,
    began: bool,
    inserted: Vec<EventId>,
}

impl<'a> EventTransaction<'a> {
    pub fn is_closed(&self) -> bool {
        self.guard.is_none()
    }

    /// The connection, for statements that belong to this transaction.
    ///
    /// # Panics
    /// If the transaction is already closed.
    pub(crate) fn conn(&self) -> &Connection {
        match self.guard.as_deref() {
            Some(conn) => conn,
            None => panic!("can't update database with closed transaction"),
        }
    }

    pub(crate) fn record_inserted(&mut self, id: EventId) {
        self.inserted.push(id);
    }

    /// Commit and release the store. A failed commit is rolled back.
    ///
    /// # Panics
    /// If the transaction is already closed.
    pub fn commit(&mut self, notify: bool) {
        let Some(guard) = self.guard.take() else {
            panic!("can't close already closed transaction");
        };
        let committed = if !self.began {
            warn!("closing a transaction that never began; nothing to commit");
            true
        } else {
            match guard.execute_batch("COMMIT") {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "error committing events.db");
                    if let Err(e) = guard.execute_batch("ROLLBACK") {
                        error!(error = %e, "exception while attempting to rollback");
                    }
                    false
                }
            }
        };
        // Release before notifying: listeners typically query the store.
        drop(guard);
        let inserted = std::mem::take(&mut self.inserted);
        if committed && notify && !inserted.is_empty() {
            self.store.notify(StoreNotice::EventsAdded(inserted));
        }
    }

    /// Roll back and release the store. No-op on a closed transaction.
    pub fn rollback(&mut self) {
        if let Some(guard) = self.guard.take() {
            if !self.began {
                warn!(
                    written = self.inserted.len(),
                    "rolling back a transaction that never began; writes already committed"
                );
            } else if let Err(e) = guard.execute_batch("ROLLBACK") {
                error!(error = %e, "exception while attempting to rollback");
            }
            self.inserted.clear();
        }
    }
}

impl Drop for EventTransaction<'_> {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!("transaction dropped while open; rolling back");
            self.rollback();
        }
    }
}
