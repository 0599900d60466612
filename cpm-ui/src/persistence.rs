//! Two-phase persistence of workspace mutations
//!
//! A mutation is applied to the in-memory workspace first; the touched record
//! is then written with bounded retry. When every attempt fails the record key
//! goes into the session's dirty set and the request still succeeds. Dirty
//! records are rewritten from current in-memory state before the next
//! mutation and on sign-out.

use cpm_common::config::PersistenceConfig;
use cpm_common::db::retry_with_backoff;
use cpm_common::db::user_data::sync_record;
use cpm_common::workspace::{RecordKey, UserWorkspace};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Records whose last write failed
#[derive(Debug, Default)]
pub struct DirtySet(Mutex<BTreeSet<RecordKey>>);

impl DirtySet {
    pub async fn mark(&self, key: RecordKey) {
        self.0.lock().await.insert(key);
    }

    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }

    async fn take(&self) -> BTreeSet<RecordKey> {
        std::mem::take(&mut *self.0.lock().await)
    }
}

/// Writes workspace records to the database
#[derive(Clone)]
pub struct Persister {
    db: SqlitePool,
    policy: PersistenceConfig,
}

impl Persister {
    pub fn new(db: SqlitePool, policy: PersistenceConfig) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> PersistenceConfig {
        self.policy
    }

    /// Write one record; returns `false` (and marks it dirty) when every attempt failed
    pub async fn persist(
        &self,
        workspace: &Arc<RwLock<UserWorkspace>>,
        dirty: &DirtySet,
        key: RecordKey,
    ) -> bool {
        let result = retry_with_backoff("persist workspace record", self.policy, || {
            let workspace = Arc::clone(workspace);
            let db = self.db.clone();
            let key = key.clone();
            async move {
                let ws = workspace.read().await;
                sync_record(&db, &ws, &key).await
            }
        })
        .await;

        match result {
            Ok(()) => {
                debug!(record = ?key, "Record persisted");
                true
            }
            Err(e) => {
                warn!(record = ?key, error = %e, "Record not persisted, marked dirty");
                dirty.mark(key).await;
                false
            }
        }
    }

    /// Retry every dirty record; those that fail again stay dirty
    pub async fn flush(&self, workspace: &Arc<RwLock<UserWorkspace>>, dirty: &DirtySet) -> bool {
        let pending = dirty.take().await;
        if pending.is_empty() {
            return true;
        }

        let total = pending.len();
        let mut remaining = 0;
        for key in pending {
            if !self.persist(workspace, dirty, key).await {
                remaining += 1;
            }
        }

        if remaining == 0 {
            info!(records = total, "Flushed dirty records");
        } else {
            warn!(records = total, remaining, "Dirty records still pending");
        }
        remaining == 0
    }
}
