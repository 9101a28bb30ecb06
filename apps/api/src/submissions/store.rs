#![allow(dead_code)]
//! Ledger backends for submitted employee IDs.
//!
//! The ledger is a flat set of employee IDs. Membership means a completed
//! submission exists for that employee and no further submissions are
//! accepted. Entries are never removed by the application.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::{Mutex, RwLock};

use crate::errors::AppError;

/// Redis set holding all submitted employee IDs.
const REDIS_SET_KEY: &str = "skillarchitect:submitted_ids";

/// Durable membership set for submitted employee IDs. `add` is idempotent.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn contains(&self, employee_id: &str) -> Result<bool, AppError>;
    async fn add(&self, employee_id: &str) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend (tests)
// ────────────────────────────────────────────────────────────────────────────

/// Non-durable backend used by tests.
#[derive(Default)]
pub struct MemorySubmissionStore {
    ids: RwLock<HashSet<String>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn contains(&self, employee_id: &str) -> Result<bool, AppError> {
        Ok(self.ids.read().await.contains(employee_id))
    }

    async fn add(&self, employee_id: &str) -> Result<(), AppError> {
        self.ids.write().await.insert(employee_id.to_string());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JSON file backend
// ────────────────────────────────────────────────────────────────────────────

/// File-backed ledger: a JSON array of employee IDs, rewritten on every add.
/// A missing file reads as an empty ledger; a corrupt one is an error, not an
/// empty ledger.
pub struct JsonFileSubmissionStore {
    path: PathBuf,
    ids: Mutex<HashSet<String>>,
}

impl JsonFileSubmissionStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let ids = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let entries: Vec<String> = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::Ledger(format!(
                        "Ledger file {} is not a valid JSON array of strings: {e}",
                        path.display()
                    ))
                })?;
                entries.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(AppError::Ledger(format!(
                    "Failed to read ledger file {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            ids: Mutex::new(ids),
        })
    }

    async fn persist(&self, ids: &HashSet<String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Ledger(format!(
                        "Failed to create ledger directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let mut entries: Vec<&String> = ids.iter().collect();
        entries.sort();
        let bytes = serde_json::to_vec_pretty(&entries)
            .map_err(|e| AppError::Ledger(format!("Failed to encode ledger: {e}")))?;

        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            AppError::Ledger(format!(
                "Failed to write ledger file {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl SubmissionStore for JsonFileSubmissionStore {
    async fn contains(&self, employee_id: &str) -> Result<bool, AppError> {
        Ok(self.ids.lock().await.contains(employee_id))
    }

    async fn add(&self, employee_id: &str) -> Result<(), AppError> {
        let mut ids = self.ids.lock().await;
        if !ids.insert(employee_id.to_string()) {
            return Ok(());
        }
        if let Err(e) = self.persist(&ids).await {
            ids.remove(employee_id);
            return Err(e);
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

/// Redis-backed ledger, one SADD/SISMEMBER set shared across instances.
pub struct RedisSubmissionStore {
    client: Arc<redis::Client>,
}

impl RedisSubmissionStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Ledger(format!("Failed to connect to Redis: {e}")))
    }
}

#[async_trait]
impl SubmissionStore for RedisSubmissionStore {
    async fn contains(&self, employee_id: &str) -> Result<bool, AppError> {
        let mut conn = self.connection().await?;
        let member: bool = conn
            .sismember(REDIS_SET_KEY, employee_id)
            .await
            .map_err(|e| AppError::Ledger(format!("Redis SISMEMBER failed: {e}")))?;
        Ok(member)
    }

    async fn add(&self, employee_id: &str) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        conn.sadd::<_, _, ()>(REDIS_SET_KEY, employee_id)
            .await
            .map_err(|e| AppError::Ledger(format!("Redis SADD failed: {e}")))?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
