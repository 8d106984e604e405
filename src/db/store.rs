use anyhow::Result;
use async_trait::async_trait;

/// Crash-durable local key/value storage shared by the activity store, the
/// notification ledger and the schedule config.
///
/// Only single-key reads and writes are atomic; a read followed by a write is
/// not, so writers that need read-modify-write must serialise themselves.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn get_all_keys(&self) -> Result<Vec<String>>;

    async fn multi_remove(&self, keys: &[String]) -> Result<()>;
}
