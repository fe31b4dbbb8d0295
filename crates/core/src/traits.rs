use crate::snapshot::InputSnapshot;
use anyhow::Result;
use async_trait::async_trait;

/// Anything that can hand the engine a complete snapshot.
///
/// Implementations must return either a fully populated snapshot or an
/// error; a partially read snapshot is never returned.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<InputSnapshot>;
    fn name(&self) -> &str;
}
