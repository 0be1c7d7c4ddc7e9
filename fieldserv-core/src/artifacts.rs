use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Reference to a stored completion report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRef {
    pub order_id: Uuid,
    pub filename: String,
    pub location: String,
    pub stored_at: DateTime<Utc>,
}

#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Store a completion report and return its reference
    async fn store(
        &self,
        order_id: Uuid,
        filename: &str,
        content: &[u8],
    ) -> Result<ArtifactRef, Box<dyn std::error::Error + Send + Sync>>;

    /// Fetch the stored reference for an order, if any
    async fn fetch(
        &self,
        order_id: Uuid,
    ) -> Result<Option<ArtifactRef>, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory artifact store (a real deployment would back this with object storage)
#[derive(Default)]
pub struct InMemoryCompletionStore {
    artifacts: Mutex<HashMap<Uuid, ArtifactRef>>,
}

#[async_trait]
impl CompletionStore for InMemoryCompletionStore {
    async fn store(
        &self,
        order_id: Uuid,
        filename: &str,
        content: &[u8],
    ) -> Result<ArtifactRef, Box<dyn std::error::Error + Send + Sync>> {
        if content.is_empty() {
            return Err("Refusing to store an empty completion report".into());
        }
        let artifact = ArtifactRef {
            order_id,
            filename: filename.to_string(),
            location: format!("mem://completion-reports/{}/{}", order_id.simple(), filename),
            stored_at: Utc::now(),
        };
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|_| "Artifact store lock poisoned")?;
        artifacts.insert(order_id, artifact.clone());
        Ok(artifact)
    }

    async fn fetch(
        &self,
        order_id: Uuid,
    ) -> Result<Option<ArtifactRef>, Box<dyn std::error::Error + Send + Sync>> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|_| "Artifact store lock poisoned")?;
        Ok(artifacts.get(&order_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_fetch() {
        let store = InMemoryCompletionStore::default();
        let order_id = Uuid::new_v4();

        assert!(store.fetch(order_id).await.unwrap().is_none());

        let artifact = store
            .store(order_id, "report.pdf", b"signed off")
            .await
            .unwrap();
        assert_eq!(artifact.filename, "report.pdf");

        let fetched = store.fetch(order_id).await.unwrap().unwrap();
        assert_eq!(fetched, artifact);
    }

    #[tokio::test]
    async fn empty_report_is_rejected() {
        let store = InMemoryCompletionStore::default();
        assert!(store.store(Uuid::new_v4(), "empty.pdf", b"").await.is_err());
    }
}
