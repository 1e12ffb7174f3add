//! 基线清单获取。
//!
//! 实时链路只承载增量更新；完整的网关/设备树由这里在会话建立前
//! 获取一次，之后仅在手动刷新时重新获取。链路自身从不调用清单。

use async_trait::async_trait;
use domain::FarmInventory;
use std::path::PathBuf;

/// 清单获取错误。
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("io error: {0}")]
    Io(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("farm mismatch: expected {expected}, found {found}")]
    FarmMismatch { expected: String, found: String },
}

/// 清单提供者抽象。
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn fetch(&self, farm_id: &str) -> Result<FarmInventory, InventoryError>;
}

/// 空清单提供者（用于接线与测试）。
#[derive(Debug, Default)]
pub struct NoopInventoryProvider;

#[async_trait]
impl InventoryProvider for NoopInventoryProvider {
    async fn fetch(&self, farm_id: &str) -> Result<FarmInventory, InventoryError> {
        Ok(FarmInventory {
            farm_id: farm_id.to_string(),
            sites: Vec::new(),
            gateways: Vec::new(),
        })
    }
}

/// 基于 JSON 文件的清单提供者。
///
/// 文件顶层须是一棵 [`FarmInventory`] 树，且 `farm_id` 与请求一致。
#[derive(Debug, Clone)]
pub struct FileInventoryProvider {
    path: PathBuf,
}

impl FileInventoryProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InventoryProvider for FileInventoryProvider {
    async fn fetch(&self, farm_id: &str) -> Result<FarmInventory, InventoryError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|err| InventoryError::Io(err.to_string()))?;
        let inventory: FarmInventory =
            serde_json::from_slice(&raw).map_err(|err| InventoryError::Decode(err.to_string()))?;
        if inventory.farm_id != farm_id {
            return Err(InventoryError::FarmMismatch {
                expected: farm_id.to_string(),
                found: inventory.farm_id,
            });
        }
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_provider_returns_empty_tree() {
        let inventory = NoopInventoryProvider
            .fetch("farm1")
            .await
            .expect("inventory");
        assert_eq!(inventory.farm_id, "farm1");
        assert!(inventory.gateways.is_empty());
    }

    #[tokio::test]
    async fn file_provider_rejects_missing_file() {
        let provider = FileInventoryProvider::new("/nonexistent/inventory.json");
        let err = provider.fetch("farm1").await.expect_err("io error");
        assert!(matches!(err, InventoryError::Io(_)));
    }

    #[tokio::test]
    async fn file_provider_checks_farm_id() {
        let dir = std::env::temp_dir().join("farmsync-inventory-test");
        tokio::fs::create_dir_all(&dir).await.expect("tempdir");
        let path = dir.join("inventory.json");
        tokio::fs::write(
            &path,
            br#"{ "farm_id": "farm1", "sites": [], "gateways": [] }"#,
        )
        .await
        .expect("write");

        let provider = FileInventoryProvider::new(&path);
        let inventory = provider.fetch("farm1").await.expect("inventory");
        assert_eq!(inventory.farm_id, "farm1");

        let err = provider.fetch("farm2").await.expect_err("mismatch");
        assert!(matches!(err, InventoryError::FarmMismatch { .. }));
    }
}
