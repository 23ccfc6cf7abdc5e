//! # Batch-Apply Contract
//!
//! Wire types exchanged with the storage collaborator.
//!
//! ```text
//! request:  { operations: [{operation, data, timestamp}], rows }
//! response: { success, blocks, operationsProcessed, results, message }
//! ```
//!
//! The store applies operations in the order given and answers with the
//! fresh block collection. Every successful `create` result pairs the
//! client's `tempId` with the persisted `block.id`.

use crate::block::{Block, BlockId, BlockPatch};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// Payload of an `update` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateData {
    pub id: BlockId,

    #[serde(flatten)]
    pub patch: BlockPatch,
}

/// Payload of a `delete` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteData {
    pub id: BlockId,
}

/// One entry of a batch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub operation: OperationKind,
    pub data: Value,
    pub timestamp: i64,
}

impl BatchOperation {
    pub fn create(block: &Block, timestamp: i64) -> Result<Self, StoreError> {
        Ok(Self {
            operation: OperationKind::Create,
            data: serde_json::to_value(block)?,
            timestamp,
        })
    }

    pub fn update(id: BlockId, patch: BlockPatch, timestamp: i64) -> Result<Self, StoreError> {
        Ok(Self {
            operation: OperationKind::Update,
            data: serde_json::to_value(UpdateData { id, patch })?,
            timestamp,
        })
    }

    pub fn delete(id: BlockId, timestamp: i64) -> Result<Self, StoreError> {
        Ok(Self {
            operation: OperationKind::Delete,
            data: serde_json::to_value(DeleteData { id })?,
            timestamp,
        })
    }

    /// Id the operation targets, if the payload carries one
    pub fn target_id(&self) -> Option<BlockId> {
        self.data
            .get("id")
            .and_then(|id| serde_json::from_value(id.clone()).ok())
    }

    pub fn decode_create(&self) -> Result<Block, StoreError> {
        self.expect_kind(OperationKind::Create)?;
        Ok(serde_json::from_value(self.data.clone())?)
    }

    pub fn decode_update(&self) -> Result<UpdateData, StoreError> {
        self.expect_kind(OperationKind::Update)?;
        Ok(serde_json::from_value(self.data.clone())?)
    }

    pub fn decode_delete(&self) -> Result<DeleteData, StoreError> {
        self.expect_kind(OperationKind::Delete)?;
        Ok(serde_json::from_value(self.data.clone())?)
    }

    fn expect_kind(&self, kind: OperationKind) -> Result<(), StoreError> {
        if self.operation == kind {
            Ok(())
        } else {
            Err(StoreError::InvalidOperation(format!(
                "expected {} payload, got {}",
                kind.as_str(),
                self.operation.as_str()
            )))
        }
    }
}

/// Ordered operations plus the current row count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub operations: Vec<BatchOperation>,
    pub rows: u32,

    /// Layout settings other than `rows`
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

/// Outcome of one operation inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: OperationKind,
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,

    #[serde(rename = "tempId", default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<BlockId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn failed(operation: OperationKind, id: Option<BlockId>, error: impl Into<String>) -> Self {
        Self {
            operation,
            success: false,
            block: None,
            id,
            temp_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,

    #[serde(default)]
    pub blocks: Vec<Block>,

    #[serde(rename = "operationsProcessed", default)]
    pub operations_processed: usize,

    #[serde(default)]
    pub results: Vec<OperationResult>,

    #[serde(default)]
    pub message: String,
}

impl BatchResponse {
    /// Temporary id → persisted id, from successful create results
    pub fn id_mapping(&self) -> HashMap<BlockId, BlockId> {
        self.results
            .iter()
            .filter(|r| r.success && r.operation == OperationKind::Create)
            .filter_map(|r| {
                let temp = r.temp_id.clone()?;
                let assigned = r
                    .block
                    .as_ref()
                    .map(|b| b.id.clone())
                    .or_else(|| r.id.clone())?;
                Some((temp, assigned))
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Result of the page/block fetch contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub page_id: i64,

    #[serde(default)]
    pub blocks: Vec<Block>,

    #[serde(default)]
    pub rows: u32,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::GridRect;
    use chrono::Utc;
    use serde_json::json;

    fn temp_block() -> Block {
        Block::new(
            BlockId::from("temp_x"),
            1,
            "Text",
            GridRect::new(0, 0, 2, 1),
            json!({"text": "hello"}),
            Utc::now(),
        )
    }

    #[test]
    fn test_request_wire_shape() {
        let request = BatchRequest {
            operations: vec![
                BatchOperation::create(&temp_block(), 10).unwrap(),
                BatchOperation::update(
                    BlockId::Persistent(4),
                    BlockPatch {
                        row: Some(2),
                        ..Default::default()
                    },
                    11,
                )
                .unwrap(),
                BatchOperation::delete(BlockId::Persistent(5), 12).unwrap(),
            ],
            rows: 12,
            settings: Map::new(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["rows"], json!(12));
        assert_eq!(value["operations"][0]["operation"], json!("create"));
        assert_eq!(value["operations"][0]["data"]["id"], json!("temp_x"));
        assert_eq!(value["operations"][1]["data"], json!({"id": 4, "row": 2}));
        assert_eq!(value["operations"][2]["data"], json!({"id": 5}));
        assert!(value.get("settings").is_none());
    }

    #[test]
    fn test_update_carries_color_clear() {
        let op = BatchOperation::update(
            BlockId::Persistent(4),
            BlockPatch {
                background_color: Some(None),
                ..Default::default()
            },
            1,
        )
        .unwrap();
        assert_eq!(op.data, json!({"id": 4, "background_color": null}));

        let update = op.decode_update().unwrap();
        assert_eq!(update.patch.background_color, Some(None));
        assert_eq!(update.patch.text_color, None);
    }

    #[test]
    fn test_decode_operations() {
        let op = BatchOperation::update(
            BlockId::Persistent(4),
            BlockPatch {
                content: Some(json!({"text": "x"})),
                ..Default::default()
            },
            1,
        )
        .unwrap();

        let update = op.decode_update().unwrap();
        assert_eq!(update.id, BlockId::Persistent(4));
        assert_eq!(update.patch.content, Some(json!({"text": "x"})));
        assert_eq!(op.target_id(), Some(BlockId::Persistent(4)));

        assert!(matches!(
            op.decode_delete(),
            Err(StoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_response_id_mapping() {
        let response: BatchResponse = serde_json::from_value(json!({
            "success": true,
            "blocks": [],
            "operationsProcessed": 2,
            "results": [
                {
                    "operation": "create",
                    "success": true,
                    "tempId": "temp_x",
                    "block": {
                        "id": 7, "page_id": 1, "block_type": "Text", "content": {},
                        "col": 0, "row": 0, "width": 2, "height": 1,
                        "created_at": "2024-01-01T00:00:00Z",
                        "updated_at": "2024-01-01T00:00:00Z"
                    }
                },
                {"operation": "delete", "success": false, "id": 9, "error": "Block not found"}
            ],
            "message": "ok"
        }))
        .unwrap();

        let mapping = response.id_mapping();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping[&BlockId::from("temp_x")], BlockId::Persistent(7));
        assert_eq!(response.failures().count(), 1);
        assert_eq!(response.operations_processed, 2);
    }
}
