//! # Block Model
//!
//! Grid-positioned blocks and the partial updates applied to them.
//!
//! A block occupies an axis-aligned rectangle of grid cells. Its identity is
//! either a store-assigned integer or a client token minted before the block
//! was ever published:
//!
//! ```text
//! BlockId::Temporary("temp_3f2a…")  --publish-->  BlockId::Persistent(7)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Prefix marking client-generated ids that the store has not seen yet
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Block identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockId {
    /// Id assigned by the store
    Persistent(i64),

    /// Client token for a block that has never been published
    Temporary(String),
}

impl BlockId {
    /// Mint a fresh temporary id
    pub fn temporary() -> Self {
        BlockId::Temporary(format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4().simple()))
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, BlockId::Temporary(_))
    }

    pub fn as_persistent(&self) -> Option<i64> {
        match self {
            BlockId::Persistent(id) => Some(*id),
            BlockId::Temporary(_) => None,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Persistent(id) => write!(f, "{}", id),
            BlockId::Temporary(token) => f.write_str(token),
        }
    }
}

impl From<i64> for BlockId {
    fn from(id: i64) -> Self {
        BlockId::Persistent(id)
    }
}

impl From<&str> for BlockId {
    fn from(token: &str) -> Self {
        BlockId::Temporary(token.to_string())
    }
}

/// Rectangle of grid cells (`width`/`height` are at least 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

impl GridRect {
    pub fn new(col: u32, row: u32, width: u32, height: u32) -> Self {
        Self {
            col,
            row,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Exclusive end column
    pub fn end_col(&self) -> u32 {
        self.col.saturating_add(self.width)
    }

    /// Exclusive end row
    pub fn end_row(&self) -> u32 {
        self.row.saturating_add(self.height)
    }

    /// Same size, different origin
    pub fn at(&self, col: u32, row: u32) -> Self {
        Self { col, row, ..*self }
    }

    /// Same origin, different size
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self::new(self.col, self.row, width, height)
    }

    /// Two rectangles overlap unless they are separated on either axis
    pub fn overlaps(&self, other: &GridRect) -> bool {
        !(self.end_col() <= other.col
            || other.end_col() <= self.col
            || self.end_row() <= other.row
            || other.end_row() <= self.row)
    }

    pub fn contains_cell(&self, col: u32, row: u32) -> bool {
        col >= self.col && col < self.end_col() && row >= self.row && row < self.end_row()
    }

    /// Covered `(col, row)` cells, row-major
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> {
        let (col, end_col) = (self.col, self.end_col());
        (self.row..self.end_row()).flat_map(move |row| (col..end_col).map(move |c| (c, row)))
    }
}

/// A grid-positioned unit of page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub page_id: i64,

    /// Opaque tag resolved by the component catalog
    pub block_type: String,

    /// Type-specific structured content
    #[serde(default)]
    pub content: Value,

    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,

    #[serde(default)]
    pub z_index: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Block {
    pub fn new(
        id: BlockId,
        page_id: i64,
        block_type: impl Into<String>,
        placement: GridRect,
        content: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            page_id,
            block_type: block_type.into(),
            content,
            col: placement.col,
            row: placement.row,
            width: placement.width.max(1),
            height: placement.height.max(1),
            background_color: None,
            text_color: None,
            z_index: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn placement(&self) -> GridRect {
        GridRect::new(self.col, self.row, self.width, self.height)
    }

    pub fn set_placement(&mut self, rect: GridRect) {
        self.col = rect.col;
        self.row = rect.row;
        self.width = rect.width.max(1);
        self.height = rect.height.max(1);
    }

    /// Content flattened to lower-case text, used by content heuristics
    pub fn content_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.content, &mut out);
        out.to_lowercase()
    }

    /// True when the content carries no visible text or values
    pub fn has_empty_content(&self) -> bool {
        is_empty_value(&self.content)
    }
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push_str(s);
            out.push(' ');
        }
        Value::Array(items) => items.iter().for_each(|v| collect_text(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_text(v, out)),
        _ => {}
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty_value),
        Value::Object(map) => map.values().all(is_empty_value),
        _ => false,
    }
}

/// Partial block: only the present keys are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// `Some(None)` clears the colour (`null` on the wire)
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub background_color: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub text_color: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

/// Present key → `Some`, even when its value is `null`
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BlockPatch {
    /// Patch carrying every mutable field of `block`
    pub fn from_block(block: &Block) -> Self {
        Self {
            block_type: Some(block.block_type.clone()),
            content: Some(block.content.clone()),
            col: Some(block.col),
            row: Some(block.row),
            width: Some(block.width),
            height: Some(block.height),
            background_color: Some(block.background_color.clone()),
            text_color: Some(block.text_color.clone()),
            z_index: Some(block.z_index),
        }
    }

    /// Patch that turns `before` into `after` (fields that differ only)
    pub fn diff(before: &Block, after: &Block) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }

        Self {
            block_type: changed(&before.block_type, &after.block_type),
            content: changed(&before.content, &after.content),
            col: changed(&before.col, &after.col),
            row: changed(&before.row, &after.row),
            width: changed(&before.width, &after.width),
            height: changed(&before.height, &after.height),
            background_color: changed(&before.background_color, &after.background_color),
            text_color: changed(&before.text_color, &after.text_color),
            z_index: changed(&before.z_index, &after.z_index),
        }
    }

    pub fn placement(rect: GridRect) -> Self {
        Self {
            col: Some(rect.col),
            row: Some(rect.row),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &BlockPatch::default()
    }

    /// True if the patch moves or resizes the block
    pub fn touches_placement(&self) -> bool {
        self.col.is_some() || self.row.is_some() || self.width.is_some() || self.height.is_some()
    }

    /// Placement of `block` after this patch
    pub fn placement_for(&self, block: &Block) -> GridRect {
        GridRect::new(
            self.col.unwrap_or(block.col),
            self.row.unwrap_or(block.row),
            self.width.unwrap_or(block.width),
            self.height.unwrap_or(block.height),
        )
    }

    /// Overwrite the present keys on `block`
    pub fn apply_to(&self, block: &mut Block) {
        if let Some(block_type) = &self.block_type {
            block.block_type = block_type.clone();
        }
        if let Some(content) = &self.content {
            block.content = content.clone();
        }
        if let Some(col) = self.col {
            block.col = col;
        }
        if let Some(row) = self.row {
            block.row = row;
        }
        if let Some(width) = self.width {
            block.width = width.max(1);
        }
        if let Some(height) = self.height {
            block.height = height.max(1);
        }
        if let Some(color) = &self.background_color {
            block.background_color = color.clone();
        }
        if let Some(color) = &self.text_color {
            block.text_color = color.clone();
        }
        if let Some(z_index) = self.z_index {
            block.z_index = z_index;
        }
    }

    /// Fold a later patch over this one (later keys win)
    pub fn merge(&mut self, later: &BlockPatch) {
        macro_rules! take_later {
            ($($field:ident),*) => {
                $(
                    if later.$field.is_some() {
                        self.$field = later.$field.clone();
                    }
                )*
            };
        }

        take_later!(
            block_type,
            content,
            col,
            row,
            width,
            height,
            background_color,
            text_color,
            z_index
        );
    }
}

/// Partial page layout settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,

    /// Settings the core does not interpret (background, max width, …)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LayoutSettingsPatch {
    pub fn rows(rows: u32) -> Self {
        Self {
            rows: Some(rows),
            extra: Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_none() && self.extra.is_empty()
    }

    pub fn merge(&mut self, later: &LayoutSettingsPatch) {
        if later.rows.is_some() {
            self.rows = later.rows;
        }
        for (key, value) in &later.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(id: i64, rect: GridRect) -> Block {
        Block::new(BlockId::Persistent(id), 1, "Text", rect, json!({"text": "hi"}), Utc::now())
    }

    #[test]
    fn test_block_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(BlockId::Persistent(7)).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(BlockId::from("temp_x")).unwrap(),
            json!("temp_x")
        );

        let id: BlockId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id, BlockId::Persistent(42));
        let id: BlockId = serde_json::from_value(json!("temp_abc")).unwrap();
        assert!(id.is_temporary());
    }

    #[test]
    fn test_temporary_ids_are_unique_and_prefixed() {
        let a = BlockId::temporary();
        let b = BlockId::temporary();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with(TEMP_ID_PREFIX));
        assert_eq!(a.as_persistent(), None);
    }

    #[test]
    fn test_overlap_is_exclusive_on_edges() {
        let a = GridRect::new(0, 0, 2, 1);
        let b = GridRect::new(2, 0, 2, 1);
        let c = GridRect::new(1, 0, 2, 2);
        let d = GridRect::new(0, 1, 2, 1);

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_rect_cells_row_major() {
        let cells: Vec<_> = GridRect::new(1, 2, 2, 2).cells().collect();
        assert_eq!(cells, vec![(1, 2), (2, 2), (1, 3), (2, 3)]);
        assert!(cells.iter().all(|(c, r)| GridRect::new(1, 2, 2, 2).contains_cell(*c, *r)));
    }

    #[test]
    fn test_rect_end_saturates() {
        let rect = GridRect::new(u32::MAX - 1, u32::MAX, 5, 5);
        assert_eq!(rect.end_col(), u32::MAX);
        assert_eq!(rect.end_row(), u32::MAX);
        assert!(rect.overlaps(&GridRect::new(u32::MAX - 1, u32::MAX - 1, 1, 3)));
    }

    #[test]
    fn test_rect_enforces_minimum_size() {
        let rect = GridRect::new(3, 4, 0, 0);
        assert_eq!(rect.width, 1);
        assert_eq!(rect.height, 1);
        assert!(rect.contains_cell(3, 4));
        assert!(!rect.contains_cell(4, 4));
    }

    #[test]
    fn test_block_serializes_flat_placement() {
        let b = block(3, GridRect::new(1, 2, 3, 4));
        let value = serde_json::to_value(&b).unwrap();
        assert_eq!(value["col"], json!(1));
        assert_eq!(value["height"], json!(4));
        assert!(value.get("background_color").is_none());

        let back: Block = serde_json::from_value(value).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_patch_only_overwrites_present_keys() {
        let mut b = block(1, GridRect::new(0, 0, 2, 1));
        let patch = BlockPatch {
            col: Some(4),
            text_color: Some(Some("#fff".to_string())),
            ..Default::default()
        };
        patch.apply_to(&mut b);

        assert_eq!(b.col, 4);
        assert_eq!(b.row, 0);
        assert_eq!(b.text_color.as_deref(), Some("#fff"));
        assert_eq!(b.content, json!({"text": "hi"}));
    }

    #[test]
    fn test_patch_merge_later_wins() {
        let mut first = BlockPatch {
            col: Some(1),
            row: Some(1),
            ..Default::default()
        };
        let later = BlockPatch {
            col: Some(2),
            ..Default::default()
        };
        first.merge(&later);

        assert_eq!(first.col, Some(2));
        assert_eq!(first.row, Some(1));
    }

    #[test]
    fn test_patch_diff() {
        let before = block(1, GridRect::new(0, 0, 2, 1));
        let mut after = before.clone();
        after.row = 3;
        after.content = json!({"text": "bye"});

        let diff = BlockPatch::diff(&before, &after);
        assert_eq!(diff.row, Some(3));
        assert_eq!(diff.content, Some(json!({"text": "bye"})));
        assert_eq!(diff.col, None);
        assert!(diff.touches_placement());

        assert!(BlockPatch::diff(&before, &before).is_empty());
    }

    #[test]
    fn test_patch_clears_color() {
        let before = block(1, GridRect::new(0, 0, 2, 1));
        let mut red = before.clone();
        red.background_color = Some("red".to_string());

        let clear = BlockPatch::diff(&red, &before);
        assert_eq!(clear.background_color, Some(None));
        assert_eq!(clear.text_color, None);
        assert!(!clear.is_empty());

        let mut restored = red.clone();
        clear.apply_to(&mut restored);
        assert_eq!(restored.background_color, None);

        let mut folded = BlockPatch::diff(&before, &red);
        folded.merge(&clear);
        assert_eq!(folded.background_color, Some(None));
    }

    #[test]
    fn test_patch_color_wire_shape() {
        let clear = BlockPatch {
            background_color: Some(None),
            text_color: Some(Some("#000".to_string())),
            ..Default::default()
        };
        let value = serde_json::to_value(&clear).unwrap();
        assert_eq!(value, json!({"background_color": null, "text_color": "#000"}));

        let parsed: BlockPatch = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, clear);

        let untouched: BlockPatch = serde_json::from_value(json!({"row": 2})).unwrap();
        assert_eq!(untouched.background_color, None);
        assert_eq!(untouched.text_color, None);
    }

    #[test]
    fn test_empty_content_detection() {
        let mut b = block(1, GridRect::new(0, 0, 1, 1));
        b.content = json!({"text": "  "});
        assert!(b.has_empty_content());
        b.content = Value::Null;
        assert!(b.has_empty_content());
        b.content = json!({"text": "Hero Title"});
        assert!(!b.has_empty_content());
        assert!(b.content_text().contains("hero title"));
    }

    #[test]
    fn test_layout_patch_merge() {
        let mut patch = LayoutSettingsPatch::rows(10);
        let mut later = LayoutSettingsPatch::default();
        later.extra.insert("background".to_string(), json!("#000"));
        patch.merge(&later);

        assert_eq!(patch.rows, Some(10));
        assert_eq!(patch.extra["background"], json!("#000"));

        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"rows": 10, "background": "#000"}));
    }
}
