//! Storage for tab thumbnails and temporary full-resolution captures.
//!
//! Images arrive as `data:<mime>;base64,<payload>` URLs. They are decoded
//! before being written so malformed captures never reach the database,
//! and re-encoded when the placeholder page asks for them.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::types::errors::ImageError;
use crate::types::tab::TabId;

/// Which image slot of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// Downscaled preview, logical key `thumbnail_<id>`.
    Thumbnail,
    /// Full capture taken at suspend time, logical key `temp_img_<id>`.
    TempImage,
}

impl ImageSlot {
    fn table(&self) -> &'static str {
        match self {
            ImageSlot::Thumbnail => "thumbnails",
            ImageSlot::TempImage => "temp_images",
        }
    }

    /// Storage key the placeholder page uses for this slot.
    pub fn key(&self, tab_id: TabId) -> String {
        match self {
            ImageSlot::Thumbnail => format!("thumbnail_{}", tab_id),
            ImageSlot::TempImage => format!("temp_img_{}", tab_id),
        }
    }
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl StoredImage {
    /// Parses a base64 data URL.
    pub fn from_data_url(data_url: &str) -> Result<Self, ImageError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing data: prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUrl("missing payload separator".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::InvalidDataUrl("payload is not base64".to_string()))?;
        if !mime_type.starts_with("image/") {
            return Err(ImageError::InvalidDataUrl(format!(
                "not an image type: {}",
                mime_type
            )));
        }
        let data = BASE64
            .decode(payload)
            .map_err(|e| ImageError::InvalidDataUrl(format!("base64 decode error: {}", e)))?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.data))
    }
}

/// SQLite-backed image store.
#[derive(Clone)]
pub struct ImageStore {
    db: Arc<Database>,
}

impl ImageStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stores a data URL in the slot, replacing any previous image.
    pub fn put(&self, slot: ImageSlot, tab_id: TabId, data_url: &str) -> Result<(), ImageError> {
        let image = StoredImage::from_data_url(data_url)?;
        let sql = format!(
            "INSERT OR REPLACE INTO {} (tab_id, mime_type, data) VALUES (?1, ?2, ?3)",
            slot.table()
        );
        self.db
            .connection()
            .execute(&sql, params![tab_id, image.mime_type, image.data])
            .map_err(|e| ImageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Returns the slot's image as a data URL.
    pub fn get(&self, slot: ImageSlot, tab_id: TabId) -> Result<Option<String>, ImageError> {
        let sql = format!(
            "SELECT mime_type, data FROM {} WHERE tab_id = ?1",
            slot.table()
        );
        let image = self
            .db
            .connection()
            .query_row(&sql, params![tab_id], |row| {
                Ok(StoredImage {
                    mime_type: row.get(0)?,
                    data: row.get(1)?,
                })
            })
            .optional()
            .map_err(|e| ImageError::DatabaseError(e.to_string()))?;
        Ok(image.map(|img| img.to_data_url()))
    }

    /// Deletes both slots of a tab. Absent images are not an error.
    pub fn remove_for_tab(&self, tab_id: TabId) -> Result<(), ImageError> {
        let conn = self.db.connection();
        for slot in [ImageSlot::Thumbnail, ImageSlot::TempImage] {
            let sql = format!("DELETE FROM {} WHERE tab_id = ?1", slot.table());
            conn.execute(&sql, params![tab_id])
                .map_err(|e| ImageError::DatabaseError(e.to_string()))?;
        }
        Ok(())
    }

    pub fn count(&self, slot: ImageSlot) -> usize {
        let sql = format!("SELECT COUNT(*) FROM {}", slot.table());
        self.db
            .connection()
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .unwrap_or(0)
    }
}
