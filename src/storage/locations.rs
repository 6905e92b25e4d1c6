use crate::world::BlockPos;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================
// LOCATION STORE — Named chests, one JSON file
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChestRecord {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChestRecord {
    pub fn pos(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode chests: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct LocationStore {
    path: PathBuf,
    chests: Vec<ChestRecord>,
}

impl LocationStore {
    /// Read the store once. A missing or unreadable file starts empty.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let chests = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Vec<ChestRecord>>(&data) {
                Ok(chests) => {
                    info!("[CHESTS] Loaded {} chests from {}", chests.len(), path.display());
                    chests
                }
                Err(e) => {
                    warn!("[CHESTS] Failed to parse {}: {}. Starting fresh.", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("[CHESTS] {} not found, starting with no chests.", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("[CHESTS] Failed to read {}: {}. Starting fresh.", path.display(), e);
                Vec::new()
            }
        };
        Self { path, chests }
    }

    pub fn get(&self, name: &str) -> Option<BlockPos> {
        self.chests.iter().find(|c| c.name == name).map(ChestRecord::pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChestRecord> {
        self.chests.iter()
    }

    pub fn len(&self) -> usize {
        self.chests.len()
    }

    /// Name a chest. Whatever was stored at the same coordinates is replaced.
    /// Memory only changes once the file has been written.
    pub fn set(&mut self, name: &str, pos: BlockPos) -> Result<(), StoreError> {
        let mut next = self.chests.clone();
        next.retain(|c| c.pos() != pos || c.name == name);
        let record = ChestRecord {
            name: name.to_string(),
            x: pos.x,
            y: pos.y,
            z: pos.z,
        };
        match next.iter_mut().find(|c| c.name == name) {
            Some(existing) => *existing = record,
            None => next.push(record),
        }
        save(&self.path, &next)?;
        self.chests = next;
        Ok(())
    }
}

fn save(path: &Path, chests: &[ChestRecord]) -> Result<(), StoreError> {
    let data = serde_json::to_string_pretty(chests)?;
    fs::write(path, data).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source,
    })
}
