//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult, decode, encode};
use crate::document::CircuitDocument;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and scratch sessions.
///
/// Documents are kept in their serialized form, so a load behaves exactly
/// like reading a file back.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &CircuitDocument) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let encoded = encode(document);
        Box::pin(async move {
            let json = encoded?;
            self.documents.write().map_err(lock_error)?.insert(id, json);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<CircuitDocument>> {
        let id = id.to_string();
        Box::pin(async move {
            let json = self
                .documents
                .read()
                .map_err(lock_error)?
                .get(&id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.clone()))?;
            decode(&id, &json)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.documents.write().map_err(lock_error)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let mut ids: Vec<String> = self
                .documents
                .read()
                .map_err(lock_error)?
                .keys()
                .cloned()
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.documents.read().map_err(lock_error)?.contains_key(&id)) })
    }
}
