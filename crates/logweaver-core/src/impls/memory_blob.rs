//! InMemoryBlobStore - 開発・テスト用の BlobStore

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ports::{BlobError, BlobRange, BlobStore};

/// HashMap-backed store. `set_unavailable(true)` simulates an outage.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check(&self) -> Result<(), BlobError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(BlobError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn read_range(
        &self,
        key: &str,
        start: u64,
        limit: u64,
    ) -> Result<Option<BlobRange>, BlobError> {
        self.check()?;
        let objects = self.objects.read().await;
        let Some(object) = objects.get(key) else {
            return Ok(None);
        };
        let total_len = object.len() as u64;
        let from = start.min(total_len);
        let to = from.saturating_add(limit).min(total_len);
        Ok(Some(BlobRange {
            bytes: object[from as usize..to as usize].to_vec(),
            total_len,
        }))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        self.check()?;
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }
}
