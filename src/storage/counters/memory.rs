use crate::domain::CounterKey;
use crate::storage::counters::CounterBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-process counter records. Each operation holds the map lock, which makes
/// increment and conditional create atomic.
#[derive(Debug, Default)]
pub struct MemoryCounterBackend {
    values: Mutex<HashMap<CounterKey, i64>>,
}

impl MemoryCounterBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterBackend for MemoryCounterBackend {
    async fn read(&self, key: CounterKey) -> anyhow::Result<Option<i64>> {
        Ok(self.values.lock().await.get(&key).copied())
    }

    async fn increment(&self, key: CounterKey, delta: i64) -> anyhow::Result<bool> {
        let mut values = self.values.lock().await;
        match values.get_mut(&key) {
            Some(v) => {
                *v += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_if_absent(&self, key: CounterKey, initial: i64) -> anyhow::Result<bool> {
        let mut values = self.values.lock().await;
        if values.contains_key(&key) {
            return Ok(false);
        }
        values.insert(key, initial);
        Ok(true)
    }

    async fn overwrite(&self, key: CounterKey, value: i64) -> anyhow::Result<()> {
        self.values.lock().await.insert(key, value);
        Ok(())
    }
}
