//! TTL cache in front of a volume store
//!
//! Caches the per-client history read used for charting. Any write for a
//! client drops that client's cached history.
//!
//! Every write also bumps a per-client generation. A history read only
//! keeps its result cached if no write for that client happened while it
//! was in flight, so a slow read can't put pre-write data back.

use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::StoreError;
use crate::models::{MuscleGroupVolume, VolumeRecord};
use crate::volume::VolumeStore;

const DEFAULT_MAX_CLIENTS: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct CachedVolumeStore<S> {
    inner: S,
    history: Cache<String, Arc<Vec<VolumeRecord>>>,
    generations: Arc<Mutex<HashMap<String, u64>>>,
}

impl<S: VolumeStore> CachedVolumeStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, DEFAULT_MAX_CLIENTS)
    }

    pub fn with_capacity(inner: S, ttl: Duration, max_clients: u64) -> Self {
        Self {
            inner,
            history: Cache::builder()
                .max_capacity(max_clients)
                .time_to_live(ttl)
                .build(),
            generations: Arc::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop a client's cached history
    pub async fn invalidate(&self, client_id: &str) {
        self.history.invalidate(client_id).await;
    }

    fn generation(&self, client_id: &str) -> u64 {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        generations.get(client_id).copied().unwrap_or(0)
    }

    fn bump_generation(&self, client_id: &str) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *generations.entry(client_id.to_string()).or_insert(0) += 1;
    }
}

#[async_trait]
impl<S: VolumeStore> VolumeStore for CachedVolumeStore<S> {
    async fn save_weekly_volume(
        &self,
        client_id: &str,
        week_number: u32,
        muscle_group: &str,
        volume: f64,
    ) -> Result<(), StoreError> {
        let result = self
            .inner
            .save_weekly_volume(client_id, week_number, muscle_group, volume)
            .await;
        // A failed write may still have landed
        self.bump_generation(client_id);
        self.invalidate(client_id).await;
        result
    }

    async fn get_volume_history(&self, client_id: &str) -> Result<Vec<VolumeRecord>, StoreError> {
        if let Some(cached) = self.history.get(client_id).await {
            return Ok(cached.as_ref().clone());
        }

        let generation = self.generation(client_id);
        let records = self.inner.get_volume_history(client_id).await?;
        if self.generation(client_id) != generation {
            return Ok(records);
        }

        self.history
            .insert(client_id.to_string(), Arc::new(records.clone()))
            .await;
        // A write may have bumped and invalidated between the check and the insert
        if self.generation(client_id) != generation {
            self.invalidate(client_id).await;
        }
        Ok(records)
    }

    async fn get_weekly_volume(
        &self,
        client_id: &str,
        week_number: u32,
    ) -> Result<Vec<MuscleGroupVolume>, StoreError> {
        self.inner.get_weekly_volume(client_id, week_number).await
    }
}
