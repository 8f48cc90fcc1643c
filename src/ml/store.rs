use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

use crate::config::FeatureConfig;
use crate::error::Result;
use crate::types::RegionHistory;
use super::LinearModel;

/// Load-once cache, keyed by file path unless a richer key is needed.
///
/// Entries are never invalidated. Failed loads are not cached, so a model
/// trained after the first attempt is picked up by the next call.
pub struct ArtifactCache<T, K = PathBuf> {
    slots: Mutex<HashMap<K, Arc<T>>>,
}

impl<T, K> ArtifactCache<T, K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_load<F>(&self, key: &K, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(&K) -> Result<T>,
    {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = slots.get(key) {
            debug!("Artifact cache hit: {:?}", key);
            return Ok(Arc::clone(hit));
        }

        let loaded = Arc::new(load(key)?);
        slots.insert(key.clone(), Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, K> Default for ArtifactCache<T, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A history file parsed with a given column layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    pub path: PathBuf,
    pub date_col: String,
    pub region_col: String,
    pub price_col: String,
}

impl HistoryKey {
    pub fn new(path: &Path, config: &FeatureConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            date_col: config.date_col.clone(),
            region_col: config.region_col.clone(),
            price_col: config.price_col.clone(),
        }
    }
}

static MODEL_CACHE: OnceLock<ArtifactCache<LinearModel>> = OnceLock::new();
static HISTORY_CACHE: OnceLock<ArtifactCache<RegionHistory, HistoryKey>> = OnceLock::new();

pub fn model_cache() -> &'static ArtifactCache<LinearModel> {
    MODEL_CACHE.get_or_init(ArtifactCache::new)
}

/// Unfiltered regional history per file and column layout
pub fn history_cache() -> &'static ArtifactCache<RegionHistory, HistoryKey> {
    HISTORY_CACHE.get_or_init(ArtifactCache::new)
}

/// Process-wide cached model artifact
pub fn cached_model(path: &Path) -> Result<Arc<LinearModel>> {
    model_cache().get_or_load(&path.to_path_buf(), |p| LinearModel::load(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use std::cell::Cell;

    #[test]
    fn test_loads_once() {
        let cache: ArtifactCache<u32> = ArtifactCache::new();
        let calls = Cell::new(0);
        let path = PathBuf::from("artifacts/a.json");

        for _ in 0..3 {
            let value = cache
                .get_or_load(&path, |_| {
                    calls.set(calls.get() + 1);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: ArtifactCache<u32> = ArtifactCache::new();
        let path = PathBuf::from("artifacts/missing.json");

        let first = cache.get_or_load(&path, |_| {
            Err(ForecastError::PredictorUnavailable("missing".to_string()))
        });
        assert!(first.is_err());
        assert!(cache.is_empty());

        assert_eq!(*cache.get_or_load(&path, |_| Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_history_key_tracks_columns() {
        let path = Path::new("prices.csv");
        let default_key = HistoryKey::new(path, &FeatureConfig::default());
        let usd_key = HistoryKey::new(
            path,
            &FeatureConfig {
                price_col: "usdprice".to_string(),
                ..FeatureConfig::default()
            },
        );
        assert_ne!(default_key, usd_key);

        let cache: ArtifactCache<&str, HistoryKey> = ArtifactCache::new();
        cache.get_or_load(&default_key, |_| Ok("local")).unwrap();
        let usd = cache.get_or_load(&usd_key, |_| Ok("usd")).unwrap();
        assert_eq!(*usd, "usd");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cached_model_missing_artifact() {
        let result = cached_model(Path::new("/nonexistent/best_model.json"));
        assert!(matches!(result, Err(ForecastError::PredictorUnavailable(_))));
    }
}
