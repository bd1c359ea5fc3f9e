use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use super::view::{SortDirection, SortKey, ViewState};
use crate::{extension_of, DroppedFile};

pub const DEFAULT_PROJECTION_CACHE_SIZE: usize = 32;

/// Filters and sorts `files` into the displayed sequence. Pure: the output
/// depends only on the arguments.
///
/// The sort is stable in both directions: descending reverses the comparison,
/// not the output, so equal keys keep their input order.
pub fn project(
    files: &[DroppedFile],
    query: &str,
    selected_extensions: &BTreeSet<String>,
    sort_key: SortKey,
    sort_direction: SortDirection,
) -> Vec<DroppedFile> {
    let query = query.to_lowercase();

    let mut result: Vec<DroppedFile> = files
        .iter()
        .filter(|file| matches_query(file, &query))
        .filter(|file| selected_extensions.is_empty() || selected_extensions.contains(&file.extension()))
        .cloned()
        .collect();

    result.sort_by(|a, b| {
        let ordering = compare(a, b, sort_key);
        match sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    result
}

fn matches_query(file: &DroppedFile, lowered_query: &str) -> bool {
    lowered_query.is_empty()
        || file.name.to_lowercase().contains(lowered_query)
        || file.content.to_lowercase().contains(lowered_query)
}

fn compare(a: &DroppedFile, b: &DroppedFile, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Date => a
            .uploaded_at
            .as_deref()
            .unwrap_or_default()
            .cmp(b.uploaded_at.as_deref().unwrap_or_default()),
        SortKey::Type => extension_of(&a.name).cmp(&extension_of(&b.name)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProjectionKey {
    revision: u64,
    view: ViewState,
}

/// Memoizes projections per (base revision, view state).
pub struct ProjectionCache {
    cache: Mutex<LruCache<ProjectionKey, Arc<Vec<DroppedFile>>>>,
}

impl ProjectionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached projection or computes it with `files`.
    pub async fn get_or_project(&self, revision: u64, view: &ViewState, files: &[DroppedFile]) -> Arc<Vec<DroppedFile>> {
        let key = ProjectionKey {
            revision,
            view: view.clone(),
        };

        let mut cache = self.cache.lock().await;
        if let Some(hit) = cache.get(&key) {
            return Arc::clone(hit);
        }

        let projected = Arc::new(view.apply(files));
        cache.put(key, Arc::clone(&projected));
        projected
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }

    /// Drops entries computed for older revisions.
    pub async fn retain_revision(&self, revision: u64) {
        let mut cache = self.cache.lock().await;
        let stale: Vec<ProjectionKey> = cache
            .iter()
            .filter(|(key, _)| key.revision != revision)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            cache.pop(&key);
        }
    }
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECTION_CACHE_SIZE)
    }
}
