use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::market::MarketHandle;

/// Append-only record of every market ever created, indexed by creator.
///
/// Shared by the registry (which writes) and the keeper (which enumerates).
#[derive(Clone, Default)]
pub struct MarketStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    order: Vec<Uuid>,
    markets: HashMap<Uuid, MarketHandle>,
    by_creator: HashMap<String, Vec<Uuid>>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, handle: MarketHandle) {
        let mut inner = self.inner.write();
        let id = handle.id();
        inner.order.push(id);
        inner
            .by_creator
            .entry(handle.creator().to_string())
            .or_default()
            .push(id);
        inner.markets.insert(id, handle);
    }

    pub fn get(&self, id: Uuid) -> Option<MarketHandle> {
        self.inner.read().markets.get(&id).cloned()
    }

    /// Every market id in creation order.
    pub fn ids(&self) -> Vec<Uuid> {
        self.inner.read().order.clone()
    }

    /// Every market handle in creation order.
    pub fn handles(&self) -> Vec<MarketHandle> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.markets.get(id).cloned())
            .collect()
    }

    pub fn by_creator(&self, creator: &str) -> Vec<MarketHandle> {
        let inner = self.inner.read();
        inner
            .by_creator
            .get(creator)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.markets.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
