//! Application State
//!
//! Holds shared state for the server: the device store and the ephemeral
//! browse board.
//!
//! The browse board is the in-memory request/response rendezvous for the
//! file-browse sub-protocol, keyed `"{device_id}:{path}"`. Entries are
//! short-lived: a result is served for 30 seconds, everything is purged
//! after 60 (see the cleanup scheduler).

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

use warden_core::DeviceStore;
use warden_types::models::FileEntry;
use warden_types::protocol::BrowseListing;

const RESULT_FRESH_SECS: u64 = 30;
pub(crate) const ENTRY_TTL_SECS: u64 = 60;

/// One entry on the browse board.
pub enum BrowseEntry {
    /// Owner asked for a listing; the agent has not answered yet
    Request { path: String, created_at: Instant },
    /// Agent answered
    Result {
        path: String,
        items: Vec<FileEntry>,
        error: Option<String>,
        created_at: Instant,
    },
}

impl BrowseEntry {
    pub(crate) fn age_secs(&self) -> u64 {
        match self {
            Self::Request { created_at, .. } | Self::Result { created_at, .. } => {
                created_at.elapsed().as_secs()
            }
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub store: DeviceStore,
    pub browse: DashMap<String, BrowseEntry>,
}

impl AppState {
    pub fn new(store: DeviceStore) -> Self {
        Self { inner: Arc::new(AppStateInner { store, browse: DashMap::new() }) }
    }

    pub fn store(&self) -> &DeviceStore {
        &self.inner.store
    }

    pub fn device_count(&self) -> u64 {
        self.inner.store.device_count().unwrap_or(0)
    }

    fn browse_key(device_id: &str, path: &str) -> String {
        format!("{}:{}", device_id, path)
    }

    /// Owner requested a listing; returns the request id the agent echoes
    /// back with its result.
    pub fn create_browse_request(&self, device_id: &str, path: &str) -> String {
        let key = Self::browse_key(device_id, path);
        self.inner.browse.insert(
            key.clone(),
            BrowseEntry::Request { path: path.to_string(), created_at: Instant::now() },
        );
        key
    }

    /// First pending request for this device, if any.
    pub fn pending_browse_for(&self, device_id: &str) -> Option<(String, String)> {
        let prefix = format!("{}:", device_id);
        self.inner.browse.iter().find_map(|entry| {
            if !entry.key().starts_with(&prefix) {
                return None;
            }
            match entry.value() {
                BrowseEntry::Request { path, .. } => Some((path.clone(), entry.key().clone())),
                BrowseEntry::Result { .. } => None,
            }
        })
    }

    /// Agent answered a browse request.
    pub fn store_browse_result(
        &self,
        request_id: &str,
        path: &str,
        items: Vec<FileEntry>,
        error: Option<String>,
    ) {
        self.inner.browse.insert(
            request_id.to_string(),
            BrowseEntry::Result {
                path: path.to_string(),
                items,
                error,
                created_at: Instant::now(),
            },
        );
    }

    /// Dashboard poll: a fresh result if the agent has answered, otherwise
    /// a pending marker.
    pub fn browse_lookup(&self, device_id: &str, path: &str) -> BrowseListing {
        let key = Self::browse_key(device_id, path);
        if let Some(entry) = self.inner.browse.get(&key) {
            if let BrowseEntry::Result { path, items, error, created_at } = entry.value() {
                if created_at.elapsed().as_secs() < RESULT_FRESH_SECS {
                    return BrowseListing {
                        path: path.clone(),
                        count: items.len(),
                        items: items.clone(),
                        pending: false,
                        error: error.clone(),
                    };
                }
            }
        }
        BrowseListing {
            path: path.to_string(),
            items: vec![],
            count: 0,
            pending: true,
            error: None,
        }
    }

    /// Drop expired board entries. Returns how many were removed.
    pub fn cleanup_browse_board(&self) -> usize {
        let before = self.inner.browse.len();
        self.inner.browse.retain(|_, entry| entry.age_secs() < ENTRY_TTL_SECS);
        before.saturating_sub(self.inner.browse.len())
    }
}
