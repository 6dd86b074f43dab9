//! Terminal tab bookkeeping, persisted through a local-storage-style
//! key-value store. Each tab is bound 1:1 to a session id; switching tabs
//! never touches the underlying connections.

use std::collections::HashMap;
use std::path::PathBuf;

use webterm_protocol::fallback_session_id;

/// Storage key for the serialized tab list.
pub const TABS_KEY: &str = "terminal_sessions";
/// Storage key for the active tab id.
pub const ACTIVE_KEY: &str = "terminal_active_id";

/// One terminal tab. The id doubles as the session id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TerminalTab {
    pub id: String,
    pub title: String,
}

/// Key-value persistence for the tab strip.
pub trait TabStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Store keeping each key as a file under one directory.
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TabStore for DirStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.join(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        let _ = std::fs::create_dir_all(&self.dir);
        let _ = std::fs::write(self.dir.join(key), value);
    }

    fn remove(&mut self, key: &str) {
        let _ = std::fs::remove_file(self.dir.join(key));
    }
}

/// In-memory store for tests and ephemeral panels.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl TabStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Outcome of removing a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Tabs remain; the strip stays mounted.
    Remaining,
    /// The last tab was removed: persisted state is cleared and the host
    /// should close the panel.
    PanelClosed,
}

/// Ordered tab list plus the active id. Never empty while mounted.
pub struct TabStrip {
    tabs: Vec<TerminalTab>,
    active_id: String,
}

impl TabStrip {
    /// Restore from storage, or start with a single default tab.
    pub fn restore(store: &mut impl TabStore) -> Self {
        let saved: Vec<TerminalTab> = store
            .get(TABS_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        let strip = if saved.is_empty() {
            let id = fallback_session_id();
            Self {
                tabs: vec![TerminalTab {
                    id: id.clone(),
                    title: "Terminal 1".to_string(),
                }],
                active_id: id,
            }
        } else {
            let active_id = store
                .get(ACTIVE_KEY)
                .filter(|id| saved.iter().any(|t| &t.id == id))
                .unwrap_or_else(|| saved[0].id.clone());
            Self {
                tabs: saved,
                active_id,
            }
        };
        strip.persist(store);
        strip
    }

    #[must_use]
    pub fn tabs(&self) -> &[TerminalTab] {
        &self.tabs
    }

    #[must_use]
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// Make `id` the active tab, if it exists.
    pub fn activate(&mut self, id: &str, store: &mut impl TabStore) {
        if self.tabs.iter().any(|t| t.id == id) {
            self.active_id = id.to_string();
            self.persist(store);
        }
    }

    /// Add a tab with a fresh session id and make it active. Returns the new
    /// tab's id.
    pub fn add(&mut self, store: &mut impl TabStore) -> String {
        let id = self.unique_id();
        let title = format!("Terminal {}", self.tabs.len() + 1);
        self.tabs.push(TerminalTab {
            id: id.clone(),
            title,
        });
        self.active_id = id.clone();
        self.persist(store);
        id
    }

    /// Remove a tab. Removing the last tab clears persisted state and tells
    /// the host to close the panel rather than leaving an empty strip.
    pub fn remove(&mut self, id: &str, store: &mut impl TabStore) -> RemoveOutcome {
        self.tabs.retain(|t| t.id != id);

        if self.tabs.is_empty() {
            store.remove(TABS_KEY);
            store.remove(ACTIVE_KEY);
            return RemoveOutcome::PanelClosed;
        }

        if self.active_id == id {
            self.active_id = self.tabs[self.tabs.len() - 1].id.clone();
        }
        self.persist(store);
        RemoveOutcome::Remaining
    }

    /// Time-derived id, nudged forward if two tabs land in one millisecond.
    fn unique_id(&self) -> String {
        let mut id = fallback_session_id();
        while self.tabs.iter().any(|t| t.id == id) {
            id = (id.parse::<i64>().unwrap_or_default() + 1).to_string();
        }
        id
    }

    fn persist(&self, store: &mut impl TabStore) {
        if let Ok(json) = serde_json::to_string(&self.tabs) {
            store.set(TABS_KEY, &json);
        }
        store.set(ACTIVE_KEY, &self.active_id);
    }
}
