//! In-process store with optional JSON snapshot persistence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::ToolRecord;
use crate::store::{
    SettingsStore, StoreError, StoreResult, TrackingStore, UserRecord, UserSubmissionTracking,
};

#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    settings: HashMap<String, String>,
    tracking: HashMap<String, UserSubmissionTracking>,
    users: HashMap<String, UserRecord>,
    tools: HashMap<Uuid, ToolRecord>,
}

/// Thread-safe store for settings, tracking rows, users and tools.
#[derive(Default)]
pub struct MemoryStore {
    settings: DashMap<String, String>,
    tracking: DashMap<String, UserSubmissionTracking>,
    users: DashMap<String, UserRecord>,
    /// Lowercased email → user id.
    emails: DashMap<String, String>,
    tools: DashMap<Uuid, ToolRecord>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            persistence_path,
            ..Self::default()
        }
    }

    /// Load from file if it exists, otherwise start empty.
    pub fn load_from_file(path: &Path) -> StoreResult<Self> {
        let mut store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;

            store.settings.extend(snapshot.settings);
            store.tracking.extend(snapshot.tracking);
            for (id, user) in snapshot.users {
                store.emails.insert(user.email.clone(), id.clone());
                store.users.insert(id, user);
            }
            store.tools.extend(snapshot.tools);

            tracing::info!(
                path = ?path,
                users = store.users.len(),
                tools = store.tools.len(),
                "Loaded store snapshot"
            );
        }
        Ok(store)
    }

    /// Write a snapshot if a persistence path is configured.
    pub fn save_to_file(&self) -> StoreResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let snapshot = Snapshot {
            settings: collect(&self.settings),
            tracking: collect(&self.tracking),
            users: collect(&self.users),
            tools: collect(&self.tools),
        };

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)?;
        tracing::info!(path = ?path, tools = snapshot.tools.len(), "Saved store snapshot");
        Ok(())
    }

    /// Register a user. Returns `None` if the email is already taken.
    pub fn create_user(&self, name: String, email: String, created_at: u64) -> Option<UserRecord> {
        let id = Uuid::new_v4().to_string();
        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
                let user = UserRecord {
                    id: id.clone(),
                    name,
                    email,
                    created_at,
                };
                self.users.insert(id, user.clone());
                Some(user)
            }
        }
    }

    pub fn get_user(&self, id: &str) -> Option<UserRecord> {
        self.users.get(id).map(|r| r.value().clone())
    }

    pub fn insert_tool(&self, tool: ToolRecord) {
        self.tools.insert(tool.id, tool);
    }

    pub fn get_tool(&self, id: &Uuid) -> Option<ToolRecord> {
        self.tools.get(id).map(|r| r.value().clone())
    }

    /// All tools, newest first.
    pub fn list_tools(&self) -> Vec<ToolRecord> {
        let mut tools: Vec<_> = self.tools.iter().map(|r| r.value().clone()).collect();
        tools.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        tools
    }

    /// Apply `f` to a tool in place, returning the updated record.
    pub fn update_tool<F>(&self, id: &Uuid, f: F) -> Option<ToolRecord>
    where
        F: FnOnce(&mut ToolRecord),
    {
        self.tools.get_mut(id).map(|mut r| {
            f(r.value_mut());
            r.value().clone()
        })
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

fn collect<K, V>(map: &DashMap<K, V>) -> HashMap<K, V>
where
    K: Clone + Eq + std::hash::Hash,
    V: Clone,
{
    map.iter().map(|r| (r.key().clone(), r.value().clone())).collect()
}

impl SettingsStore for MemoryStore {
    fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.settings.get(key).map(|r| r.value().clone()))
    }

    fn put_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn insert_setting_if_absent(&self, key: &str, value: &str) -> StoreResult<String> {
        let entry = self
            .settings
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
        Ok(entry.value().clone())
    }

    fn increment_setting(&self, key: &str, delta: u64) -> StoreResult<u64> {
        self.adjust_setting(key, |current| current.saturating_add(delta))
    }

    fn decrement_setting(&self, key: &str, delta: u64) -> StoreResult<u64> {
        self.adjust_setting(key, |current| current.saturating_sub(delta))
    }
}

impl MemoryStore {
    fn adjust_setting(&self, key: &str, f: impl FnOnce(u64) -> u64) -> StoreResult<u64> {
        let mut entry = self
            .settings
            .entry(key.to_string())
            .or_insert_with(|| "0".to_string());
        let current: u64 = entry.value().parse().map_err(|_| StoreError::Corrupt {
            key: key.to_string(),
            value: entry.value().clone(),
        })?;
        let next = f(current);
        *entry.value_mut() = next.to_string();
        Ok(next)
    }
}

impl TrackingStore for MemoryStore {
    fn get_tracking(&self, user_id: &str) -> StoreResult<Option<UserSubmissionTracking>> {
        Ok(self.tracking.get(user_id).map(|r| r.value().clone()))
    }

    fn ensure_tracking(&self, user_id: &str) -> StoreResult<UserSubmissionTracking> {
        let entry = self
            .tracking
            .entry(user_id.to_string())
            .or_insert_with(|| UserSubmissionTracking::new(user_id));
        Ok(entry.value().clone())
    }

    fn record_submission(&self, user_id: &str, consume_free: bool) -> StoreResult<UserSubmissionTracking> {
        let mut entry = self
            .tracking
            .entry(user_id.to_string())
            .or_insert_with(|| UserSubmissionTracking::new(user_id));
        let row = entry.value_mut();
        row.total_submissions_count = row.total_submissions_count.saturating_add(1);
        if consume_free {
            row.first_submission_free_used = true;
        }
        Ok(row.clone())
    }
}
