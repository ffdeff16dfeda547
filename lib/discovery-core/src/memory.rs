//! In-process store and runtime
//!
//! Both keep everything in memory and can be told to fail on demand, which
//! makes them suitable for exercising the reconciliation loop without etcd
//! or docker.

use crate::runtime::ContainerRuntime;
use crate::store::{CoordinationStore, StoreNode, WatchEvent};
use crate::{CoreError, Result};
use async_trait::async_trait;
use discovery_api::ContainerInstance;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Default)]
struct StoreState {
    values: BTreeMap<String, (String, u64)>,
    dirs: BTreeSet<String>,
    index: u64,
    history: Vec<WatchEvent>,
}

impl StoreState {
    fn record(&mut self, action: &str, key: &str) -> u64 {
        self.index += 1;
        self.history.push(WatchEvent {
            action: action.to_string(),
            key: key.to_string(),
            modified_index: self.index,
        });
        self.index
    }

    fn node(&self, key: &str, recursive: bool, descend: bool) -> Option<StoreNode> {
        if let Some((value, index)) = self.values.get(key) {
            return Some(StoreNode {
                key: key.to_string(),
                value: Some(value.clone()),
                dir: false,
                nodes: Vec::new(),
                modified_index: *index,
            });
        }

        let prefix = if key == "/" {
            "/".to_string()
        } else {
            format!("{}/", key)
        };
        let children: BTreeSet<String> = self
            .values
            .keys()
            .chain(self.dirs.iter())
            .filter_map(|k| k.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(|name| format!("{}{}", prefix, name))
            .collect();

        if children.is_empty() && !self.dirs.contains(key) {
            return None;
        }

        let nodes = if descend {
            children
                .iter()
                .filter_map(|child| self.node(child, recursive, recursive))
                .collect()
        } else {
            Vec::new()
        };

        Some(StoreNode {
            key: key.to_string(),
            value: None,
            dir: true,
            nodes,
            modified_index: 0,
        })
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn covers(path: &str, key: &str, recursive: bool) -> bool {
    key == path || (recursive && (path == "/" || key.starts_with(&format!("{}/", path))))
}

/// Coordination store held in process memory
pub struct MemoryStore {
    state: Mutex<StoreState>,
    index_tx: watch::Sender<u64>,
    failing_watches: AtomicUsize,
    unavailable: AtomicBool,
    rejected_prefixes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (index_tx, _) = watch::channel(0);
        Self {
            state: Mutex::new(StoreState::default()),
            index_tx,
            failing_watches: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            rejected_prefixes: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| CoreError::Internal("memory store lock poisoned".to_string()))
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoreError::Store("store unavailable".to_string()));
        }
        Ok(())
    }

    /// Current value of a key
    pub fn value(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.values.get(&normalize(key)).map(|(v, _)| v.clone()))
    }

    /// All values whose key starts with `prefix`
    pub fn values_under(&self, prefix: &str) -> BTreeMap<String, String> {
        self.state
            .lock()
            .map(|s| {
                s.values
                    .iter()
                    .filter(|(k, _)| k.starts_with(prefix))
                    .map(|(k, (v, _))| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove a value, as an external writer would
    pub fn remove(&self, key: &str) -> Result<()> {
        let key = normalize(key);
        let index = {
            let mut state = self.state()?;
            if state.values.remove(&key).is_none() {
                return Err(CoreError::KeyNotFound(key));
            }
            state.record("delete", &key)
        };
        self.index_tx.send_replace(index);
        Ok(())
    }

    /// Make the next `count` watch calls fail
    pub fn fail_next_watches(&self, count: usize) {
        self.failing_watches.store(count, Ordering::SeqCst);
    }

    /// Toggle failure of every get/set/create_dir call
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Reject writes to keys under `prefix`
    pub fn reject_writes_under(&self, prefix: &str) {
        if let Ok(mut prefixes) = self.rejected_prefixes.lock() {
            prefixes.push(prefix.to_string());
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn get(&self, path: &str, recursive: bool) -> Result<StoreNode> {
        self.check_available()?;
        let key = normalize(path);
        self.state()?
            .node(&key, recursive, true)
            .ok_or(CoreError::KeyNotFound(key))
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.check_available()?;
        let key = normalize(path);
        let index = {
            let mut state = self.state()?;
            if state.values.contains_key(&key) {
                return Err(CoreError::Store(format!("{} is not a directory", key)));
            }
            if state.node(&key, false, false).is_some() {
                return Ok(());
            }
            state.dirs.insert(key.clone());
            state.record("create", &key)
        };
        self.index_tx.send_replace(index);
        Ok(())
    }

    async fn watch(
        &self,
        path: &str,
        recursive: bool,
        after_index: Option<u64>,
    ) -> Result<WatchEvent> {
        let injected = self
            .failing_watches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(CoreError::Store("watch connection lost".to_string()));
        }

        let key = normalize(path);
        let mut rx = self.index_tx.subscribe();
        let start = match after_index {
            Some(index) => index,
            None => self.state()?.index + 1,
        };

        loop {
            {
                let state = self.state()?;
                if let Some(event) = state
                    .history
                    .iter()
                    .find(|e| e.modified_index >= start && covers(&key, &e.key, recursive))
                {
                    return Ok(event.clone());
                }
            }
            if rx.changed().await.is_err() {
                return Err(CoreError::Store("store closed".to_string()));
            }
        }
    }

    async fn set(&self, path: &str, value: &str) -> Result<()> {
        self.check_available()?;
        let key = normalize(path);
        let rejected = self
            .rejected_prefixes
            .lock()
            .map(|prefixes| prefixes.iter().any(|p| key.starts_with(p.as_str())))
            .unwrap_or(false);
        if rejected {
            return Err(CoreError::Store(format!("write to {} rejected", key)));
        }

        let index = {
            let mut state = self.state()?;
            let index = state.record("set", &key);
            state.values.insert(key, (value.to_string(), index));
            index
        };
        self.index_tx.send_replace(index);
        Ok(())
    }
}

/// Container runtime with a fixed, replaceable inventory
pub struct MemoryRuntime {
    containers: Mutex<Vec<ContainerInstance>>,
    available: AtomicBool,
    list_calls: AtomicUsize,
}

impl MemoryRuntime {
    pub fn new(containers: Vec<ContainerInstance>) -> Self {
        Self {
            containers: Mutex::new(containers),
            available: AtomicBool::new(true),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_containers(&self, containers: Vec<ContainerInstance>) {
        if let Ok(mut current) = self.containers.lock() {
            *current = containers;
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of list calls made so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl ContainerRuntime for MemoryRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerInstance>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(CoreError::Runtime("runtime unavailable".to_string()));
        }
        self.containers
            .lock()
            .map(|c| c.clone())
            .map_err(|_| CoreError::Internal("memory runtime lock poisoned".to_string()))
    }
}
