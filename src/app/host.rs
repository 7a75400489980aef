use super::config::Config;
use super::plugin::OutputPlugin;
use crate::domain::{FlushStatus, ForwarderError, RecordMap};
use crate::sender::BatchClient;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;

/// Opaque token identifying one registered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginHandle(usize);

impl PluginHandle {
    pub fn id(self) -> usize {
        self.0
    }
}

/// Owns every configured output and routes host calls by handle.
pub struct PluginHost<C> {
    plugins: HashMap<usize, OutputPlugin<C>>,
    next_id: usize,
}

impl<C: BatchClient> PluginHost<C> {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            next_id: 0,
        }
    }

    /// Registers an output built from `config`, returning its handle.
    pub fn register(&mut self, config: &Config, client: C) -> Result<PluginHandle, ForwarderError> {
        let id = self.next_id;
        let plugin = OutputPlugin::from_config(id, config, client)?;
        Ok(self.insert(plugin))
    }

    /// Registers an already assembled output under a fresh handle.
    pub fn insert(&mut self, plugin: OutputPlugin<C>) -> PluginHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.plugins.insert(id, plugin);
        info!(plugin_id = id, "Registered output");
        PluginHandle(id)
    }

    pub fn get(&self, handle: PluginHandle) -> Option<&OutputPlugin<C>> {
        self.plugins.get(&handle.0)
    }

    fn plugin_mut(&mut self, handle: PluginHandle) -> Result<&mut OutputPlugin<C>, ForwarderError> {
        self.plugins
            .get_mut(&handle.0)
            .ok_or(ForwarderError::UnknownHandle(handle.0))
    }

    pub async fn add_record(
        &mut self,
        handle: PluginHandle,
        record: RecordMap,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<FlushStatus, ForwarderError> {
        Ok(self.plugin_mut(handle)?.add_record(record, timestamp).await)
    }

    pub async fn flush(&mut self, handle: PluginHandle) -> Result<FlushStatus, ForwarderError> {
        Ok(self.plugin_mut(handle)?.flush().await)
    }

    /// Flushes every output, reporting the worst status seen.
    pub async fn flush_all(&mut self) -> FlushStatus {
        let mut worst = FlushStatus::Ok;
        for plugin in self.plugins.values_mut() {
            worst = match (worst, plugin.flush().await) {
                (FlushStatus::Error, _) | (_, FlushStatus::Error) => FlushStatus::Error,
                (FlushStatus::Retry, _) | (_, FlushStatus::Retry) => FlushStatus::Retry,
                _ => FlushStatus::Ok,
            };
        }
        worst
    }

    pub fn remove(&mut self, handle: PluginHandle) -> Option<OutputPlugin<C>> {
        self.plugins.remove(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<C: BatchClient> Default for PluginHost<C> {
    fn default() -> Self {
        Self::new()
    }
}
