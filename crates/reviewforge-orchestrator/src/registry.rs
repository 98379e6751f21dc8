use crate::catalog::default_catalog;
use reviewforge_core::{AgentDescriptor, ReviewForgeError, ReviewForgeResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Source of agent capability descriptors.
///
/// The engine only reads from it; owners may refresh it between runs.
pub trait AgentRegistry: Send + Sync {
    /// Snapshot of every known descriptor, ordered by id.
    fn descriptors(&self) -> Vec<AgentDescriptor>;
}

/// In-memory registry keyed by agent id.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    agents: BTreeMap<String, AgentDescriptor>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    agents: Vec<AgentDescriptor>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`default_catalog`].
    pub fn with_default_catalog() -> Self {
        Self::from_descriptors(default_catalog())
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = AgentDescriptor>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        registry
    }

    /// Parse a TOML document with an `[[agents]]` array.
    pub fn from_toml_str(raw: &str) -> ReviewForgeResult<Self> {
        let file: CatalogFile = toml::from_str(raw)
            .map_err(|e| ReviewForgeError::Registry(format!("Invalid agent catalog: {e}")))?;
        Ok(Self::from_descriptors(file.agents))
    }

    /// Parse a JSON array of descriptors.
    pub fn from_json_str(raw: &str) -> ReviewForgeResult<Self> {
        let agents: Vec<AgentDescriptor> = serde_json::from_str(raw)?;
        Ok(Self::from_descriptors(agents))
    }

    /// Load a catalog file; `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> ReviewForgeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let registry = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw)?,
            _ => Self::from_toml_str(&raw)?,
        };
        info!(path = %path.display(), agents = registry.len(), "Loaded agent catalog");
        Ok(registry)
    }

    /// Add or replace a descriptor.
    pub fn register(&mut self, descriptor: AgentDescriptor) {
        if descriptor.id.trim().is_empty() {
            warn!("Ignoring agent descriptor with empty id");
            return;
        }
        if self.agents.contains_key(&descriptor.id) {
            warn!(agent_id = %descriptor.id, "Replacing existing agent descriptor");
        }
        self.agents.insert(descriptor.id.clone(), descriptor);
    }

    pub fn get(&self, id: &str) -> Option<&AgentDescriptor> {
        self.agents.get(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl AgentRegistry for StaticRegistry {
    fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.agents.values().cloned().collect()
    }
}
