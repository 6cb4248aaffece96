use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;
use week_engine::{EngineSettings, InMemoryRepository, RepositorySnapshot, WeekEngine};

/// On-disk layout of a store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub settings: EngineSettings,
    #[serde(flatten)]
    pub repository: RepositorySnapshot,
}

/// A JSON file holding settings and customizations.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the engine. A missing file is an empty store.
    pub fn open(&self) -> anyhow::Result<WeekEngine<InMemoryRepository>> {
        let file = if self.path.exists() {
            let raw = std::fs::read_to_string(&self.path)
                .with_context(|| format!("failed to read store {}", self.path.display()))?;
            serde_json::from_str::<StoreFile>(&raw)
                .with_context(|| format!("failed to parse store {}", self.path.display()))?
        } else {
            debug!(path = %self.path.display(), "store missing, starting empty");
            StoreFile::default()
        };

        Ok(WeekEngine::new(
            InMemoryRepository::from_snapshot(file.repository),
            file.settings,
        ))
    }

    pub fn save(&self, engine: &WeekEngine<InMemoryRepository>) -> anyhow::Result<()> {
        let file = StoreFile {
            settings: engine.settings().clone(),
            repository: engine.repository().snapshot(),
        };
        let json = serde_json::to_string_pretty(&file).context("failed to serialize store")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write store {}", self.path.display()))?;
        debug!(path = %self.path.display(), records = file.repository.customizations.len(), "store saved");
        Ok(())
    }
}
