//! File-persisted simulated backend for running the CLI without a server.
//!
//! The whole backend state lives in one JSON file in the data directory and
//! is shared by every workspace, the same way a real server would be.

use anyhow::{Context, Result};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use stint_core::{
    adapters::outbound::memory::{BackendPolicy, BackendState, InMemoryBackend},
    domain::ports::outbound::Clock,
};

pub struct DevBackendFile {
    path: PathBuf,
}

impl DevBackendFile {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("dev_backend.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, clock: Arc<dyn Clock>, policy: BackendPolicy) -> Result<InMemoryBackend> {
        if !self.path.exists() {
            return Ok(InMemoryBackend::new(clock).with_policy(policy));
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read dev backend at {}", self.path.display()))?;
        let state: BackendState = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse dev backend at {}", self.path.display()))?;
        Ok(InMemoryBackend::from_state(state, clock).with_policy(policy))
    }

    pub fn save(&self, backend: &InMemoryBackend) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&backend.export())?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write dev backend at {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stint_core::{
        adapters::outbound::clock::ManualClock,
        domain::{models::NewRecord, ports::outbound::TimerBackend},
    };
    use time::macros::datetime;

    #[tokio::test]
    async fn running_timer_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = DevBackendFile::in_dir(dir.path());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(datetime!(2024-03-01 09:00 UTC)));

        let backend = file.load(clock.clone(), BackendPolicy::default()).unwrap();
        let id = backend
            .create_record(&NewRecord::new("Persisted", 2))
            .await
            .unwrap();
        backend.start_timer(id).await.unwrap();
        file.save(&backend).unwrap();

        let reloaded = file.load(clock, BackendPolicy::default()).unwrap();
        assert_eq!(reloaded.running_record(), Some(id));
        assert!(file.path().exists());
    }
}
