use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use super::*;

/// Persistent storage for the best brain found so far.
/// Every save replaces the previous brain as a whole.
pub trait BrainStore: Debug {
    fn save(&mut self, brain: &SavedBrain) -> Result<()>;
    fn load(&self) -> Result<SavedBrain>;
}

/// Stores the brain as pretty printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}
impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl BrainStore for JsonFileStore {
    fn save(&mut self, brain: &SavedBrain) -> Result<()> {
        let json = serde_json::to_string_pretty(brain).map_err(|e| Error::write(&self.path, e))?;
        // NOTE: write next to the target and rename so readers never observe a partial file
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|e| Error::write(&staging, e))?;
        fs::rename(&staging, &self.path).map_err(|e| Error::write(&self.path, e))
    }

    fn load(&self) -> Result<SavedBrain> {
        let json = fs::read_to_string(&self.path).map_err(|e| Error::read(&self.path, e))?;
        serde_json::from_str(&json).map_err(|e| Error::read(&self.path, e))
    }
}

/// Keeps the brain in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    brain: Option<SavedBrain>,
    saves: usize,
}
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brain(brain: SavedBrain) -> Self {
        Self { brain: Some(brain), saves: 0 }
    }

    pub fn brain(&self) -> Option<&SavedBrain> {
        self.brain.as_ref()
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves
    }
}
impl BrainStore for MemoryStore {
    fn save(&mut self, brain: &SavedBrain) -> Result<()> {
        self.brain = Some(brain.clone());
        self.saves += 1;
        Ok(())
    }

    fn load(&self) -> Result<SavedBrain> {
        self.brain.clone().ok_or_else(|| Error::read("<memory>", "no brain has been saved"))
    }
}
