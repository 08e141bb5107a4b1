//! Durable layout of the signature store.
//!
//! Three independently durable artifacts under the data directory:
//!
//! - `registry.json`: identity list with stable labels and the
//!   append-only label counter;
//! - `samples/<label>.bin`: the identity's normalized face samples;
//! - `model.bin`: the trained classifier blob.
//!
//! The model blob is a cache of the samples. A missing or unreadable
//! blob is never an error here: the engine retrains from the samples
//! at startup. Loading ignores sample files whose label is not in the
//! registry, so a half-committed enrollment (sample file written,
//! registry not) is invisible after a crash.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use facemark_core::{FaceSample, LbphModel};

use crate::error::EngineError;
use crate::registry::IdentityRegistry;

const REGISTRY_FILE: &str = "registry.json";
const MODEL_FILE: &str = "model.bin";
const SAMPLES_DIR: &str = "samples";

pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn ensure_layout(&self) -> Result<(), EngineError> {
        fs::create_dir_all(self.root.join(SAMPLES_DIR))?;
        Ok(())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(MODEL_FILE)
    }

    pub fn sample_path(&self, label: u32) -> PathBuf {
        self.root.join(SAMPLES_DIR).join(format!("{label}.bin"))
    }

    pub fn load_registry(&self) -> Result<IdentityRegistry, EngineError> {
        let path = self.registry_path();
        if !path.exists() {
            return Ok(IdentityRegistry::new());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_registry(&self, registry: &IdentityRegistry) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(registry)?;
        fs::write(self.registry_path(), json)?;
        Ok(())
    }

    /// Load the sample collections for every registered identity.
    ///
    /// A registered identity whose sample file is gone is kept with an
    /// empty collection and logged; it simply cannot match until
    /// re-enrolled.
    pub fn load_samples(
        &self,
        registry: &IdentityRegistry,
    ) -> Result<HashMap<u32, Vec<FaceSample>>, EngineError> {
        let mut samples = HashMap::with_capacity(registry.len());
        for entry in registry.entries() {
            let path = self.sample_path(entry.label);
            if !path.exists() {
                tracing::warn!(
                    identity = %entry.identity,
                    label = entry.label,
                    "sample file missing for registered identity"
                );
                samples.insert(entry.label, Vec::new());
                continue;
            }
            let bytes = fs::read(path)?;
            samples.insert(entry.label, bincode::deserialize(&bytes)?);
        }
        Ok(samples)
    }

    pub fn save_samples(&self, label: u32, samples: &[FaceSample]) -> Result<(), EngineError> {
        let bytes = bincode::serialize(samples)?;
        fs::write(self.sample_path(label), bytes)?;
        Ok(())
    }

    pub fn remove_samples(&self, label: u32) -> Result<(), EngineError> {
        match fs::remove_file(self.sample_path(label)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the persisted model blob. Missing or unreadable blobs give
    /// `None`; the caller retrains from samples instead.
    pub fn load_model(&self) -> Option<LbphModel> {
        let path = self.model_path();
        if !path.exists() {
            return None;
        }
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "cannot read model blob");
                return None;
            }
        };
        match bincode::deserialize(&bytes) {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "model blob is corrupt");
                None
            }
        }
    }

    pub fn save_model(&self, model: &LbphModel) -> Result<(), EngineError> {
        let bytes = bincode::serialize(model)?;
        fs::write(self.model_path(), bytes)?;
        Ok(())
    }

    pub fn remove_model(&self) -> Result<(), EngineError> {
        match fs::remove_file(self.model_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemark_core::FaceSample;
    use tempfile::TempDir;

    fn sample(value: u8) -> FaceSample {
        FaceSample::new(8, 8, vec![value; 64]).unwrap()
    }

    fn store() -> (TempDir, StorePaths) {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path().join("store"));
        paths.ensure_layout().unwrap();
        (dir, paths)
    }

    #[test]
    fn test_registry_roundtrip() {
        let (_dir, paths) = store();
        let mut registry = IdentityRegistry::new();
        registry.register("T001");
        paths.save_registry(&registry).unwrap();
        assert_eq!(paths.load_registry().unwrap(), registry);
    }

    #[test]
    fn test_missing_registry_is_empty() {
        let (_dir, paths) = store();
        assert!(paths.load_registry().unwrap().is_empty());
    }

    #[test]
    fn test_samples_roundtrip_per_label() {
        let (_dir, paths) = store();
        let mut registry = IdentityRegistry::new();
        let label = registry.register("T001").unwrap();
        paths.save_samples(label, &[sample(10), sample(20)]).unwrap();

        let loaded = paths.load_samples(&registry).unwrap();
        assert_eq!(loaded[&label].len(), 2);
        assert_eq!(loaded[&label][1], sample(20));
    }

    #[test]
    fn test_load_samples_ignores_unregistered_labels() {
        let (_dir, paths) = store();
        // orphan file from a half-committed enrollment
        paths.save_samples(42, &[sample(1)]).unwrap();
        let loaded = paths.load_samples(&IdentityRegistry::new()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_missing_model_blob_is_none() {
        let (_dir, paths) = store();
        assert!(paths.load_model().is_none());
    }

    #[test]
    fn test_corrupt_model_blob_is_none() {
        let (_dir, paths) = store();
        fs::write(paths.model_path(), b"not a model").unwrap();
        assert!(paths.load_model().is_none());
    }

    #[test]
    fn test_model_roundtrip() {
        let (_dir, paths) = store();
        let a = sample(10);
        let model = facemark_core::LbphModel::train(&[(0, &a)]).unwrap();
        paths.save_model(&model).unwrap();
        let restored = paths.load_model().unwrap();
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, paths) = store();
        paths.remove_model().unwrap();
        paths.remove_samples(7).unwrap();
    }
}
