// src/storage.rs - JSON-file result store keyed by animal

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use parking_lot::Mutex;

use crate::errors::Result;
use crate::wire::AnalysisResultRecord;

/// Durable store of the latest analysis result per animal
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    results: Mutex<BTreeMap<String, AnalysisResultRecord>>,
}

impl ResultStore {
    /// Open the store at `path`, starting empty when the file does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let results = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            results: Mutex::new(results),
        })
    }

    fn save(&self, results: &BTreeMap<String, AnalysisResultRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(results)?)?;
        Ok(())
    }

    /// Persist `updated` and only then make it the in-memory state
    fn commit(
        &self,
        results: &mut BTreeMap<String, AnalysisResultRecord>,
        updated: BTreeMap<String, AnalysisResultRecord>,
    ) -> Result<()> {
        self.save(&updated)?;
        *results = updated;
        Ok(())
    }

    /// Record a run, replacing any earlier run for the same animal
    pub fn record_analysis(&self, record: AnalysisResultRecord) -> Result<()> {
        let mut results = self.results.lock();
        info!(
            "Recording {} images for animal {}",
            record.images.len(),
            record.animal_id
        );
        let mut updated = results.clone();
        updated.insert(record.animal_id.clone(), record);
        self.commit(&mut results, updated)
    }

    pub fn results(&self) -> Vec<AnalysisResultRecord> {
        self.results.lock().values().cloned().collect()
    }

    pub fn result_for_animal(&self, animal_id: &str) -> Option<AnalysisResultRecord> {
        self.results.lock().get(animal_id).cloned()
    }

    pub fn clear_results(&self) -> Result<()> {
        let mut results = self.results.lock();
        self.commit(&mut results, BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(animal_id: &str, generated_at: &str) -> AnalysisResultRecord {
        AnalysisResultRecord {
            animal_id: animal_id.to_string(),
            generated_at: generated_at.to_string(),
            images: Vec::new(),
        }
    }

    #[test]
    fn latest_run_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path().join("state.json")).unwrap();
        store.record_analysis(record("A1", "first")).unwrap();
        store.record_analysis(record("A1", "second")).unwrap();
        store.record_analysis(record("B2", "only")).unwrap();

        assert_eq!(store.results().len(), 2);
        assert_eq!(store.result_for_animal("A1").unwrap().generated_at, "second");
    }

    #[test]
    fn results_survive_reopen_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        {
            let store = ResultStore::open(&path).unwrap();
            store.record_analysis(record("A1", "t")).unwrap();
        }
        let store = ResultStore::open(&path).unwrap();
        assert!(store.result_for_animal("A1").is_some());

        store.clear_results().unwrap();
        assert!(ResultStore::open(&path).unwrap().results().is_empty());
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = ResultStore::open(&path).unwrap();
        store.record_analysis(record("A1", "kept")).unwrap();

        // A directory in place of the file makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.record_analysis(record("B2", "lost")).is_err());
        assert!(store.clear_results().is_err());
        assert_eq!(store.results().len(), 1);
        assert_eq!(store.result_for_animal("A1").unwrap().generated_at, "kept");
    }
}
