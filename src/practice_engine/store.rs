//! The progress store: single source of truth for [`UserProgress`], written through to a
//! storage backend after every mutation.
//!
//! Loading never fails. An absent record yields defaults; an unreadable one, or one that is
//! not a JSON object, is logged and replaced by defaults. Inside an object, a field that does
//! not parse falls back to its own default while the rest of the record is kept. The
//! streak-rollover rule runs once at load time.
//!
//! Mutations are applied to a copy and only become visible once the backend accepted the
//! write, so a failed save leaves the in-memory record as it was.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

use crate::practice_engine::{
    config::StoreConfig,
    error::StoreError,
    models::{ProgressUpdate, UserProgress},
};

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Durable home of the serialized record.
pub trait StorageBackend {
    /// The stored blob, or `None` if nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored blob. Readers must see either the old or the new blob, never a mix.
    fn write(&mut self, blob: &str) -> Result<(), StoreError>;
}

/// Keeps the blob in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    blob: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing blob (valid or not).
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self { blob: Some(blob.into()) }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.blob.clone())
    }

    fn write(&mut self, blob: &str) -> Result<(), StoreError> {
        self.blob = Some(blob.to_string());
        Ok(())
    }
}

/// One JSON file; writes go to a temp file that is renamed over the record.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(config: &StoreConfig) -> Self {
        Self { path: config.record_path() }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, blob: &str) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct ProgressStore<B: StorageBackend = MemoryBackend> {
    backend: B,
    progress: UserProgress,
}

impl ProgressStore<FileBackend> {
    /// Load the record from the file named by `config`.
    pub fn open(config: &StoreConfig) -> Self {
        Self::load(FileBackend::new(config))
    }
}

impl<B: StorageBackend> ProgressStore<B> {
    /// Load using the current local time for the streak rollover.
    pub fn load(backend: B) -> Self {
        Self::load_at(backend, Local::now())
    }

    /// Load with an explicit "now".
    pub fn load_at(backend: B, now: DateTime<Local>) -> Self {
        let mut progress = read_record(&backend);
        let repaired = progress.normalize();
        let rolled = progress.apply_streak_rollover(now.date_naive());
        if rolled {
            log::info!("[STREAK] reset: last practice {:?}", progress.last_practice_day());
        }

        let mut store = Self { backend, progress };
        if repaired || rolled {
            if let Err(e) = store.save() {
                log::warn!("[STORE] could not persist repaired record: {}", e);
            }
        }
        store
    }

    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Serialize the whole record and hand it to the backend in one write.
    pub fn save(&mut self) -> Result<(), StoreError> {
        write_record(&mut self.backend, &self.progress)
    }

    /// Shallow-merge `update` into the record and persist.
    pub fn update(&mut self, update: ProgressUpdate) -> Result<(), StoreError> {
        let mut next = self.progress.clone();
        next.apply(update);
        self.commit(next)
    }

    /// Mutate the record, restore invariants and persist.
    pub fn modify<T>(&mut self, f: impl FnOnce(&mut UserProgress) -> T) -> Result<T, StoreError> {
        let mut next = self.progress.clone();
        let out = f(&mut next);
        next.normalize();
        self.commit(next)?;
        Ok(out)
    }

    /// Count today as a practice day (streak increment rule).
    pub fn record_practice_start(&mut self) -> Result<bool, StoreError> {
        self.record_practice_start_at(Local::now())
    }

    /// Returns true if this was the first practice start of the calendar day.
    pub fn record_practice_start_at(&mut self, now: DateTime<Local>) -> Result<bool, StoreError> {
        let mut next = self.progress.clone();
        if !next.register_practice_day(now) {
            return Ok(false);
        }
        self.commit(next)?;
        log::info!("[STREAK] practice day {} streak:{}", now.date_naive(), self.progress.streak);
        Ok(true)
    }

    /// One answered question towards lifetime accuracy.
    pub fn record_answer(&mut self, correct: bool) -> Result<(), StoreError> {
        self.modify(|p| {
            p.total_attempts = p.total_attempts.saturating_add(1);
            if correct {
                p.total_correct = p.total_correct.saturating_add(1);
            }
        })
    }

    pub fn add_points(&mut self, points: u64) -> Result<(), StoreError> {
        if points == 0 {
            return Ok(());
        }
        self.modify(|p| p.total_points = p.total_points.saturating_add(points))
    }

    /// Simulated premium purchase; no transaction takes place.
    pub fn purchase_premium(&mut self) -> Result<(), StoreError> {
        let mut next = self.progress.clone();
        if next.activate_premium() {
            self.commit(next)?;
            log::info!("[STORE] premium activated");
        }
        Ok(())
    }

    /// Persist `next`, then make it the current record.
    fn commit(&mut self, next: UserProgress) -> Result<(), StoreError> {
        write_record(&mut self.backend, &next)?;
        self.progress = next;
        Ok(())
    }
}

fn write_record<B: StorageBackend>(backend: &mut B, progress: &UserProgress) -> Result<(), StoreError> {
    let json = serde_json::to_string(progress)?;
    backend.write(&json)
}

fn read_record<B: StorageBackend>(backend: &B) -> UserProgress {
    let blob = match backend.read() {
        Ok(Some(blob)) => blob,
        Ok(None) => return UserProgress::default(),
        Err(e) => {
            log::warn!("[STORE] read failed, using defaults: {}", e);
            return UserProgress::default();
        }
    };
    let fields = match serde_json::from_str::<Value>(&blob) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            log::warn!("[STORE] record is not an object, using defaults");
            return UserProgress::default();
        }
        Err(e) => {
            log::warn!("[STORE] corrupt record, using defaults: {}", e);
            return UserProgress::default();
        }
    };
    match serde_json::from_value(Value::Object(fields.clone())) {
        Ok(progress) => progress,
        Err(e) => {
            log::warn!("[STORE] record partly invalid ({}), keeping the fields that parse", e);
            salvage_fields(fields)
        }
    }
}

/// Keep every field that parses on its own; the rest take their defaults.
fn salvage_fields(fields: Map<String, Value>) -> UserProgress {
    let mut kept = Map::new();
    for (key, value) in fields {
        let mut candidate = kept.clone();
        candidate.insert(key.clone(), value);
        if serde_json::from_value::<UserProgress>(Value::Object(candidate.clone())).is_ok() {
            kept = candidate;
        } else {
            log::warn!("[STORE] dropping invalid field {}", key);
        }
    }
    serde_json::from_value(Value::Object(kept)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn blob_with_last_practice(at: DateTime<Local>, streak: u32) -> String {
        let progress = UserProgress {
            streak,
            total_points: 120,
            last_practice_date: Some(at.with_timezone(&Utc)),
            ..UserProgress::default()
        };
        serde_json::to_string(&progress).unwrap()
    }

    #[test]
    fn absent_record_loads_defaults() {
        let store = ProgressStore::load_at(MemoryBackend::new(), noon(2024, 5, 10));
        assert_eq!(store.progress(), &UserProgress::default());
        assert!(store.backend().blob().is_none());
    }

    #[test]
    fn corrupt_record_loads_defaults() {
        let store = ProgressStore::load_at(MemoryBackend::with_blob("{ not json"), noon(2024, 5, 10));
        assert_eq!(store.progress(), &UserProgress::default());
    }

    #[test]
    fn wrong_shape_loads_defaults() {
        let store = ProgressStore::load_at(MemoryBackend::with_blob("[1, 2, 3]"), noon(2024, 5, 10));
        assert_eq!(store.progress(), &UserProgress::default());
    }

    #[test]
    fn scalar_record_loads_defaults() {
        for blob in ["42", "\"progress\"", "null", "true"] {
            let store = ProgressStore::load_at(MemoryBackend::with_blob(blob), noon(2024, 5, 10));
            assert_eq!(store.progress(), &UserProgress::default(), "{blob}");
        }
    }

    #[test]
    fn out_of_range_table_keeps_rest_of_record() {
        let blob = r#"{"totalPoints": 4200, "masteredTables": [1, 2, 300], "arenaRating": 1600}"#;
        let store = ProgressStore::load_at(MemoryBackend::with_blob(blob), noon(2024, 5, 10));
        let p = store.progress();
        assert_eq!(p.total_points, 4200);
        assert_eq!(p.arena_rating, 1600);
        assert_eq!(p.mastered_tables.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn mistyped_field_falls_back_alone() {
        let blob = r#"{"totalPoints": 4200, "streak": "lots", "currentTable": 512, "isPremium": true}"#;
        let store = ProgressStore::load_at(MemoryBackend::with_blob(blob), noon(2024, 5, 10));
        let p = store.progress();
        assert_eq!(p.total_points, 4200);
        assert_eq!(p.streak, 0);
        assert_eq!(p.current_table, 1);
        assert!(p.is_premium);
    }

    /// Accepts a fixed number of writes, then reports a full disk.
    struct WritesLeft {
        left: u32,
        inner: MemoryBackend,
    }

    impl StorageBackend for WritesLeft {
        fn read(&self) -> Result<Option<String>, StoreError> {
            self.inner.read()
        }

        fn write(&mut self, blob: &str) -> Result<(), StoreError> {
            if self.left == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.left -= 1;
            self.inner.write(blob)
        }
    }

    #[test]
    fn failed_write_leaves_record_unchanged() {
        let now = noon(2024, 5, 10);
        let mut store = ProgressStore::load_at(WritesLeft { left: 1, inner: MemoryBackend::new() }, now);
        store.record_answer(true).unwrap();
        let before = store.progress().clone();

        assert!(matches!(store.record_answer(false), Err(StoreError::Io(_))));
        assert!(store.add_points(50).is_err());
        assert!(store.record_practice_start_at(now).is_err());
        assert!(store.purchase_premium().is_err());
        assert_eq!(store.progress(), &before);
        assert_eq!(store.progress().total_attempts, 1);
    }

    #[test]
    fn streak_survives_one_day_gap() {
        let now = noon(2024, 5, 10);
        let blob = blob_with_last_practice(now - Duration::days(1), 6);
        let store = ProgressStore::load_at(MemoryBackend::with_blob(blob), now);
        assert_eq!(store.progress().streak, 6);
        assert_eq!(store.progress().total_points, 120);
    }

    #[test]
    fn streak_resets_after_two_day_gap_and_is_persisted() {
        let now = noon(2024, 5, 10);
        let blob = blob_with_last_practice(now - Duration::days(2), 6);
        let store = ProgressStore::load_at(MemoryBackend::with_blob(blob), now);
        assert_eq!(store.progress().streak, 0);

        let reread = ProgressStore::load_at(store.into_backend(), now);
        assert_eq!(reread.progress().streak, 0);
        assert_eq!(reread.progress().total_points, 120);
    }

    #[test]
    fn update_merges_and_writes_through() {
        let mut store = ProgressStore::load_at(MemoryBackend::new(), noon(2024, 5, 10));
        store
            .update(ProgressUpdate { total_points: Some(55), ..ProgressUpdate::default() })
            .unwrap();
        let saved: UserProgress =
            serde_json::from_str(store.backend().blob().unwrap()).unwrap();
        assert_eq!(saved.total_points, 55);
        assert_eq!(saved.arena_rating, 1000);
    }

    #[test]
    fn practice_start_twice_same_day_changes_nothing() {
        let now = noon(2024, 5, 10);
        let mut store = ProgressStore::load_at(MemoryBackend::new(), now);
        assert!(store.record_practice_start_at(now).unwrap());
        let after_first = store.progress().clone();
        let first_blob = store.backend().blob().unwrap().to_string();

        assert!(!store.record_practice_start_at(now + Duration::hours(3)).unwrap());
        assert_eq!(store.progress(), &after_first);
        assert_eq!(store.backend().blob().unwrap(), first_blob);
        assert_eq!(store.progress().streak, 1);
    }

    #[test]
    fn record_answer_keeps_counters_consistent() {
        let mut store = ProgressStore::load_at(MemoryBackend::new(), noon(2024, 5, 10));
        store.record_answer(true).unwrap();
        store.record_answer(false).unwrap();
        assert_eq!(store.progress().total_attempts, 2);
        assert_eq!(store.progress().total_correct, 1);
    }

    #[test]
    fn premium_purchase_sets_sentinel() {
        let mut store = ProgressStore::load_at(MemoryBackend::new(), noon(2024, 5, 10));
        store.purchase_premium().unwrap();
        assert!(store.progress().is_premium);
        assert_eq!(store.progress().hearts, 999);
    }

    #[test]
    fn out_of_range_record_is_repaired_on_load() {
        let blob = r#"{"currentTable": 99, "arenaRating": 120, "masteredTables": [3, 77]}"#;
        let store = ProgressStore::load_at(MemoryBackend::with_blob(blob), noon(2024, 5, 10));
        let p = store.progress();
        assert_eq!(p.current_table, 12);
        assert_eq!(p.arena_rating, 800);
        assert_eq!(p.mastered_tables.iter().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let now = noon(2024, 5, 10);

        let mut store = ProgressStore::load_at(FileBackend::new(&config), now);
        store.add_points(30).unwrap();
        store.record_practice_start_at(now).unwrap();
        assert!(config.record_path().exists());
        assert!(!dir.path().join("mathAppProgress.json.tmp").exists());

        let reloaded = ProgressStore::load_at(FileBackend::new(&config), now);
        assert_eq!(reloaded.progress().total_points, 30);
        assert_eq!(reloaded.progress().streak, 1);
    }

    #[test]
    fn file_backend_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::at(dir.path().join("nested").join("progress.json"));
        assert!(backend.read().unwrap().is_none());
    }

    #[test]
    fn file_backend_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::at(dir.path().join("a").join("b").join("progress.json"));
        backend.write("{}").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("{}"));
    }
}
