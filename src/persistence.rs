//! Best-effort storage of the last submitted form. Failures are logged, never returned.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{info, warn};

use crate::models::LessonRequest;

pub trait FormStore: Send + Sync {
    fn load(&self) -> Option<LessonRequest>;
    fn save(&self, form: &LessonRequest);
    fn clear(&self);
}

/// Keeps the form as one flat JSON object in a single file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn discard(&self, reason: &str) {
        warn!("Discarding saved form at {}: {}", self.path.display(), reason);
        self.clear();
    }
}

impl FormStore for JsonFileStore {
    fn load(&self) -> Option<LessonRequest> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read saved form {}: {}", self.path.display(), e);
                return None;
            }
        };
        let value: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                self.discard(&e.to_string());
                return None;
            }
        };
        if !value.as_object().is_some_and(|o| o.contains_key("subject")) {
            self.discard("not a form object");
            return None;
        }
        match serde_json::from_value(value) {
            Ok(form) => {
                info!("Restored saved form from {}", self.path.display());
                Some(form)
            }
            Err(e) => {
                self.discard(&e.to_string());
                None
            }
        }
    }

    fn save(&self, form: &LessonRequest) {
        let result = serde_json::to_vec_pretty(form)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&self.path, bytes));
        if let Err(e) = result {
            warn!("Could not save form to {}: {}", self.path.display(), e);
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not clear saved form {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::tests::fractions_request;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// In-memory store for controller tests.
    #[derive(Default)]
    pub struct MemoryStore {
        pub slot: Mutex<Option<LessonRequest>>,
    }

    impl FormStore for MemoryStore {
        fn load(&self) -> Option<LessonRequest> { self.slot.lock().clone() }
        fn save(&self, form: &LessonRequest) { *self.slot.lock() = Some(form.clone()); }
        fn clear(&self) { *self.slot.lock() = None; }
    }

    #[test]
    fn save_then_load_restores_form() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("form.json"));
        let form = LessonRequest { methodology: Some("Flipped classroom".into()), ..fractions_request() };
        store.save(&form);
        assert_eq!(store.load(), Some(form));
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn shape_invalid_data_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.json");
        for bad in ["[1,2,3]", "{\"gradeLevel\":\"5\"}", "not json", "{\"subject\":\"Math\",\"duration\":\"long\"}"] {
            std::fs::write(&path, bad).unwrap();
            let store = JsonFileStore::new(&path);
            assert_eq!(store.load(), None, "{bad}");
            assert!(!path.exists(), "{bad} should have been removed");
        }
    }

    #[test]
    fn partial_form_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.json");
        std::fs::write(&path, "{\"subject\":\"History\"}").unwrap();
        let form = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(form.subject, "History");
        assert_eq!(form.duration, 45);
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("form.json"));
        store.save(&fractions_request());
        store.clear();
        store.clear();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_to_unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("missing").join("form.json"));
        store.save(&fractions_request());
        assert_eq!(store.load(), None);
    }
}
