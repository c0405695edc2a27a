//! Persistence hooks at the run boundaries
//!
//! The coordinator calls a [`RunStore`] only at run start (resume a thread,
//! load its history) and run end (append the records this run produced),
//! never mid-loop. Durable backends live behind this trait, outside the
//! core.

use std::collections::HashMap;
use std::sync::Mutex;

use plexus_core::{RunError, RunResult, UnitRecord};
use uuid::Uuid;

/// Collaborator persisting run threads and their record history.
pub trait RunStore: Send + Sync {
    /// Resume the thread for `session_id`, or create a new one. Returns the
    /// thread identifier.
    fn create_or_resume_thread(&self, session_id: Option<&str>) -> RunResult<String>;

    /// Load the records previously appended to a thread.
    fn load_history(&self, thread_id: &str) -> RunResult<Vec<UnitRecord>>;

    /// Append the records a run produced. Called once per run with only the
    /// records new since the run's baseline.
    fn append_records(&self, thread_id: &str, records: &[UnitRecord]) -> RunResult<()>;
}

/// Non-durable, in-process `RunStore` for tests and development.
#[derive(Default)]
pub struct InMemoryRunStore {
    threads: Mutex<HashMap<String, Vec<UnitRecord>>>,
}

impl InMemoryRunStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known threads.
    pub fn thread_count(&self) -> usize {
        self.threads.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl RunStore for InMemoryRunStore {
    fn create_or_resume_thread(&self, session_id: Option<&str>) -> RunResult<String> {
        let thread_id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut threads = self.threads.lock().map_err(|_| RunError::Persistence {
            operation: "create_or_resume_thread".to_string(),
            reason: "thread table lock poisoned".to_string(),
        })?;
        threads.entry(thread_id.clone()).or_default();
        Ok(thread_id)
    }

    fn load_history(&self, thread_id: &str) -> RunResult<Vec<UnitRecord>> {
        let threads = self.threads.lock().map_err(|_| RunError::Persistence {
            operation: "load_history".to_string(),
            reason: "thread table lock poisoned".to_string(),
        })?;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }

    fn append_records(&self, thread_id: &str, records: &[UnitRecord]) -> RunResult<()> {
        let mut threads = self.threads.lock().map_err(|_| RunError::Persistence {
            operation: "append_records".to_string(),
            reason: "thread table lock poisoned".to_string(),
        })?;
        threads
            .entry(thread_id.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_core::UnitName;
    use serde_json::json;

    #[test]
    fn resume_by_session_id_is_stable() {
        let store = InMemoryRunStore::new();
        let first = store.create_or_resume_thread(Some("sess")).unwrap();
        let second = store.create_or_resume_thread(Some("sess")).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.thread_count(), 1);
    }

    #[test]
    fn anonymous_threads_get_fresh_ids() {
        let store = InMemoryRunStore::new();
        let first = store.create_or_resume_thread(None).unwrap();
        let second = store.create_or_resume_thread(None).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn appended_records_come_back_as_history() {
        let store = InMemoryRunStore::new();
        let thread = store.create_or_resume_thread(Some("sess")).unwrap();

        let record = UnitRecord::new(UnitName::new_unchecked("u"), json!("out"));
        store.append_records(&thread, &[record.clone()]).unwrap();

        let history = store.load_history(&thread).unwrap();
        assert_eq!(history, vec![record]);
    }
}
