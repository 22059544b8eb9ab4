use std::sync::Mutex;

/// In-process active project selection.
///
/// `set` performs no validation; callers verify the project first. The value
/// is never cleared once set and lives as long as the process.
#[derive(Debug, Default)]
pub struct Session {
    active_project: Mutex<Option<String>>,
}

impl Session {
    /// Seed the session from a configured default. Blank values mean "no
    /// active project".
    pub fn new(default_project: Option<String>) -> Self {
        let active = default_project
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Self {
            active_project: Mutex::new(active),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.active_project
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the active project and return the previous one.
    pub fn set(&self, project_id: impl Into<String>) -> Option<String> {
        let mut guard = self.active_project.lock().unwrap_or_else(|e| e.into_inner());
        guard.replace(project_id.into())
    }
}
