use thiserror::Error;

/// Neither an explicit project nor an active session project was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "No project specified and no active project is set. Call list_projects to see the projects you can access, then set_active_project to select one (or pass `project` explicitly)."
)]
pub struct MissingProjectError;

/// Compute the effective target project.
///
/// A non-blank explicit argument always wins, so a single call can target
/// another project without touching the session.
pub fn resolve_project(
    explicit: Option<&str>,
    active: Option<&str>,
) -> Result<String, MissingProjectError> {
    non_blank(explicit)
        .or_else(|| non_blank(active))
        .map(str::to_string)
        .ok_or(MissingProjectError)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_project_wins_over_session() {
        assert_eq!(
            resolve_project(Some("override"), Some("active")),
            Ok("override".to_string())
        );
        assert_eq!(resolve_project(Some("override"), None), Ok("override".to_string()));
    }

    #[test]
    fn session_project_used_when_explicit_is_absent_or_blank() {
        assert_eq!(resolve_project(None, Some("active")), Ok("active".to_string()));
        assert_eq!(resolve_project(Some(""), Some("active")), Ok("active".to_string()));
        assert_eq!(resolve_project(Some("  "), Some("active")), Ok("active".to_string()));
    }

    #[test]
    fn nothing_available_is_missing_project() {
        assert_eq!(resolve_project(None, None), Err(MissingProjectError));
        assert_eq!(resolve_project(Some(""), Some("")), Err(MissingProjectError));
    }

    #[test]
    fn missing_project_message_points_to_selection_tools() {
        let message = MissingProjectError.to_string();
        assert!(message.contains("list_projects"));
        assert!(message.contains("set_active_project"));
    }
}
