/// Session persistence: one pretty-printed JSON file per ranking session.
///
/// The host owns persistence between round trips; the core state is plain data.
use std::io;
use std::path::Path;

use tracing::debug;
use versus_core::SessionState;

/// Write the session, replacing any previous file only once the new one is complete.
pub fn save_session(path: &Path, state: &SessionState) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), comparisons = state.comparisons_made(), "session saved");
    Ok(())
}

/// Read a session and verify it before any operation can index into it.
pub fn load_session(path: &Path) -> io::Result<SessionState> {
    let content = std::fs::read_to_string(path)?;
    let state: SessionState = serde_json::from_str(&content)?;
    state
        .check()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug!(path = %path.display(), comparisons = state.comparisons_made(), "session loaded");
    Ok(state)
}
