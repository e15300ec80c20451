//! Keeps the canonical filter query across runs, the way a bookmarked
//! address survives a reload.

use std::fs;
use std::path::Path;

use console_engine::AtomicFileWriter;
use console_logging::{console_error, console_info, console_warn};
use serde::{Deserialize, Serialize};

const STATE_FILENAME: &str = ".console_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
struct PersistedState {
    query: String,
}

/// Last saved query, or empty when there is none or it cannot be read.
pub(crate) fn load_query(state_dir: &Path) -> String {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return String::new(),
        Err(err) => {
            console_warn!("Failed to read persisted state from {:?}: {}", path, err);
            return String::new();
        }
    };

    match ron::from_str::<PersistedState>(&content) {
        Ok(state) => {
            console_info!("Restored query {:?} from {:?}", state.query, path);
            state.query
        }
        Err(err) => {
            console_warn!("Failed to parse persisted state from {:?}: {}", path, err);
            String::new()
        }
    }
}

pub(crate) fn save_query(state_dir: &Path, query: &str) {
    let state = PersistedState {
        query: query.to_string(),
    };
    let content = match ron::ser::to_string_pretty(&state, ron::ser::PrettyConfig::new()) {
        Ok(text) => text,
        Err(err) => {
            console_error!("Failed to serialize persisted state: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(state_dir.to_path_buf());
    if let Err(err) = writer.write(STATE_FILENAME, content.as_bytes()) {
        console_error!("Failed to write persisted state to {:?}: {}", state_dir, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn query_survives_restart() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_query(temp.path()), "");

        save_query(temp.path(), "tipo=boleta&search=F001");
        assert_eq!(load_query(temp.path()), "tipo=boleta&search=F001");

        save_query(temp.path(), "");
        assert_eq!(load_query(temp.path()), "");
    }

    #[test]
    fn corrupt_state_is_ignored() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(STATE_FILENAME), "not ron at all").unwrap();
        assert_eq!(load_query(temp.path()), "");
    }

    #[test]
    fn missing_dir_is_created_on_save() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("downloads");
        save_query(&dir, "page=2");
        assert_eq!(load_query(&dir), "page=2");
    }
}
