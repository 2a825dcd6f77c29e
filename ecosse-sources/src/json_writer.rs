use ecosse_core::context::LimitedDataContext;
use ecosse_core::errors::{EcosseError, EcosseResult};
use ecosse_core::record::SimulationCellRecord;
use ecosse_core::writer::CellWriter;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const CONTEXT_FILE: &str = "context.json";
pub const CELL_FILE: &str = "cell.json";

/// Writes each cell to `<study_dir>/<id>/cell.json`.
///
/// The shared context goes to `<study_dir>/context.json` when a batch starts.
/// Two identifiers that reduce to the same directory name within a batch are an error
/// rather than one record replacing the other.
#[derive(Debug)]
pub struct JsonCellWriter {
    study_dir: PathBuf,
    /// Directory name to the identifier written there in this batch.
    claimed: Mutex<HashMap<String, String>>,
}

impl JsonCellWriter {
    pub fn new(study_dir: impl Into<PathBuf>) -> Self {
        Self {
            study_dir: study_dir.into(),
            claimed: Mutex::new(HashMap::new()),
        }
    }

    pub fn study_dir(&self) -> &Path {
        &self.study_dir
    }

    /// Directory for one coordinate.
    pub fn cell_dir(&self, id: &str) -> PathBuf {
        self.study_dir.join(directory_name(id))
    }

    /// Reserve the directory for `id`, failing if another identifier already holds it.
    fn claim(&self, id: &str) -> EcosseResult<PathBuf> {
        let name = directory_name(id);
        let mut claimed = self
            .claimed
            .lock()
            .map_err(|_| EcosseError::Error("cell directory registry is poisoned".to_string()))?;
        match claimed.get(&name) {
            Some(owner) if owner != id => {
                return Err(EcosseError::Error(format!(
                    "cells '{owner}' and '{id}' both map to directory {name}"
                )));
            }
            Some(_) => {}
            None => {
                claimed.insert(name.clone(), id.to_string());
            }
        }
        Ok(self.study_dir.join(name))
    }
}

/// Identifiers come from user tables; keep them to a single safe path component.
fn directory_name(id: &str) -> String {
    let name: String = id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.as_str() {
        "" | "." | ".." => format!("cell_{}", name.len()),
        _ => name,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> EcosseResult<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| EcosseError::Error(format!("failed to serialise {}: {e}", path.display())))?;
    std::fs::write(path, content)?;
    Ok(())
}

impl CellWriter for JsonCellWriter {
    fn prepare(&self, context: &LimitedDataContext) -> EcosseResult<()> {
        self.claimed
            .lock()
            .map_err(|_| EcosseError::Error("cell directory registry is poisoned".to_string()))?
            .clear();
        std::fs::create_dir_all(&self.study_dir)?;
        write_json(&self.study_dir.join(CONTEXT_FILE), context)
    }

    fn write(
        &self,
        _context: &LimitedDataContext,
        record: &SimulationCellRecord,
    ) -> EcosseResult<()> {
        let dir = self.claim(&record.coordinate.id)?;
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(CELL_FILE);
        write_json(&path, record)?;
        debug!(id = %record.coordinate.id, path = %path.display(), "Wrote cell");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_names() {
        assert_eq!(directory_name("site-1"), "site-1");
        assert_eq!(directory_name("a/b c"), "a_b_c");
        assert_eq!(directory_name("../x"), ".._x");
        assert_eq!(directory_name(".."), "cell_2");
        assert_eq!(directory_name("  "), "cell_0");
    }

    #[test]
    fn cell_dirs_stay_in_study_dir() {
        let writer = JsonCellWriter::new("/sims/study");
        assert_eq!(writer.cell_dir("a/b"), PathBuf::from("/sims/study/a_b"));
    }

    #[test]
    fn colliding_ids_are_rejected() {
        let writer = JsonCellWriter::new("/sims/study");
        assert_eq!(writer.claim("a/b").unwrap(), PathBuf::from("/sims/study/a_b"));
        // Rewriting the same cell is allowed
        assert!(writer.claim("a/b").is_ok());

        let err = writer.claim("a_b").unwrap_err();
        assert!(err.to_string().contains("'a/b' and 'a_b'"));
        assert!(writer.claim("a-b").is_ok());
    }
}
