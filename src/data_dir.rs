use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The ANSWERBOX_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/answerbox/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("ANSWERBOX_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("answerbox")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config("could not determine XDG data home directory".into())
                })?
        };

        std::fs::create_dir_all(&root).map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The persisted feedback collection (a single JSON array).
    pub fn feedback_file(&self) -> PathBuf {
        self.root.join("feedback.json")
    }

    /// Directory holding registered named datasets, one JSON file each.
    pub fn datasets_dir(&self) -> Result<PathBuf> {
        let path = self.root.join("datasets");
        std::fs::create_dir_all(&path).map_err(|_| Error::DataDir(path.clone()))?;
        Ok(path)
    }
}
