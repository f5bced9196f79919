use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

const TEXT_SUFFIX: &str = ".txt";

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;
        Ok(content)
    }

    /// Text files directly inside `dir`, ordered by file name.
    pub fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.context(format!("Failed to list directory: {:?}", dir))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_text = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(TEXT_SUFFIX));
            if is_text {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}
