//! Notation-backed files in the working directory (`.eclipserc`, `.env.*`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::file_notation::{Notation, NotationError, decode, encode};

/// A flat `KEY=VALUE` file, optionally written with a leading comment line.
#[derive(Debug, Clone)]
pub struct NotationFile {
    path: PathBuf,
    header: Option<String>,
}

impl NotationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header: None,
        }
    }

    /// Comment written as the first line. A leading `#` is added if missing.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        self.header = Some(if header.starts_with('#') {
            header
        } else {
            format!("# {header}")
        });
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists.
    pub fn find(&self) -> bool {
        self.path.is_file()
    }

    pub fn read(&self) -> Result<String, NotationError> {
        Ok(fs::read_to_string(&self.path)?)
    }

    pub fn read_notation(&self) -> Result<Notation, NotationError> {
        decode(&self.read()?)
    }

    pub fn read_into<T: DeserializeOwned>(&self) -> Result<T, NotationError> {
        crate::file_notation::from_notation(&self.read()?)
    }

    /// Replace the file contents with `record`.
    ///
    /// Written to a sibling temp file and renamed into place, so readers never
    /// observe a partial record.
    pub fn write(&self, record: &Notation) -> Result<(), NotationError> {
        let mut contents = String::new();
        if let Some(header) = &self.header {
            contents.push_str(header);
            contents.push('\n');
        }
        contents.push_str(&encode(record)?);

        let tmp = self.tmp_path();
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = record.len(), "Wrote notation file");
        Ok(())
    }

    /// Merge `update` into the existing record (or create the file).
    ///
    /// Keys already present keep their position; new keys are appended.
    pub fn create_or_update(&self, update: &Notation) -> Result<(), NotationError> {
        let mut record = if self.find() {
            self.read_notation()?
        } else {
            Notation::new()
        };
        for (key, value) in update {
            record.insert(key.clone(), value.clone());
        }
        self.write(&record)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    struct Marker {
        project: String,
        component: Option<String>,
    }

    #[test]
    fn test_find_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = NotationFile::new(dir.path().join(".eclipserc"));
        assert!(!file.find());
        assert!(file.read().is_err());
    }

    #[test]
    fn test_write_with_header_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = NotationFile::new(dir.path().join(".eclipserc")).with_header("autogenerated");

        let mut record = Notation::new();
        record.insert("PROJECT".into(), json!("p-1"));
        record.insert("COMPONENT".into(), json!("api"));
        file.write(&record).unwrap();

        assert_eq!(
            file.read().unwrap(),
            "# autogenerated\nPROJECT=p-1\nCOMPONENT=api\n"
        );
        let marker: Marker = file.read_into().unwrap();
        assert_eq!(marker.project, "p-1");
        assert_eq!(marker.component.as_deref(), Some("api"));
        assert!(!dir.path().join(".eclipserc.tmp").exists());
    }

    #[test]
    fn test_create_or_update_merges() {
        let dir = tempfile::tempdir().unwrap();
        let file = NotationFile::new(dir.path().join(".env.staging"));

        let mut first = Notation::new();
        first.insert("A".into(), json!("1x"));
        first.insert("B".into(), json!("keep"));
        file.create_or_update(&first).unwrap();

        let mut second = Notation::new();
        second.insert("A".into(), json!("2x"));
        second.insert("C".into(), json!("new"));
        file.create_or_update(&second).unwrap();

        assert_eq!(file.read().unwrap(), "A=2x\nB=keep\nC=new\n");
    }
}
