use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported document type: {0}")]
    UnsupportedFormat(String),
    #[error("Document is {size} bytes, above the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for ExtractionError {
    fn from(e: lopdf::Error) -> Self {
        Self::Pdf(e.to_string())
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" | "markdown" => Some(Self::PlainText),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Seekable byte stream a document is read from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

#[derive(Debug, Clone)]
enum Content {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// One input file belonging to an entity.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    content: Content,
}

impl SourceDocument {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        Self {
            name,
            content: Content::File(path),
        }
    }

    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content: Content::Memory(bytes.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> std::io::Result<u64> {
        match &self.content {
            Content::File(path) => Ok(std::fs::metadata(path)?.len()),
            Content::Memory(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Checks the file type and size before any extraction is attempted.
    pub fn admit(&self, max_size: u64) -> ExtractionResult<DocumentFormat> {
        let format = DocumentFormat::from_name(&self.name)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(self.name.clone()))?;

        let size = self.size()?;
        if size > max_size {
            return Err(ExtractionError::TooLarge {
                size,
                limit: max_size,
            });
        }

        Ok(format)
    }

    pub fn open(&self) -> std::io::Result<Box<dyn ReadSeek>> {
        match &self.content {
            Content::File(path) => Ok(Box::new(std::fs::File::open(path)?)),
            Content::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_name() {
        assert_eq!(DocumentFormat::from_name("Renstra 2024.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_name("catatan.md"), Some(DocumentFormat::PlainText));
        assert_eq!(DocumentFormat::from_name("laporan.docx"), None);
        assert_eq!(DocumentFormat::from_name("README"), None);
    }

    #[test]
    fn test_admission_rejects_unsupported_type() {
        let doc = SourceDocument::from_bytes("sotk.docx", b"PK".to_vec());
        assert!(matches!(doc.admit(1024), Err(ExtractionError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_admission_rejects_large_files() {
        let doc = SourceDocument::from_bytes("big.pdf", vec![0u8; 2048]);
        assert!(matches!(
            doc.admit(1024),
            Err(ExtractionError::TooLarge { size: 2048, limit: 1024 })
        ));
        assert_eq!(doc.admit(4096).unwrap(), DocumentFormat::Pdf);
    }

    #[test]
    fn test_file_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tupoksi.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"Tugas pokok")
            .unwrap();

        let doc = SourceDocument::from_path(&path);
        assert_eq!(doc.name(), "tupoksi.txt");
        assert_eq!(doc.admit(1024).unwrap(), DocumentFormat::PlainText);

        let mut text = String::new();
        doc.open().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "Tugas pokok");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let doc = SourceDocument::from_path("/nonexistent/dir/a.pdf");
        assert!(matches!(doc.admit(1024), Err(ExtractionError::Io(_))));
    }
}
