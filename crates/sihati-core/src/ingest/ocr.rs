use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;

use crate::config::ExtractionConfig;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("{program} failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Rasterization produced no pages")]
    NoPages,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OcrResult<T> = Result<T, OcrError>;

/// Image-based text recognition over a whole PDF.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn is_available(&self) -> bool;

    /// Recognized text for each page, in page order.
    async fn recognize_pages(&self, pdf: &[u8]) -> OcrResult<Vec<String>>;
}

#[derive(Debug)]
struct CommandOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

async fn run<S, I, A>(program: S, args: I) -> OcrResult<CommandOutput>
where
    S: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let name = program.as_ref().to_string_lossy().to_string();

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OcrError::CommandNotFound(name.clone()),
            _ => OcrError::Io(e),
        })?;

    let output = CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if !output.status.success() {
        return Err(OcrError::CommandFailed {
            program: name,
            code: output.status.code(),
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}

/// Rasterizes pages with Poppler's `pdftoppm` and recognizes them with the
/// `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tesseract: PathBuf,
    pdftoppm: PathBuf,
    languages: String,
    dpi: u32,
}

impl TesseractOcr {
    #[must_use]
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            tesseract: config.tesseract_cmd.clone(),
            pdftoppm: config.pdftoppm_cmd.clone(),
            languages: config.ocr_languages.clone(),
            dpi: config.ocr_dpi(),
        }
    }

    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> OcrResult<Vec<PathBuf>> {
        let prefix = out_dir.join("page");
        let dpi = self.dpi.to_string();

        run(
            &self.pdftoppm,
            [
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
        )
        .await?;

        // pdftoppm zero-pads page numbers to a common width, so name order is page order
        let mut images: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        images.sort();

        if images.is_empty() {
            return Err(OcrError::NoPages);
        }
        Ok(images)
    }

    async fn recognize_image(&self, image: &Path) -> OcrResult<String> {
        let output = run(
            &self.tesseract,
            [
                image.as_os_str(),
                OsStr::new("stdout"),
                OsStr::new("-l"),
                OsStr::new(&self.languages),
            ],
        )
        .await?;

        Ok(output.stdout)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn is_available(&self) -> bool {
        which::which(&self.tesseract).is_ok() && which::which(&self.pdftoppm).is_ok()
    }

    async fn recognize_pages(&self, pdf: &[u8]) -> OcrResult<Vec<String>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        let images_dir = dir.path().join("pages");
        tokio::fs::create_dir(&images_dir).await?;

        let images = self.rasterize(&input, &images_dir).await?;
        tracing::debug!(pages = images.len(), dpi = self.dpi, "Rasterized PDF for OCR");

        let mut results = Vec::with_capacity(images.len());
        for image in &images {
            results.push(self.recognize_image(image).await);
        }

        collect_pages(results)
    }
}

/// Keeps every recognized page, leaving failed pages blank. Fails only when
/// no page could be recognized.
fn collect_pages(results: Vec<OcrResult<String>>) -> OcrResult<Vec<String>> {
    let mut pages = Vec::with_capacity(results.len());
    let mut first_error = None;
    let mut recognized = 0;

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(text) => {
                tracing::debug!(page = index + 1, chars = text.chars().count(), "OCR page");
                recognized += 1;
                pages.push(text);
            }
            Err(e) => {
                tracing::warn!(page = index + 1, error = %e, "OCR failed for page");
                first_error.get_or_insert(e);
                pages.push(String::new());
            }
        }
    }

    match first_error {
        Some(e) if recognized == 0 => Err(e),
        _ => Ok(pages),
    }
}
