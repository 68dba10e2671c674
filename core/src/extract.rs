//! Per-format plain-text extraction for corpus files.
//!
//! Dispatch goes through [`DocFormat`], chosen from the file extension. Failures
//! never escape [`Extractor::extract`]: they are logged and the file contributes
//! empty text, so one bad file degrades the corpus instead of aborting a build.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::path::Path;
use std::process::Command;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
}

const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Plain,
    Pdf,
    Html,
    Xml,
    Image,
    Unsupported,
}

impl DocFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match ext.as_deref() {
            Some("txt") => DocFormat::Plain,
            Some("pdf") => DocFormat::Pdf,
            Some("html") | Some("htm") => DocFormat::Html,
            Some("xml") => DocFormat::Xml,
            Some("jpg") | Some("jpeg") | Some("png") => DocFormat::Image,
            _ => DocFormat::Unsupported,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Best-effort image-to-text capability.
pub trait OcrEngine: Send + Sync {
    fn image_to_text(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Shells out to a tesseract-compatible binary: `<command> <image> stdout`.
pub struct TesseractOcr {
    command: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

impl OcrEngine for TesseractOcr {
    fn image_to_text(&self, path: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .output()
            .map_err(|e| ExtractError::Ocr(format!("{}: {}", self.command, e)))?;
        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlText {
    pub title: Option<String>,
    pub text: String,
}

/// Strip script/style/noscript, emit the remaining text one trimmed line at a time.
pub fn html_to_text(html: &str) -> HtmlText {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut raw = String::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else { continue };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map_or(false, |e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        raw.push_str(text);
        raw.push('\n');
    }
    let text = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    HtmlText { title, text }
}

/// Page-wise PDF text with internal whitespace collapsed; empty pages dropped.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let parts: Vec<String> = pages
        .iter()
        .map(|p| WHITESPACE.replace_all(p, " ").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    Ok(parts.join("\n"))
}

#[derive(Default)]
pub struct Extractor {
    ocr: Option<Box<dyn OcrEngine>>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr(ocr: Box<dyn OcrEngine>) -> Self {
        Self { ocr: Some(ocr) }
    }

    /// Extractor configured from an OCR command name; an empty command disables OCR.
    pub fn from_ocr_command(command: &str) -> Self {
        if command.trim().is_empty() {
            Self::new()
        } else {
            Self::with_ocr(Box::new(TesseractOcr::new(command)))
        }
    }

    /// Plain text of `path`, or empty text when the format is unsupported or extraction fails.
    pub fn extract(&self, path: &Path) -> String {
        match self.try_extract(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "extraction failed, skipping file");
                String::new()
            }
        }
    }

    pub fn try_extract(&self, path: &Path) -> Result<String, ExtractError> {
        match DocFormat::from_path(path) {
            DocFormat::Plain | DocFormat::Xml => Ok(read_lossy(path)?),
            DocFormat::Html => Ok(html_to_text(&read_lossy(path)?).text),
            DocFormat::Pdf => pdf_to_text(&std::fs::read(path)?),
            DocFormat::Image => match &self.ocr {
                Some(ocr) => ocr.image_to_text(path),
                None => {
                    tracing::debug!(path = %path.display(), "no OCR engine configured, image skipped");
                    Ok(String::new())
                }
            },
            DocFormat::Unsupported => Ok(String::new()),
        }
    }
}

fn read_lossy(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
