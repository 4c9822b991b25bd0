//! Text extraction for corpus files.
//!
//! Maps each file to a content category (extension first, magic-byte sniffing
//! as fallback) and runs the matching extractor. Extraction never fails the
//! caller: any error or empty result becomes `None` and is logged, so a bad
//! file only costs itself.
//!
//! PDF, DOCX and OCR support are compile-time features (`pdf`, `office`,
//! `ocr`); without the feature the file is skipped like any other
//! unextractable input.

use std::path::Path;

/// Content category of a corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    PlainText,
    Pdf,
    WordDocument,
    Image,
}

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl ContentKind {
    /// Determine the content category of a file, or `None` when unsupported.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match ext.as_deref() {
            Some("txt") => return Some(Self::PlainText),
            Some("pdf") => return Some(Self::Pdf),
            Some("docx") => return Some(Self::WordDocument),
            Some("jpg") | Some("jpeg") | Some("png") => return Some(Self::Image),
            _ => {}
        }

        // Unknown extension: sniff the magic bytes
        let kind = infer::get_from_path(path).ok().flatten()?;
        Self::from_mime(kind.mime_type())
    }

    fn from_mime(mime: &str) -> Option<Self> {
        if mime == "application/pdf" {
            Some(Self::Pdf)
        } else if mime == DOCX_MIME {
            Some(Self::WordDocument)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// Extract the text of a corpus file.
///
/// Returns the trimmed text, or `None` when the file is unsupported, empty,
/// or failed to extract. Never propagates an error.
pub fn extract_text(path: &Path) -> Option<String> {
    let Some(kind) = ContentKind::detect(path) else {
        log::warn!("Skipping {}: unsupported file type", path.display());
        return None;
    };

    let extracted = match kind {
        ContentKind::PlainText => plain_text(path),
        ContentKind::Pdf => pdf_text(path),
        ContentKind::WordDocument => docx_text(path),
        ContentKind::Image => image_text(path),
    };

    match extracted {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                log::warn!("No text extracted from {}", path.display());
                None
            } else {
                log::debug!(
                    "Extracted {} chars from {} ({kind:?})",
                    text.chars().count(),
                    path.display()
                );
                Some(text.to_string())
            }
        }
        Err(e) => {
            log::error!("Failed to extract text from {}: {e}", path.display());
            None
        }
    }
}

fn plain_text(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(feature = "pdf")]
fn pdf_text(path: &Path) -> anyhow::Result<String> {
    Ok(pdf_extract::extract_text(path)?)
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_path: &Path) -> anyhow::Result<String> {
    anyhow::bail!("built without the 'pdf' feature")
}

/// Pull the visible text runs out of `word/document.xml`, one line per
/// paragraph.
#[cfg(feature = "office")]
fn docx_text(path: &Path) -> anyhow::Result<String> {
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read as _;

    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run = false;
    loop {
        match reader.read_event()? {
            Event::Start(ref e) if e.name().local_name().as_ref() == b"t" => in_run = true,
            Event::End(ref e) => match e.name().local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_run => text.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

#[cfg(not(feature = "office"))]
fn docx_text(_path: &Path) -> anyhow::Result<String> {
    anyhow::bail!("built without the 'office' feature")
}

#[cfg(feature = "ocr")]
fn image_text(path: &Path) -> anyhow::Result<String> {
    let mut tess = leptess::LepTess::new(None, "eng")?;
    tess.set_image(path)?;
    Ok(tess.get_utf8_text()?)
}

#[cfg(not(feature = "ocr"))]
fn image_text(_path: &Path) -> anyhow::Result<String> {
    anyhow::bail!("built without the 'ocr' feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(
            ContentKind::detect(Path::new("notes.txt")),
            Some(ContentKind::PlainText)
        );
        assert_eq!(
            ContentKind::detect(Path::new("report.PDF")),
            Some(ContentKind::Pdf)
        );
        assert_eq!(
            ContentKind::detect(Path::new("contract.docx")),
            Some(ContentKind::WordDocument)
        );
        assert_eq!(
            ContentKind::detect(Path::new("scan.jpeg")),
            Some(ContentKind::Image)
        );
    }

    #[test]
    fn test_detect_unknown_extension_without_magic() {
        // No recognizable extension and no file to sniff
        assert_eq!(ContentKind::detect(Path::new("missing.xyz")), None);
    }

    #[test]
    fn test_detect_markdown_is_not_plain_text() {
        // Only .txt counts as plain text; prose formats without magic bytes
        // are skipped
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.md");
        std::fs::write(&path, "# heading\nbody").unwrap();

        assert_eq!(ContentKind::detect(&path), None);
    }

    #[test]
    fn test_detect_sniffs_png_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picture.blob");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
            .unwrap();
        f.write_all(&[0u8; 16]).unwrap();

        assert_eq!(ContentKind::detect(&path), Some(ContentKind::Image));
    }

    #[test]
    fn test_detect_sniffs_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.bin");
        std::fs::write(&path, b"%PDF-1.4 minimal").unwrap();

        assert_eq!(ContentKind::detect(&path), Some(ContentKind::Pdf));
    }

    #[test]
    fn test_extract_txt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "  apple banana fruit\n").unwrap();

        assert_eq!(extract_text(&path), Some("apple banana fruit".to_string()));
    }

    #[test]
    fn test_extract_empty_txt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "   \n\t").unwrap();

        assert_eq!(extract_text(&path), None);
    }

    #[test]
    fn test_extract_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");

        assert_eq!(extract_text(&path), None);
    }

    #[test]
    fn test_extract_invalid_utf8_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        std::fs::write(&path, [b'o', b'k', 0xFF, b'!']).unwrap();

        let text = extract_text(&path).unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn test_pdf_without_feature_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.4 stub").unwrap();

        assert_eq!(extract_text(&path), None);
    }
}
