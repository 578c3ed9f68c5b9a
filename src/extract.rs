//! Extraction entry points for the two import inputs.
//!
//! - the syllabus PDF → [`ParsedCurriculum`] via a [`PdfTextExtractor`] and
//!   the curriculum parser;
//! - the notes DOCX → [`NoteExtraction`] via the office package reader, the
//!   document walker, the theme resolver and the block assembler.
//!
//! Parsing is synchronous and works on fully buffered input. Only reading
//! the input file is async.

use std::path::{Path, PathBuf};

use crate::assemble::assemble_notes;
use crate::curriculum::{parse_curriculum_text, ParserRules};
use crate::models::{NoteExtraction, ParsedCurriculum, ThemeLookup};
use crate::ooxml::{parse_xml, OfficePackage, Relationships, DOCUMENT_PART, DOCUMENT_RELS_PART};
use crate::pdf::PdfTextExtractor;
use crate::resolver::ThemeResolver;
use crate::walker::walk_document;

/// Extraction error. Structural problems with the input abort the import;
/// data-quality problems are reported through the extraction result instead.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("PDF text tool `{command}` failed ({status}): {stderr}")]
    PdfTool {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("office package is unreadable: {0}")]
    Package(String),
    #[error("office package is missing required part {0}")]
    MissingPart(String),
    #[error("malformed XML: {0}")]
    Xml(String),
}

/// Extract the syllabus text with `extractor` and parse it.
pub fn extract_curriculum_from_pdf(
    path: &Path,
    extractor: &dyn PdfTextExtractor,
    rules: &ParserRules,
) -> Result<ParsedCurriculum, ExtractError> {
    let text = extractor.extract_text(path)?;
    Ok(parse_curriculum_text(&text, rules))
}

/// Read a `.docx` file and extract its notes against the known themes.
pub async fn extract_notes_from_docx(
    path: &Path,
    lookups: Vec<ThemeLookup>,
) -> Result<NoteExtraction, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    extract_notes_from_bytes(&bytes, lookups)
}

/// Extract notes from an in-memory `.docx` package.
pub fn extract_notes_from_bytes(
    bytes: &[u8],
    lookups: Vec<ThemeLookup>,
) -> Result<NoteExtraction, ExtractError> {
    let mut package = OfficePackage::open(bytes)?;
    let document_xml = package.read_required_part(DOCUMENT_PART)?;
    let rels_xml = package.read_required_part(DOCUMENT_RELS_PART)?;

    let document = parse_xml(&document_xml)?;
    let rels = Relationships::from_xml(&parse_xml(&rels_xml)?);

    let entries = walk_document(&document, &rels);
    let resolver = ThemeResolver::new(lookups);
    let assembled = assemble_notes(&entries, &resolver);

    let mut extraction = NoteExtraction {
        blocks_by_theme: assembled.blocks_by_theme,
        unmatched_headings: assembled.unmatched_headings,
        ..Default::default()
    };
    for target in assembled.image_targets {
        match package.read_media(&target)? {
            Some(bytes) => {
                extraction.image_bytes_by_target.insert(target, bytes);
            }
            None => extraction.missing_images.push(target),
        }
    }

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::models::BlockKind;
    use crate::normalize::normalize_text;

    fn docx(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (name, content) in parts {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(content).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn lookups() -> Vec<ThemeLookup> {
        vec![ThemeLookup {
            id: "t1".to_string(),
            slug: "ma-1-funkcia".to_string(),
            title: "Funkcia".to_string(),
            normalized_title: normalize_text("Funkcia"),
        }]
    }

    const RELS: &[u8] = br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="image" Target="media/image1.png"/></Relationships>"#;

    #[test]
    fn invalid_zip_returns_error() {
        let err = extract_notes_from_bytes(b"not a zip", lookups()).unwrap_err();
        assert!(matches!(err, ExtractError::Package(_)));
    }

    #[test]
    fn missing_relationships_part_is_fatal() {
        let bytes = docx(&[(DOCUMENT_PART, b"<w:document xmlns:w=\"w\"/>")]);
        let err = extract_notes_from_bytes(&bytes, lookups()).unwrap_err();
        match err {
            ExtractError::MissingPart(part) => assert_eq!(part, DOCUMENT_RELS_PART),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn missing_document_part_is_fatal() {
        let bytes = docx(&[(DOCUMENT_RELS_PART, RELS)]);
        let err = extract_notes_from_bytes(&bytes, lookups()).unwrap_err();
        assert!(matches!(err, ExtractError::MissingPart(ref p) if p == DOCUMENT_PART));
    }

    #[test]
    fn missing_media_part_keeps_block_and_is_reported() {
        let document = r#"<w:document xmlns:w="w" xmlns:a="a" xmlns:r="r"><w:body>
<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Funkcia</w:t></w:r></w:p>
<w:p><w:r><w:drawing><a:blip r:embed="rId7"/></w:drawing></w:r></w:p>
<w:p><w:r><w:t>pod obrázkom</w:t></w:r></w:p>
</w:body></w:document>"#.as_bytes();
        let bytes = docx(&[(DOCUMENT_PART, document), (DOCUMENT_RELS_PART, RELS)]);
        let out = extract_notes_from_bytes(&bytes, lookups()).unwrap();
        assert_eq!(out.missing_images, vec!["media/image1.png"]);
        assert!(out.image_bytes_by_target.is_empty());
        let blocks = &out.blocks_by_theme["t1"];
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Image);
        assert_eq!(blocks[1].text.as_deref(), Some("pod obrázkom"));
    }

    #[test]
    fn repeated_image_is_read_once() {
        let document = br#"<w:document xmlns:w="w" xmlns:a="a" xmlns:r="r"><w:body>
<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>1. Funkcia</w:t></w:r></w:p>
<w:p><w:r><w:drawing><a:blip r:embed="rId7"/></w:drawing></w:r></w:p>
<w:p><w:r><w:t>medzi</w:t></w:r></w:p>
<w:p><w:r><w:drawing><a:blip r:embed="rId7"/></w:drawing></w:r></w:p>
</w:body></w:document>"#;
        let bytes = docx(&[
            (DOCUMENT_PART, document),
            (DOCUMENT_RELS_PART, RELS),
            ("word/media/image1.png", b"\x89PNG fake"),
        ]);
        let out = extract_notes_from_bytes(&bytes, lookups()).unwrap();
        let blocks = &out.blocks_by_theme["t1"];
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].kind, BlockKind::Image);
        assert_eq!(blocks[2].image_target.as_deref(), Some("media/image1.png"));
        assert_eq!(out.image_bytes_by_target.len(), 1);
        assert_eq!(out.image_bytes_by_target["media/image1.png"], b"\x89PNG fake".to_vec());
        assert!(out.unmatched_headings.is_empty());
    }
}
