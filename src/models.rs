//! Core data models used throughout studyhall.
//!
//! These types represent the curriculum tree produced from the syllabus and
//! the note blocks produced from the manuscript, as they flow from the
//! parsers through the assembler into the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One top-level syllabus heading with its themes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub slug: String,
    pub title: String,
    pub order: i64,
    pub themes: Vec<Theme>,
}

/// One numbered syllabus topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    /// `{course_slug}-{number}-{title_slug}`.
    pub slug: String,
    pub normalized_title: String,
    pub number: i64,
    pub title: String,
    pub subthemes: Vec<String>,
    pub source_text: String,
    /// Global position across the whole parsed document, starting at 1.
    pub order: i64,
}

/// Result of parsing one syllabus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedCurriculum {
    pub courses: Vec<Course>,
}

impl ParsedCurriculum {
    pub fn theme_count(&self) -> usize {
        self.courses.iter().map(|c| c.themes.len()).sum()
    }
}

/// The view of a persisted theme needed by the notes pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeLookup {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub normalized_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Image,
    Table,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Table => "table",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(BlockKind::Text),
            "image" => Some(BlockKind::Image),
            "table" => Some(BlockKind::Table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Paragraph,
    ListItem,
    Subheading,
}

impl TextRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextRole::Paragraph => "paragraph",
            TextRole::ListItem => "list_item",
            TextRole::Subheading => "subheading",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paragraph" => Some(TextRole::Paragraph),
            "list_item" => Some(TextRole::ListItem),
            "subheading" => Some(TextRole::Subheading),
            _ => None,
        }
    }
}

/// An inline run of text sharing one bold state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextSegment {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
}

/// One unit of extracted manuscript content attached to a theme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteBlock {
    /// `{order:04}-{kind}-{slug}`, stable across re-imports of unchanged content.
    pub external_key: String,
    pub order: i64,
    pub kind: BlockKind,
    pub text: Option<String>,
    pub text_role: Option<TextRole>,
    pub list_level: Option<u32>,
    pub rich_text: Option<Vec<RichTextSegment>>,
    pub source_image_name: Option<String>,
    pub image_target: Option<String>,
}

impl NoteBlock {
    /// Rich text as stored in the `rich_text_json` column.
    pub fn rich_text_json(&self) -> Option<String> {
        self.rich_text
            .as_ref()
            .and_then(|segments| serde_json::to_string(segments).ok())
    }
}

/// Everything the notes pass hands back to the importer.
#[derive(Debug, Clone, Default)]
pub struct NoteExtraction {
    /// Blocks per theme id, each list in display order.
    pub blocks_by_theme: BTreeMap<String, Vec<NoteBlock>>,
    /// Raw image bytes per package target path (e.g. `media/image3.png`).
    pub image_bytes_by_target: BTreeMap<String, Vec<u8>>,
    pub unmatched_headings: Vec<String>,
    /// Image targets referenced by blocks but absent from the package.
    /// Their blocks are kept without stored bytes.
    pub missing_images: Vec<String>,
}

impl NoteExtraction {
    pub fn block_count(&self) -> usize {
        self.blocks_by_theme.values().map(Vec::len).sum()
    }
}
