//! Canonical markdown rendering of a theme's note blocks.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{BlockKind, NoteBlock, RichTextSegment, TextRole};

/// Render blocks in order. `image_url` maps an image block to the URL its
/// bytes were stored under; image blocks without a URL fall back to the
/// package target.
pub fn blocks_to_markdown<F>(blocks: &[NoteBlock], image_url: F) -> String
where
    F: Fn(&NoteBlock) -> Option<String>,
{
    let mut out = String::new();
    let mut previous_was_list = false;

    for block in blocks {
        let (rendered, is_list) = match block.kind {
            BlockKind::Text => render_text(block),
            BlockKind::Image => {
                let name = block.source_image_name.as_deref().unwrap_or("image");
                let url = image_url(block)
                    .or_else(|| block.image_target.clone())
                    .unwrap_or_default();
                (format!("![{}]({})", escape_brackets(name), url), false)
            }
            BlockKind::Table => (render_table(block.text.as_deref().unwrap_or("")), false),
        };
        if rendered.is_empty() {
            continue;
        }

        if !out.is_empty() {
            out.push_str(if previous_was_list && is_list { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        previous_was_list = is_list;
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_text(block: &NoteBlock) -> (String, bool) {
    let inline = match &block.rich_text {
        Some(segments) if !segments.is_empty() => render_segments(segments),
        _ => escape_inline(block.text.as_deref().unwrap_or("")),
    };

    match block.text_role {
        Some(TextRole::Subheading) => {
            // The whole line is already a heading; drop the bold markers.
            let plain = match block.text.as_deref() {
                Some(text) => escape_inline(text),
                None => inline,
            };
            (format!("### {}", plain), false)
        }
        Some(TextRole::ListItem) => {
            let indent = "  ".repeat(block.list_level.unwrap_or(0) as usize);
            (format!("{}- {}", indent, escape_block_start(&inline)), true)
        }
        Some(TextRole::Paragraph) | None => (escape_block_start(&inline), false),
    }
}

fn render_segments(segments: &[RichTextSegment]) -> String {
    segments
        .iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| {
            if s.bold {
                format!("**{}**", escape_inline(&s.text))
            } else {
                escape_inline(&s.text)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-column table: the first line becomes the header.
fn render_table(text: &str) -> String {
    let rows: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.replace('|', "\\|"))
        .collect();
    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };

    let mut out = format!("| {} |\n| --- |", header);
    for row in body {
        out.push_str(&format!("\n| {} |", row));
    }
    out
}

/// Backslash-escape characters that would start emphasis or code spans.
fn escape_inline(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '*' | '_' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn ordered_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([.)])(\s|$)").unwrap())
}

/// Escape a leading marker that would turn the line into a heading, quote,
/// bullet or ordered list item.
fn escape_block_start(line: &str) -> String {
    if line.starts_with(['#', '>', '+', '-']) {
        return format!("\\{}", line);
    }
    if let Some(caps) = ordered_marker_re().captures(line) {
        let digits = &caps[1];
        return format!("{}\\{}", digits, &line[digits.len()..]);
    }
    line.to_string()
}

fn escape_brackets(s: &str) -> String {
    s.replace('[', "\\[").replace(']', "\\]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_block(order: i64, role: TextRole, level: Option<u32>, segs: &[(&str, bool)]) -> NoteBlock {
        let segments: Vec<RichTextSegment> = segs
            .iter()
            .map(|(t, b)| RichTextSegment {
                text: t.to_string(),
                bold: *b,
            })
            .collect();
        let text = segs.iter().map(|(t, _)| *t).collect::<Vec<_>>().join(" ");
        NoteBlock {
            external_key: format!("{:04}-text-x", order),
            order,
            kind: BlockKind::Text,
            text: Some(text),
            text_role: Some(role),
            list_level: level,
            rich_text: Some(segments),
            source_image_name: None,
            image_target: None,
        }
    }

    #[test]
    fn renders_roles_images_and_tables() {
        let blocks = vec![
            text_block(1, TextRole::Subheading, Some(0), &[("Vlastnosti", true)]),
            text_block(2, TextRole::Paragraph, None, &[("Funkcia je", false), ("prostá", true)]),
            text_block(3, TextRole::ListItem, Some(0), &[("prvá", false)]),
            text_block(4, TextRole::ListItem, Some(1), &[("vnorená", false)]),
            NoteBlock {
                external_key: "0005-image-graf-png".to_string(),
                order: 5,
                kind: BlockKind::Image,
                text: None,
                text_role: None,
                list_level: None,
                rich_text: None,
                source_image_name: Some("graf.png".to_string()),
                image_target: Some("media/graf.png".to_string()),
            },
            NoteBlock {
                external_key: "0006-table-a-b".to_string(),
                order: 6,
                kind: BlockKind::Table,
                text: Some("a\nb|c".to_string()),
                text_role: None,
                list_level: None,
                rich_text: None,
                source_image_name: None,
                image_target: None,
            },
        ];
        let md = blocks_to_markdown(&blocks, |b| {
            b.source_image_name.as_ref().map(|n| format!("/images/{}", n))
        });
        assert_eq!(
            md,
            "### Vlastnosti\n\n\
             Funkcia je **prostá**\n\n\
             - prvá\n  - vnorená\n\n\
             ![graf.png](/images/graf.png)\n\n\
             | a |\n| --- |\n| b\\|c |\n"
        );
    }

    #[test]
    fn image_without_url_uses_target() {
        let block = NoteBlock {
            external_key: "0001-image-x-png".to_string(),
            order: 1,
            kind: BlockKind::Image,
            text: None,
            text_role: None,
            list_level: None,
            rich_text: None,
            source_image_name: Some("x.png".to_string()),
            image_target: Some("media/x.png".to_string()),
        };
        assert_eq!(blocks_to_markdown(&[block], |_| None), "![x.png](media/x.png)\n");
    }

    #[test]
    fn markdown_syntax_in_text_is_escaped() {
        let blocks = vec![
            text_block(1, TextRole::Paragraph, None, &[("1. nie je zoznam", false)]),
            text_block(2, TextRole::Paragraph, None, &[("# ani nadpis", false)]),
            text_block(3, TextRole::Paragraph, None, &[("- ani odrážka", false)]),
            text_block(4, TextRole::Paragraph, None, &[("a*b = x_1", false), ("f*g", true)]),
            text_block(5, TextRole::ListItem, Some(0), &[("2) bod", false)]),
        ];
        assert_eq!(
            blocks_to_markdown(&blocks, |_| None),
            "1\\. nie je zoznam\n\n\
             \\# ani nadpis\n\n\
             \\- ani odrážka\n\n\
             a\\*b = x\\_1 **f\\*g**\n\n\
             - 2\\) bod\n"
        );
    }

    #[test]
    fn numbers_without_marker_are_left_alone() {
        let blocks = vec![text_block(1, TextRole::Paragraph, None, &[("2024 bolo", false)])];
        assert_eq!(blocks_to_markdown(&blocks, |_| None), "2024 bolo\n");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(blocks_to_markdown(&[], |_| None), "");
    }
}
