//! Note block assembly.
//!
//! Consumes the [`BodyEntry`] stream produced by the walker and turns it
//! into per-theme lists of [`NoteBlock`]s. Level-2 headings switch the
//! current theme through the [`ThemeResolver`]; everything else becomes
//! content of whichever theme is current.
//!
//! A heading that does not resolve is recorded in `unmatched_headings` and
//! does **not** reset the current theme, so the content that follows it is
//! attributed to the previously matched theme. Content seen before any theme
//! matched is dropped.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{BlockKind, NoteBlock, RichTextSegment, TextRole};
use crate::normalize::{clean_line, slugify};
use crate::resolver::ThemeResolver;
use crate::walker::{BodyEntry, InlineToken, ParagraphEntry};

/// Maximum slug length embedded in an external key.
const EXTERNAL_KEY_SLUG_CHARS: usize = 80;

/// Output of one assembly pass, before image bytes are read.
#[derive(Debug, Default)]
pub struct AssembledNotes {
    pub blocks_by_theme: BTreeMap<String, Vec<NoteBlock>>,
    /// Every image target referenced by an emitted block.
    pub image_targets: BTreeSet<String>,
    pub unmatched_headings: Vec<String>,
}

/// `{order:04}-{kind}-{slug}` with the slug cut to 80 characters.
pub fn external_key(order: i64, kind: BlockKind, label: &str) -> String {
    let slug: String = slugify(label).chars().take(EXTERNAL_KEY_SLUG_CHARS).collect();
    format!("{:04}-{}-{}", order, kind.as_str(), slug)
}

/// Whether a paragraph style id denotes a second-level heading
/// (`Heading2`, `heading 2`).
pub fn is_level2_heading(style: Option<&str>) -> bool {
    style
        .map(|s| {
            s.chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .eq_ignore_ascii_case("heading2")
        })
        .unwrap_or(false)
}

/// Mutable state threaded through one walk.
struct AssemblyContext<'r> {
    resolver: &'r ThemeResolver,
    current_theme: Option<String>,
    counters: BTreeMap<String, i64>,
    out: AssembledNotes,
}

impl<'r> AssemblyContext<'r> {
    fn new(resolver: &'r ThemeResolver) -> Self {
        Self {
            resolver,
            current_theme: None,
            counters: BTreeMap::new(),
            out: AssembledNotes::default(),
        }
    }

    fn push_block(&mut self, theme_id: &str, build: impl FnOnce(i64) -> NoteBlock) {
        let counter = self.counters.entry(theme_id.to_string()).or_insert(0);
        *counter += 1;
        let block = build(*counter);
        if let Some(target) = &block.image_target {
            self.out.image_targets.insert(target.clone());
        }
        self.out
            .blocks_by_theme
            .entry(theme_id.to_string())
            .or_default()
            .push(block);
    }

    fn paragraph(&mut self, p: &ParagraphEntry) {
        if is_level2_heading(p.style.as_deref()) {
            let heading = p.heading_text();
            if !heading.is_empty() {
                match self.resolver.resolve(&heading) {
                    Some(theme) => self.current_theme = Some(theme.id.clone()),
                    None => self.out.unmatched_headings.push(heading),
                }
                return;
            }
        }

        let Some(theme_id) = self.current_theme.clone() else {
            return;
        };
        if p.tokens.is_empty() {
            return;
        }

        let mut buffer: Vec<RichTextSegment> = Vec::new();
        for token in &p.tokens {
            match token {
                InlineToken::Text { value, bold } => push_segment(&mut buffer, value, *bold),
                InlineToken::Image {
                    source_image_name,
                    image_target,
                } => {
                    self.flush_text(&theme_id, &mut buffer, p.list_level);
                    self.push_block(&theme_id, |order| NoteBlock {
                        external_key: external_key(order, BlockKind::Image, source_image_name),
                        order,
                        kind: BlockKind::Image,
                        text: None,
                        text_role: None,
                        list_level: None,
                        rich_text: None,
                        source_image_name: Some(source_image_name.clone()),
                        image_target: Some(image_target.clone()),
                    });
                }
            }
        }
        self.flush_text(&theme_id, &mut buffer, p.list_level);
    }

    fn flush_text(
        &mut self,
        theme_id: &str,
        buffer: &mut Vec<RichTextSegment>,
        list_level: Option<u32>,
    ) {
        let segments = std::mem::take(buffer);
        let joined: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let text = clean_line(&joined.join(" "));
        if text.is_empty() {
            return;
        }

        let role = match list_level {
            None => TextRole::Paragraph,
            Some(0)
                if segments
                    .iter()
                    .find(|s| !s.text.is_empty())
                    .is_some_and(|s| s.bold) =>
            {
                TextRole::Subheading
            }
            Some(_) => TextRole::ListItem,
        };

        self.push_block(theme_id, |order| NoteBlock {
            external_key: external_key(order, BlockKind::Text, &text),
            order,
            kind: BlockKind::Text,
            text: Some(text),
            text_role: Some(role),
            list_level,
            rich_text: Some(segments),
            source_image_name: None,
            image_target: None,
        });
    }

    fn table(&mut self, text: &str) {
        let Some(theme_id) = self.current_theme.clone() else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        self.push_block(&theme_id, |order| NoteBlock {
            external_key: external_key(order, BlockKind::Table, text),
            order,
            kind: BlockKind::Table,
            text: Some(text.to_string()),
            text_role: None,
            list_level: None,
            rich_text: None,
            source_image_name: None,
            image_target: None,
        });
    }
}

/// Append a text run, extending the last segment when the bold state matches.
fn push_segment(buffer: &mut Vec<RichTextSegment>, value: &str, bold: bool) {
    match buffer.last_mut() {
        Some(last) if last.bold == bold => {
            last.text = clean_line(&format!("{} {}", last.text, value));
        }
        _ => buffer.push(RichTextSegment {
            text: clean_line(value),
            bold,
        }),
    }
}

/// Assemble note blocks from a walked document body.
pub fn assemble_notes(entries: &[BodyEntry], resolver: &ThemeResolver) -> AssembledNotes {
    let mut ctx = AssemblyContext::new(resolver);
    for entry in entries {
        match entry {
            BodyEntry::Paragraph(p) => ctx.paragraph(p),
            BodyEntry::Table { text } => ctx.table(text),
        }
    }
    ctx.out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::ThemeLookup;
    use crate::normalize::normalize_text;

    fn resolver() -> ThemeResolver {
        let lookup = |id: &str, slug: &str, title: &str| ThemeLookup {
            id: id.to_string(),
            slug: slug.to_string(),
            title: title.to_string(),
            normalized_title: normalize_text(title),
        };
        ThemeResolver::new(vec![
            lookup("t1", "ma-1-funkcia", "Funkcia"),
            lookup("t2", "ma-2-limita-funkcie", "Limita funkcie"),
        ])
    }

    fn text(value: &str, bold: bool) -> InlineToken {
        InlineToken::Text {
            value: value.to_string(),
            bold,
        }
    }

    fn image(name: &str) -> InlineToken {
        InlineToken::Image {
            source_image_name: name.to_string(),
            image_target: format!("media/{}", name),
        }
    }

    fn heading(title: &str) -> BodyEntry {
        BodyEntry::Paragraph(ParagraphEntry {
            style: Some("Heading2".to_string()),
            list_level: None,
            tokens: vec![text(title, false)],
        })
    }

    fn para(list_level: Option<u32>, tokens: Vec<InlineToken>) -> BodyEntry {
        BodyEntry::Paragraph(ParagraphEntry {
            style: None,
            list_level,
            tokens,
        })
    }

    #[test]
    fn same_bold_runs_merge_into_one_segment() {
        let entries = vec![
            heading("1. Funkcia"),
            para(None, vec![text("Definícia", false), text("funkcie", false), text("je", false)]),
        ];
        let out = assemble_notes(&entries, &resolver());
        let block = &out.blocks_by_theme["t1"][0];
        let rich = block.rich_text.as_ref().unwrap();
        assert_eq!(rich.len(), 1);
        assert_eq!(rich[0].text, "Definícia funkcie je");
        assert_eq!(block.text.as_deref(), Some("Definícia funkcie je"));
        assert_eq!(block.text_role, Some(TextRole::Paragraph));
    }

    #[test]
    fn style_changes_split_segments() {
        let entries = vec![
            heading("Funkcia"),
            para(
                Some(1),
                vec![text("Pojem", true), text("funkcie", true), text("je", false), text("dôležitý", true)],
            ),
        ];
        let out = assemble_notes(&entries, &resolver());
        let block = &out.blocks_by_theme["t1"][0];
        let rich = block.rich_text.as_ref().unwrap();
        assert_eq!(
            rich.iter().map(|s| (s.text.as_str(), s.bold)).collect::<Vec<_>>(),
            vec![("Pojem funkcie", true), ("je", false), ("dôležitý", true)]
        );
        assert_eq!(block.text_role, Some(TextRole::ListItem));
        assert_eq!(block.list_level, Some(1));
    }

    #[test]
    fn bold_top_level_bullet_is_a_subheading() {
        let entries = vec![
            heading("Funkcia"),
            para(Some(0), vec![text("Vlastnosti", true), text("funkcií", false)]),
            para(Some(0), vec![text("Obyčajná", false), text("odrážka", true)]),
        ];
        let out = assemble_notes(&entries, &resolver());
        let blocks = &out.blocks_by_theme["t1"];
        assert_eq!(blocks[0].text_role, Some(TextRole::Subheading));
        assert_eq!(blocks[1].text_role, Some(TextRole::ListItem));
    }

    #[test]
    fn images_split_text_and_are_deduplicated() {
        let entries = vec![
            heading("Funkcia"),
            para(None, vec![text("Graf", false), image("image1.png"), text("pod grafom", false)]),
            heading("Limita funkcie"),
            para(None, vec![image("image1.png")]),
        ];
        let out = assemble_notes(&entries, &resolver());
        let t1 = &out.blocks_by_theme["t1"];
        assert_eq!(
            t1.iter().map(|b| b.kind).collect::<Vec<_>>(),
            vec![BlockKind::Text, BlockKind::Image, BlockKind::Text]
        );
        assert_eq!(t1[1].external_key, "0002-image-image1-png");
        assert_eq!(t1[2].text.as_deref(), Some("pod grafom"));
        assert_eq!(out.blocks_by_theme["t2"][0].order, 1);
        assert_eq!(out.image_targets.len(), 1);
        assert!(out.image_targets.contains("media/image1.png"));
    }

    #[test]
    fn orders_are_contiguous_and_keys_unique_per_theme() {
        let entries = vec![
            heading("Funkcia"),
            para(None, vec![text("Rovnaký text", false)]),
            para(None, vec![text("Rovnaký text", false)]),
            BodyEntry::Table {
                text: "x\ny".to_string(),
            },
            para(Some(2), vec![text("posledný", false)]),
        ];
        let out = assemble_notes(&entries, &resolver());
        for blocks in out.blocks_by_theme.values() {
            let keys: HashSet<&str> = blocks.iter().map(|b| b.external_key.as_str()).collect();
            assert_eq!(keys.len(), blocks.len());
            for (i, b) in blocks.iter().enumerate() {
                assert_eq!(b.order, i as i64 + 1);
            }
        }
        let blocks = &out.blocks_by_theme["t1"];
        assert_eq!(blocks[0].external_key, "0001-text-rovnaky-text");
        assert_eq!(blocks[2].kind, BlockKind::Table);
        assert_eq!(blocks[2].external_key, "0003-table-x-y");
    }

    #[test]
    fn unmatched_heading_keeps_previous_theme() {
        let entries = vec![
            para(None, vec![text("pred prvou témou", false)]),
            heading("Funkcia"),
            para(None, vec![text("a", false)]),
            heading("Vektorové priestory"),
            para(None, vec![text("b", false)]),
        ];
        let out = assemble_notes(&entries, &resolver());
        assert_eq!(out.unmatched_headings, vec!["Vektorové priestory"]);
        let texts: Vec<&str> = out.blocks_by_theme["t1"]
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(out.blocks_by_theme.len(), 1);
    }

    #[test]
    fn headings_are_never_emitted() {
        let entries = vec![heading("Funkcia"), heading("Limita funkcie")];
        let out = assemble_notes(&entries, &resolver());
        assert_eq!(out.blocks_by_theme.len(), 0);
    }

    #[test]
    fn external_key_slug_is_truncated() {
        let long = "slovo ".repeat(40);
        let key = external_key(7, BlockKind::Text, &long);
        assert!(key.starts_with("0007-text-slovo-slovo"));
        assert_eq!(key.len(), "0007-text-".len() + 80);
    }

    #[test]
    fn heading_style_detection() {
        assert!(is_level2_heading(Some("Heading2")));
        assert!(is_level2_heading(Some("heading 2")));
        assert!(!is_level2_heading(Some("Heading1")));
        assert!(!is_level2_heading(None));
    }
}
