//! Document-order walk over the main document body.
//!
//! Flattens the `w:body` tree into a sequence of [`BodyEntry`] values:
//! one per top-level paragraph (with its style, list level and inline
//! tokens) and one per table (as a plain text blob). The walk keeps no state
//! beyond the relationship map, so assembling notes from the entries is a
//! separate, purely sequential step.

use crate::normalize::clean_line;
use crate::ooxml::{is_media_target, Relationships, XmlElement};

/// An inline piece of a paragraph, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineToken {
    Text {
        value: String,
        bold: bool,
    },
    Image {
        source_image_name: String,
        image_target: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphEntry {
    /// Paragraph style id (`w:pStyle/@w:val`).
    pub style: Option<String>,
    /// `None` when the paragraph carries no list numbering.
    pub list_level: Option<u32>,
    pub tokens: Vec<InlineToken>,
}

impl ParagraphEntry {
    /// Concatenated text of all text tokens.
    pub fn heading_text(&self) -> String {
        let parts: Vec<&str> = self
            .tokens
            .iter()
            .filter_map(|t| match t {
                InlineToken::Text { value, .. } => Some(value.as_str()),
                InlineToken::Image { .. } => None,
            })
            .collect();
        clean_line(&parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyEntry {
    Paragraph(ParagraphEntry),
    Table { text: String },
}

/// Walk the body of a parsed `word/document.xml`.
pub fn walk_document(document: &XmlElement, rels: &Relationships) -> Vec<BodyEntry> {
    let mut entries = Vec::new();
    let body = if document.is("body") {
        Some(document)
    } else {
        document.find_all("body").into_iter().next()
    };
    if let Some(body) = body {
        walk_block_container(body, rels, &mut entries);
    }
    entries
}

fn walk_block_container(container: &XmlElement, rels: &Relationships, out: &mut Vec<BodyEntry>) {
    for el in container.elements() {
        match el.local_name() {
            "p" => out.push(BodyEntry::Paragraph(read_paragraph(el, rels))),
            "tbl" => out.push(BodyEntry::Table {
                text: table_text(el),
            }),
            // Content controls and tracked insertions wrap ordinary blocks.
            "sdt" => {
                if let Some(content) = el.child("sdtContent") {
                    walk_block_container(content, rels, out);
                }
            }
            "ins" | "customXml" => walk_block_container(el, rels, out),
            _ => {}
        }
    }
}

fn read_paragraph(p: &XmlElement, rels: &Relationships) -> ParagraphEntry {
    let ppr = p.child("pPr");
    let style = ppr
        .and_then(|ppr| ppr.child("pStyle"))
        .and_then(|s| s.attr("val"))
        .map(str::to_string);
    let list_level = ppr.and_then(|ppr| ppr.child("numPr")).map(|num_pr| {
        num_pr
            .child("ilvl")
            .and_then(|ilvl| ilvl.attr("val"))
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0)
    });

    let mut runs = Vec::new();
    collect_runs(p, &mut runs);

    let mut tokens = Vec::new();
    for run in runs {
        read_run(run, rels, &mut tokens);
    }

    ParagraphEntry {
        style,
        list_level,
        tokens,
    }
}

/// Runs directly under the paragraph or nested in hyperlinks, smart tags,
/// insertions and similar inline wrappers.
fn collect_runs<'a>(el: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    for child in el.elements() {
        match child.local_name() {
            "r" => out.push(child),
            "pPr" | "del" => {}
            _ => collect_runs(child, out),
        }
    }
}

fn read_run(run: &XmlElement, rels: &Relationships, tokens: &mut Vec<InlineToken>) {
    let bold = run
        .child("rPr")
        .and_then(|rpr| rpr.child("b"))
        .map(read_on_off)
        .unwrap_or(false);

    let raw: String = run.find_all("t").iter().map(|t| t.text()).collect();
    let value = clean_line(&raw);
    if !value.is_empty() {
        tokens.push(InlineToken::Text { value, bold });
    }

    for embed_id in image_references(run) {
        let Some(target) = rels.get(embed_id) else {
            continue;
        };
        if !is_media_target(target) {
            continue;
        }
        let source_image_name = target.rsplit('/').next().unwrap_or(target).to_string();
        tokens.push(InlineToken::Image {
            source_image_name,
            image_target: target.to_string(),
        });
    }
}

/// Relationship ids of pictures under a run: DrawingML `a:blip/@r:embed`
/// and legacy VML `v:imagedata/@r:id`.
fn image_references(run: &XmlElement) -> Vec<&str> {
    let mut ids: Vec<&str> = run
        .find_all("blip")
        .into_iter()
        .filter_map(|blip| blip.attr("embed"))
        .collect();
    ids.extend(
        run.find_all("imagedata")
            .into_iter()
            .filter_map(|data| data.attr("id")),
    );
    ids
}

/// On/off toggle: present means on unless explicitly `0`, `false` or `off`.
fn read_on_off(el: &XmlElement) -> bool {
    match el.attr("val").map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("0") | Some("false") | Some("off") => false,
        _ => true,
    }
}

fn table_text(tbl: &XmlElement) -> String {
    tbl.find_all("t")
        .into_iter()
        .map(|t| clean_line(&t.text()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::parse_xml;

    const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#;

    fn walk(body: &str, rels_xml: &str) -> Vec<BodyEntry> {
        let doc = parse_xml(format!("<w:document {}><w:body>{}</w:body></w:document>", W, body).as_bytes())
            .unwrap();
        let rels = Relationships::from_xml(
            &parse_xml(format!("<Relationships>{}</Relationships>", rels_xml).as_bytes()).unwrap(),
        );
        walk_document(&doc, &rels)
    }

    fn paragraph(entry: &BodyEntry) -> &ParagraphEntry {
        match entry {
            BodyEntry::Paragraph(p) => p,
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn bold_follows_on_off_convention() {
        let entries = walk(
            r#"<w:p>
                <w:r><w:rPr><w:b/></w:rPr><w:t>on</w:t></w:r>
                <w:r><w:rPr><w:b w:val="false"/></w:rPr><w:t>off</w:t></w:r>
                <w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t>zero</w:t></w:r>
                <w:r><w:rPr><w:b w:val="1"/></w:rPr><w:t>one</w:t></w:r>
                <w:r><w:t>plain</w:t></w:r>
            </w:p>"#,
            "",
        );
        let p = paragraph(&entries[0]);
        let bolds: Vec<bool> = p
            .tokens
            .iter()
            .map(|t| match t {
                InlineToken::Text { bold, .. } => *bold,
                _ => panic!("unexpected image"),
            })
            .collect();
        assert_eq!(bolds, vec![true, false, false, true, false]);
    }

    #[test]
    fn style_and_list_level_are_read() {
        let entries = walk(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>H</w:t></w:r></w:p>
               <w:p><w:pPr><w:numPr><w:ilvl w:val="2"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>deep</w:t></w:r></w:p>
               <w:p><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>top</w:t></w:r></w:p>
               <w:p><w:pPr><w:numPr><w:ilvl w:val="x"/></w:numPr></w:pPr><w:r><w:t>bad</w:t></w:r></w:p>
               <w:p><w:r><w:t>plain</w:t></w:r></w:p>"#,
            "",
        );
        assert_eq!(paragraph(&entries[0]).style.as_deref(), Some("Heading2"));
        assert_eq!(paragraph(&entries[1]).list_level, Some(2));
        assert_eq!(paragraph(&entries[2]).list_level, Some(0));
        assert_eq!(paragraph(&entries[3]).list_level, Some(0));
        assert_eq!(paragraph(&entries[4]).list_level, None);
    }

    #[test]
    fn run_text_is_concatenated_and_cleaned() {
        let entries = walk(
            r#"<w:p><w:hyperlink><w:r><w:t xml:space="preserve">  Veta   </w:t><w:t>pokračuje</w:t></w:r></w:hyperlink><w:r><w:t>   </w:t></w:r></w:p>"#,
            "",
        );
        let p = paragraph(&entries[0]);
        assert_eq!(
            p.tokens,
            vec![InlineToken::Text {
                value: "Veta pokračuje".to_string(),
                bold: false
            }]
        );
        assert_eq!(p.heading_text(), "Veta pokračuje");
    }

    #[test]
    fn images_resolve_through_relationships() {
        let entries = walk(
            r#"<w:p><w:r><w:t>pred</w:t><w:drawing><a:graphic><a:graphicData><a:blip r:embed="rId5"/></a:graphicData></a:graphic></w:drawing></w:r>
               <w:r><w:drawing><a:blip r:embed="rId6"/></w:drawing></w:r>
               <w:r><w:drawing><a:blip r:embed="rIdMissing"/></w:drawing></w:r></w:p>"#,
            r#"<Relationship Id="rId5" Target="media/image3.png"/><Relationship Id="rId6" Target="embeddings/oleObject1.bin"/>"#,
        );
        let p = paragraph(&entries[0]);
        assert_eq!(
            p.tokens,
            vec![
                InlineToken::Text {
                    value: "pred".to_string(),
                    bold: false
                },
                InlineToken::Image {
                    source_image_name: "image3.png".to_string(),
                    image_target: "media/image3.png".to_string()
                },
            ]
        );
    }

    #[test]
    fn tables_become_text_blobs_in_document_order() {
        let entries = walk(
            r#"<w:p><w:r><w:t>pred</w:t></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>  a  1 </w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t></w:t></w:r></w:p></w:tc></w:tr>
               <w:tr><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
               <w:p><w:r><w:t>po</w:t></w:r></w:p>"#,
            "",
        );
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[1],
            BodyEntry::Table {
                text: "a 1\nb".to_string()
            }
        );
        assert_eq!(paragraph(&entries[2]).heading_text(), "po");
    }
}
