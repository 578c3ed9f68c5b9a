//! Syllabus text segmentation.
//!
//! Turns the plain text extracted from the syllabus PDF into a
//! [`ParsedCurriculum`]: courses, their numbered themes and the subthemes
//! listed in each theme's trailing bracketed annotation.
//!
//! The parser is a line-oriented state machine. A line is one of:
//!
//! - a course heading, recognised only by exact equality with one of the
//!   configured course titles;
//! - the start of a numbered theme (`"12. Title [a, b]"`);
//! - a continuation of the pending theme (wrapped PDF lines).
//!
//! It never fails: malformed input just yields fewer or emptier themes.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Course, ParsedCurriculum, Theme};
use crate::normalize::{clean_line, normalize_text, slugify};

/// Course headings of the state exam syllabus.
pub const DEFAULT_COURSE_TITLES: &[&str] = &[
    "Algebra a teória čísel",
    "Geometria",
    "Matematická analýza",
    "Pravdepodobnosť a štatistika",
    "Didaktika matematiky",
];

/// Line prefixes of syllabus boilerplate that never belong to a theme.
pub const DEFAULT_BOILERPLATE_PREFIXES: &[&str] = &[
    "Tematické okruhy",
    "Okruhy otázok",
    "Študijný program",
    "Študijný odbor",
    "Štátna skúška",
    "Predmet štátnej skúšky",
    "Pokyny",
    "Strana ",
];

/// Closed allow/deny lists driving the segmentation.
#[derive(Debug, Clone)]
pub struct ParserRules {
    pub course_titles: Vec<String>,
    pub boilerplate_prefixes: Vec<String>,
}

impl Default for ParserRules {
    fn default() -> Self {
        Self {
            course_titles: DEFAULT_COURSE_TITLES.iter().map(|s| s.to_string()).collect(),
            boilerplate_prefixes: DEFAULT_BOILERPLATE_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ParserRules {
    fn is_boilerplate(&self, line: &str) -> bool {
        self.boilerplate_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }

    fn is_course_title(&self, line: &str) -> bool {
        self.course_titles.iter().any(|title| title == line)
    }
}

struct PendingTheme {
    number: i64,
    text: String,
}

fn theme_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.\s*(.+)$").unwrap())
}

fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)(?:\[(.*)\]|\((.*)\))\s*$").unwrap())
}

/// Parse extracted syllabus text into courses and themes.
pub fn parse_curriculum_text(text: &str, rules: &ParserRules) -> ParsedCurriculum {
    let mut courses: Vec<Course> = Vec::new();
    let mut pending: Option<PendingTheme> = None;
    let mut global_order: i64 = 1;

    for raw in text.lines() {
        let line = clean_line(raw);
        if line.is_empty() || rules.is_boilerplate(&line) {
            continue;
        }

        if rules.is_course_title(&line) {
            flush_theme(&mut courses, pending.take(), &mut global_order);
            courses.push(Course {
                slug: slugify(&line),
                order: courses.len() as i64 + 1,
                title: line,
                themes: Vec::new(),
            });
            continue;
        }

        if let Some(caps) = theme_start_re().captures(&line) {
            flush_theme(&mut courses, pending.take(), &mut global_order);
            // Ordinals too large for i64 are not theme numbers.
            if let Ok(number) = caps[1].parse::<i64>() {
                pending = Some(PendingTheme {
                    number,
                    text: caps[2].to_string(),
                });
            }
            continue;
        }

        if let Some(theme) = pending.as_mut() {
            theme.text.push(' ');
            theme.text.push_str(&line);
        }
    }

    flush_theme(&mut courses, pending.take(), &mut global_order);

    ParsedCurriculum { courses }
}

/// Finalize a pending theme into the current (last) course.
///
/// Themes seen before the first course heading have no owner and are dropped.
fn flush_theme(courses: &mut [Course], pending: Option<PendingTheme>, global_order: &mut i64) {
    let Some(pending) = pending else {
        return;
    };
    let Some(course) = courses.last_mut() else {
        return;
    };

    let source_text = clean_line(&pending.text);
    let (title_part, annotation) = match annotation_re().captures(&source_text) {
        Some(caps) => {
            let annotation = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string());
            (caps[1].to_string(), annotation)
        }
        None => (source_text.clone(), None),
    };

    let title = clean_line(title_part.trim().trim_end_matches(['-', '–']));
    let subthemes = annotation
        .map(|a| {
            a.split(',')
                .map(clean_line)
                .filter(|piece| !piece.is_empty())
                .collect()
        })
        .unwrap_or_default();

    course.themes.push(Theme {
        slug: format!("{}-{}-{}", course.slug, pending.number, slugify(&title)),
        normalized_title: normalize_text(&title),
        number: pending.number,
        title,
        subthemes,
        source_text,
        order: *global_order,
    });
    *global_order += 1;
}
