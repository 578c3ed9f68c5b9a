//! # studyhall
//!
//! One-shot importer for a personal study tracker: turns a typeset syllabus
//! PDF into a course → theme → subtheme tree and a DOCX notes manuscript
//! into ordered, typed note blocks attached to those themes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐
//! │ PDF      │──▶│ curriculum │──▶│              │
//! │ pdftotext│   │ parser     │   │   SQLite     │
//! └──────────┘   └────────────┘   │ courses      │
//!                                 │ themes       │
//! ┌──────────┐   ┌────────────┐   │ note_blocks  │
//! │ DOCX     │──▶│ walker +   │──▶│ images       │
//! │ ooxml    │   │ resolver + │   └──────────────┘
//! └──────────┘   │ assembler  │          │
//!                └────────────┘          ▼
//!                                 ┌──────────────┐
//!                                 │ CLI          │
//!                                 │ (studyhall)  │
//!                                 └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`normalize`] | Diacritic-insensitive normalization, slugs, similarity |
//! | [`curriculum`] | Syllabus text → courses and themes |
//! | [`pdf`] | PDF text extraction backends |
//! | [`ooxml`] | Office package reader and XML tree |
//! | [`walker`] | Document-order walk of the DOCX body |
//! | [`resolver`] | Heading → theme matching |
//! | [`assemble`] | Note block assembly |
//! | [`extract`] | Extraction entry points and errors |
//! | [`markdown`] | Canonical markdown rendering |
//! | [`storage`] | Image storage |
//! | [`store`] | SQLite reads and writes |
//! | [`import`] | Import orchestration |
//! | [`progress`] | Import progress reporting |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod assemble;
pub mod config;
pub mod curriculum;
pub mod db;
pub mod extract;
pub mod import;
pub mod markdown;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod ooxml;
pub mod pdf;
pub mod progress;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod walker;
