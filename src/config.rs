use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::curriculum::ParserRules;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub curriculum: CurriculumConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./data/images")
}
fn default_public_base_url() -> String {
    "/images".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PdfConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            command: default_command(),
            args: default_args(),
        }
    }
}

fn default_backend() -> String {
    "command".to_string()
}
fn default_command() -> String {
    "pdftotext".to_string()
}
fn default_args() -> Vec<String> {
    vec!["-layout".to_string(), "-enc".to_string(), "UTF-8".to_string()]
}

/// Overrides for the syllabus allow/deny lists. Unset lists keep the
/// built-in defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CurriculumConfig {
    #[serde(default)]
    pub course_titles: Option<Vec<String>>,
    #[serde(default)]
    pub boilerplate_prefixes: Option<Vec<String>>,
}

impl CurriculumConfig {
    pub fn parser_rules(&self) -> ParserRules {
        let mut rules = ParserRules::default();
        if let Some(titles) = &self.course_titles {
            rules.course_titles = titles.clone();
        }
        if let Some(prefixes) = &self.boilerplate_prefixes {
            rules.boilerplate_prefixes = prefixes.clone();
        }
        rules
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.pdf.backend.as_str() {
        "command" => {
            if config.pdf.command.trim().is_empty() {
                anyhow::bail!("pdf.command must be set when pdf.backend is 'command'");
            }
        }
        "embedded" => {}
        other => anyhow::bail!(
            "Unknown pdf backend: '{}'. Must be command or embedded.",
            other
        ),
    }

    if let Some(titles) = &config.curriculum.course_titles {
        if titles.iter().all(|t| t.trim().is_empty()) {
            anyhow::bail!("curriculum.course_titles must list at least one course title");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"./data/studyhall.sqlite\"\n").unwrap();
        assert_eq!(config.pdf.backend, "command");
        assert_eq!(config.pdf.command, "pdftotext");
        assert_eq!(config.storage.public_base_url, "/images");
        let rules = config.curriculum.parser_rules();
        assert!(rules.course_titles.iter().any(|t| t == "Geometria"));
    }

    #[test]
    fn curriculum_lists_override_defaults() {
        let config = parse(
            r#"
[db]
path = "x.sqlite"

[curriculum]
course_titles = ["Algebra"]
"#,
        )
        .unwrap();
        let rules = config.curriculum.parser_rules();
        assert_eq!(rules.course_titles, vec!["Algebra"]);
        assert!(!rules.boilerplate_prefixes.is_empty());
    }

    #[test]
    fn rejects_unknown_backend_and_empty_titles() {
        assert!(parse("[db]\npath = \"x\"\n[pdf]\nbackend = \"ocr\"\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[curriculum]\ncourse_titles = []\n").is_err());
    }
}
