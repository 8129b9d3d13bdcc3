use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::search::SearchOptions;

const DEFAULT_SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Defaults rendered by `--print-default-config`.
const DEFAULT_CONFIG_TOML: &str = r#"# findmark configuration

[search]
# Initial state of the match-case toggle.
case_sensitive = false
# Initial state of the regular-expression toggle.
use_regex = false

[highlight]
# Element wrapped around each match.
tag = "mark"
# Class carried by every marker.
class = "findmark-highlight"
# Extra class carried by the current marker.
current_class = "current"

[enumerate]
# Text whose nearest element has one of these tags is never searched.
skip_tags = ["script", "style", "noscript", "template"]
"#;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub search: SearchConfig,
    pub highlight: HighlightConfig,
    pub enumerate: EnumerateConfig,
}

/// Initial search toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchConfig {
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl SearchConfig {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            case_sensitive: self.case_sensitive,
            use_regex: self.use_regex,
        }
    }
}

/// How match markers are represented in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    pub tag: String,
    pub class: String,
    pub current_class: String,
}

/// Which text is eligible for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerateConfig {
    pub skip_tags: Vec<String>,
}

/// Errors that can occur during config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

// ── Serde intermediate structs (unknown keys are ignored) ───────────────

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    search: RawSearchConfig,
    highlight: RawHighlightConfig,
    enumerate: RawEnumerateConfig,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSearchConfig {
    case_sensitive: bool,
    use_regex: bool,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawHighlightConfig {
    tag: String,
    class: String,
    current_class: String,
}

impl Default for RawHighlightConfig {
    fn default() -> Self {
        let defaults = HighlightConfig::default();
        Self {
            tag: defaults.tag,
            class: defaults.class,
            current_class: defaults.current_class,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawEnumerateConfig {
    skip_tags: Vec<String>,
}

impl Default for RawEnumerateConfig {
    fn default() -> Self {
        Self {
            skip_tags: EnumerateConfig::default().skip_tags,
        }
    }
}

// ── Default impls ───────────────────────────────────────────────────────

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            tag: "mark".to_string(),
            class: "findmark-highlight".to_string(),
            current_class: "current".to_string(),
        }
    }
}

impl Default for EnumerateConfig {
    fn default() -> Self {
        Self {
            skip_tags: DEFAULT_SKIP_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

// ── Config implementation ───────────────────────────────────────────────

impl Config {
    /// Load config from a TOML file path. Returns defaults if file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Parse a TOML string into a Config.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let config = Self {
            search: SearchConfig {
                case_sensitive: raw.search.case_sensitive,
                use_regex: raw.search.use_regex,
            },
            highlight: HighlightConfig {
                tag: raw.highlight.tag.to_ascii_lowercase(),
                class: raw.highlight.class,
                current_class: raw.highlight.current_class,
            },
            enumerate: EnumerateConfig {
                skip_tags: raw
                    .enumerate
                    .skip_tags
                    .into_iter()
                    .map(|t| t.to_ascii_lowercase())
                    .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the config, returning an error if any values are unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_name("highlight tag", &self.highlight.tag)?;
        if self.highlight.tag.starts_with('#') {
            return Err(ConfigError::Validation(format!(
                "highlight tag '{}' must not start with '#'",
                self.highlight.tag
            )));
        }
        check_name("highlight class", &self.highlight.class)?;
        check_name("highlight current_class", &self.highlight.current_class)?;
        if self.highlight.class == self.highlight.current_class {
            return Err(ConfigError::Validation(
                "highlight class and current_class must differ".to_string(),
            ));
        }
        for tag in &self.enumerate.skip_tags {
            check_name("skip tag", tag)?;
        }
        if self
            .enumerate
            .skip_tags
            .iter()
            .any(|t| t == &self.highlight.tag)
        {
            log::warn!(
                "skip_tags contains the highlight tag '{}'; text inside any such element is ignored",
                self.highlight.tag
            );
        }
        Ok(())
    }

    /// The default configuration as commented TOML.
    pub fn print_default() -> &'static str {
        DEFAULT_CONFIG_TOML
    }

    /// Default config file location (~/.config/findmark/config.toml).
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        home.join(".config").join("findmark").join("config.toml")
    }
}

fn check_name(what: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{what} must not be empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "{what} '{value}' must not contain whitespace"
        )));
    }
    Ok(())
}
