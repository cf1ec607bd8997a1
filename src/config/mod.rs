//! Rule thresholds and switches for a checking run
//!
//! Architecture: one immutable `RuleConfig` per run, loaded from YAML or built
//! in code, then passed by reference into every checker.

use crate::domain::{Category, NettError, NettResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILES: &[&str] = &["nett.yaml", ".nett.yaml"];

/// Style thresholds shared by every checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Configuration format version
    pub version: String,
    /// Spaces per nesting level
    pub indent_width: u32,
    /// Extra indent for wrapped lines of a statement, twice `indent_width`
    /// when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_indent: Option<u32>,
    /// Tabs expand to the next multiple of this width
    pub tab_width: u32,
    pub max_line_length: u32,
    /// Longest function, counted from its first line to its closing brace
    pub max_function_length: u32,
    /// Per-category cap on annotations written into `.styled` files
    pub max_annotations_per_category: usize,
    pub hungarian: HungarianConfig,
    /// Categories whose findings are dropped
    pub disabled_categories: Vec<Category>,
    /// Extensions picked up when a directory is given as input
    pub extensions: Vec<String>,
    /// Glob patterns skipped during directory discovery
    pub exclude: Vec<String>,
}

/// Hungarian notation detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HungarianConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Extra lowercase prefixes rejected on any variable when followed by an
    /// upper-case letter, e.g. `i` rejects `iCount`
    pub extra_prefixes: Vec<String>,
}

impl Default for HungarianConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_prefixes: Vec::new(),
        }
    }
}

impl RuleConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> NettResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            NettError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            NettError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> NettResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| NettError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// First default config file present in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            indent_width: 4,
            continuation_indent: None,
            tab_width: 4,
            max_line_length: 80,
            max_function_length: 50,
            max_annotations_per_category: 15,
            hungarian: HungarianConfig::default(),
            disabled_categories: Vec::new(),
            extensions: vec!["c".to_string(), "h".to_string()],
            exclude: vec!["**/*.styled".to_string()],
        }
    }

    /// Extra indent expected on wrapped lines
    pub fn continuation_width(&self) -> u32 {
        self.continuation_indent
            .unwrap_or_else(|| self.indent_width.saturating_mul(2))
    }

    /// Validate thresholds and markers
    pub fn validate(&self) -> NettResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(NettError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        let positive = [
            ("indent_width", self.indent_width),
            ("continuation_indent", self.continuation_width()),
            ("tab_width", self.tab_width),
            ("max_line_length", self.max_line_length),
            ("max_function_length", self.max_function_length),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(NettError::config(format!("'{name}' must be greater than 0")));
            }
        }

        if self.disabled_categories.contains(&Category::Note) {
            return Err(NettError::config("NOTE cannot be disabled; it is not a rule category"));
        }

        for prefix in &self.hungarian.extra_prefixes {
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(NettError::config(format!(
                    "Invalid Hungarian prefix '{prefix}': expected lowercase ASCII letters"
                )));
            }
        }

        for pattern in &self.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                NettError::config(format!("Invalid exclude pattern '{pattern}': {e}"))
            })?;
        }

        Ok(())
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        !self.disabled_categories.contains(&category)
    }

    /// Whether a path's extension is one the checker handles
    pub fn handles_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|known| known == ext))
            .unwrap_or(false)
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> NettResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| NettError::config(format!("Failed to serialize config: {e}")))
    }

    pub fn to_yaml(&self) -> NettResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| NettError::config(format!("Failed to serialize config: {e}")))
    }

    /// Stable hash of every setting, printed in JSON reports
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.version.hash(&mut hasher);
        self.indent_width.hash(&mut hasher);
        self.continuation_indent.hash(&mut hasher);
        self.tab_width.hash(&mut hasher);
        self.max_line_length.hash(&mut hasher);
        self.max_function_length.hash(&mut hasher);
        self.max_annotations_per_category.hash(&mut hasher);
        self.hungarian.enabled.hash(&mut hasher);

        let mut prefixes = self.hungarian.extra_prefixes.clone();
        prefixes.sort();
        prefixes.hash(&mut hasher);

        let mut disabled = self.disabled_categories.clone();
        disabled.sort();
        disabled.hash(&mut hasher);

        self.extensions.hash(&mut hasher);
        self.exclude.hash(&mut hasher);

        format!("{:x}", hasher.finish())
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_true() -> bool {
    true
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: RuleConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RuleConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from disk
    pub fn from_config(config: RuleConfig) -> Self {
        Self { config }
    }

    pub fn indent_width(mut self, width: u32) -> Self {
        self.config.indent_width = width;
        self
    }

    pub fn continuation_indent(mut self, width: u32) -> Self {
        self.config.continuation_indent = Some(width);
        self
    }

    pub fn tab_width(mut self, width: u32) -> Self {
        self.config.tab_width = width;
        self
    }

    pub fn max_line_length(mut self, max: u32) -> Self {
        self.config.max_line_length = max;
        self
    }

    pub fn max_function_length(mut self, max: u32) -> Self {
        self.config.max_function_length = max;
        self
    }

    pub fn max_annotations_per_category(mut self, max: usize) -> Self {
        self.config.max_annotations_per_category = max;
        self
    }

    pub fn hungarian_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.hungarian.extra_prefixes.push(prefix.into());
        self
    }

    pub fn disable(mut self, category: Category) -> Self {
        if !self.config.disabled_categories.contains(&category) {
            self.config.disabled_categories.push(category);
        }
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.exclude.push(pattern.into());
        self
    }

    /// Build the final configuration
    pub fn build(self) -> NettResult<RuleConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RuleConfig::default();
        assert_eq!(config.indent_width, 4);
        assert_eq!(config.continuation_width(), 8);
        assert_eq!(config.tab_width, 4);
        assert_eq!(config.max_line_length, 80);
        assert_eq!(config.max_function_length, 50);
        assert_eq!(config.max_annotations_per_category, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() -> NettResult<()> {
        let config = RuleConfig::load_from_str("max_line_length: 79\ndisabled_categories: [WARNING]\n")?;
        assert_eq!(config.max_line_length, 79);
        assert_eq!(config.indent_width, 4);
        assert!(!config.is_enabled(Category::Warning));
        assert!(config.is_enabled(Category::Naming));
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RuleConfig::load_from_str("tab_width: 0\n").is_err());
        assert!(RuleConfig::load_from_str("version: \"2.0\"\n").is_err());
        assert!(RuleConfig::load_from_str("hungarian:\n  extra_prefixes: [\"Sz\"]\n").is_err());
        assert!(ConfigBuilder::new().exclude("[").build().is_err());
    }

    #[test]
    fn test_continuation_follows_indent_width() -> NettResult<()> {
        let narrow = RuleConfig::load_from_str("indent_width: 2\n")?;
        assert_eq!(narrow.continuation_indent, None);
        assert_eq!(narrow.continuation_width(), 4);

        let explicit = RuleConfig::load_from_str("indent_width: 2\ncontinuation_indent: 6\n")?;
        assert_eq!(explicit.continuation_width(), 6);

        assert!(RuleConfig::load_from_str("continuation_indent: 0\n").is_err());
        assert_eq!(ConfigBuilder::new().indent_width(3).build()?.continuation_width(), 6);
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> NettResult<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "indent_width: 2\ncontinuation_indent: 4")?;
        let config = RuleConfig::load_from_file(file.path())?;
        assert_eq!(config.indent_width, 2);
        assert_eq!(config.continuation_width(), 4);

        let missing = RuleConfig::load_from_file("/definitely/not/here.yaml");
        assert!(matches!(missing, Err(NettError::Configuration { .. })));
        Ok(())
    }

    #[test]
    fn test_fingerprint_stability() -> NettResult<()> {
        let a = ConfigBuilder::new()
            .hungarian_prefix("i")
            .hungarian_prefix("sz")
            .build()?;
        let b = ConfigBuilder::new()
            .hungarian_prefix("sz")
            .hungarian_prefix("i")
            .build()?;
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), RuleConfig::default().fingerprint());
        Ok(())
    }

    #[test]
    fn test_yaml_roundtrip() -> NettResult<()> {
        let config = ConfigBuilder::new().max_line_length(100).build()?;
        let again = RuleConfig::load_from_str(&config.to_yaml()?)?;
        assert_eq!(config, again);
        Ok(())
    }

    #[test]
    fn test_handles_extension() {
        let config = RuleConfig::default();
        assert!(config.handles_extension(Path::new("a/b.c")));
        assert!(config.handles_extension(Path::new("b.h")));
        assert!(!config.handles_extension(Path::new("b.cpp")));
        assert!(!config.handles_extension(Path::new("Makefile")));
    }
}
