use crate::action::OperationRegistry;
use crate::error::{FluxaError, Result};
use crate::orchestrator::DEFAULT_MAX_ATTEMPTS;
use crate::rules::OperationRules;
use crate::validate::Validator;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "fluxa.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GeneratorConfig
// ---------------------------------------------------------------------------

/// Chat-completions backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generator_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_true")]
    pub few_shot: bool,
}

fn default_model() -> String {
    "gpt-5.1".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_generator_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_true() -> bool {
    true
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_generator_timeout(),
            max_attempts: default_max_attempts(),
            few_shot: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

/// Documentation-reading agent settings. `None` fields fall back to the
/// agent CLI's own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_path: Option<PathBuf>,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_agent_timeout")]
    pub timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
}

fn default_max_turns() -> u32 {
    40
}

fn default_agent_timeout() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            docs_path: None,
            max_turns: default_max_turns(),
            timeout_seconds: default_agent_timeout(),
            executable: None,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig / ExtractionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_indent")]
    pub indent: usize,
    #[serde(default = "default_true")]
    pub add_metadata: bool,
    #[serde(default = "default_true")]
    pub validate: bool,
}

fn default_indent() -> usize {
    2
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            add_metadata: true,
            validate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_youtube_max")]
    pub youtube_max_length: usize,
    #[serde(default = "default_web_max")]
    pub web_max_length: usize,
    #[serde(default = "default_web_timeout")]
    pub web_timeout_seconds: u64,
}

fn default_youtube_max() -> usize {
    50_000
}

fn default_web_max() -> usize {
    100_000
}

fn default_web_timeout() -> u64 {
    30
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            youtube_max_length: default_youtube_max(),
            web_max_length: default_web_max(),
            web_timeout_seconds: default_web_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Operation names recognized in addition to the built-in registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
    /// Overrides merged over the built-in rules table.
    #[serde(default)]
    pub rules: OperationRules,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FluxaError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        // An empty file deserializes to unit, not a mapping.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// `explicit` if given (must exist), else `dir/fluxa.yaml` when present,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn registry(&self) -> OperationRegistry {
        OperationRegistry::with_extra(self.operations.iter().cloned())
    }

    /// Built-in rules with `rules` layered on top.
    pub fn effective_rules(&self) -> OperationRules {
        OperationRules::builtin().merged(&self.rules)
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.registry(), self.effective_rules())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.generator.max_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "generator.max_attempts is 0; at least one attempt is always made"
                    .to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.generator.temperature) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "generator.temperature {} is outside 0..=2",
                    self.generator.temperature
                ),
            });
        }

        if self.generator.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "generator.model is empty".to_string(),
            });
        }

        if self.output.indent > 16 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("output.indent {} is unusually large", self.output.indent),
            });
        }

        for (op, param) in self.rules.inverted_bounds() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("rules.bounds.{op}.{param}: min is greater than max"),
            });
        }

        if let Some(docs) = &self.agent.docs_path {
            if !docs.exists() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("agent.docs_path '{}' does not exist", docs.display()),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ParamBound;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.generator.model, "gpt-5.1");
        assert_eq!(cfg.generator.base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.generator.max_tokens, 4000);
        assert_eq!(cfg.generator.timeout_seconds, 60);
        assert_eq!(cfg.generator.max_attempts, 3);
        assert!(cfg.generator.few_shot);
        assert_eq!(cfg.agent.max_turns, 40);
        assert_eq!(cfg.agent.timeout_seconds, 120);
        assert_eq!(cfg.output.indent, 2);
        assert!(cfg.output.add_metadata && cfg.output.validate);
        assert_eq!(cfg.extraction.youtube_max_length, 50_000);
        assert_eq!(cfg.extraction.web_max_length, 100_000);
        assert_eq!(cfg.extraction.web_timeout_seconds, 30);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "generator:\n  model: gpt-4o\n  max_attempts: 5\noutput:\n  indent: 4\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.generator.model, "gpt-4o");
        assert_eq!(cfg.generator.max_attempts, 5);
        assert_eq!(cfg.generator.max_tokens, 4000);
        assert_eq!(cfg.output.indent, 4);
        assert!(cfg.output.add_metadata);
        assert_eq!(cfg.agent, AgentConfig::default());
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn discover_prefers_explicit_then_local_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "output:\n  indent: 8\n").unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap().output.indent, 8);

        let other = dir.path().join("other.yaml");
        std::fs::write(&other, "output:\n  indent: 3\n").unwrap();
        assert_eq!(
            Config::discover(Some(&other), dir.path()).unwrap().output.indent,
            3
        );

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            Config::discover(Some(&missing), dir.path()),
            Err(FluxaError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fluxa.yaml");
        std::fs::write(&path, "operations:\n  - liquify\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.operations, vec!["liquify"]);
        assert!(cfg.registry().contains("liquify"));
    }

    #[test]
    fn configured_bounds_on_file_operations_are_enforced() {
        let cfg = Config::from_yaml("rules:\n  bounds:\n    save:\n      quality: {min: 0, max: 12}\n")
            .unwrap();
        assert!(cfg.validate().is_empty());

        let report = cfg.validator().validate(&json!([
            {"operation": "save", "in": {"_kind": "local", "_path": "/o.jpg"}, "quality": 99}
        ]));
        assert!(report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("quality"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = Config::from_yaml("generator: [oops").unwrap_err();
        assert!(matches!(err, FluxaError::Yaml(_)));
    }

    #[test]
    fn validator_uses_extra_operations_and_rule_overrides() {
        let yaml = "operations: [liquify]\nrules:\n  bounds:\n    emboss:\n      height:\n        min: 1\n        max: 10\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        let validator = cfg.validator();
        assert!(validator.registry().contains("liquify"));

        let report = validator.validate(&json!([
            {"operation": "liquify"},
            {"operation": "emboss", "amount": 100, "angle": 0, "height": 50}
        ]));
        assert!(report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("height"));
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.generator.max_attempts = 0;
        cfg.generator.temperature = 3.5;
        cfg.output.indent = 40;
        cfg.rules
            .bounds
            .entry("emboss".to_string())
            .or_default()
            .insert("amount".to_string(), ParamBound::new(10.0, 1.0));

        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 4);
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count(),
            2
        );
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("rules.bounds.emboss.amount")));
    }
}
