use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

/// Per-project settings, read from `.archlens/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub layers: LayerPolicy,
    #[serde(default)]
    pub cycles: CycleConfig,
}

/// Options accepted by the graph processor for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Collapse everything deeper than this onto its ancestor at this depth.
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub outgoing: DegreeRange,
    #[serde(default)]
    pub incoming: DegreeRange,
    #[serde(default = "default_true")]
    pub include_self_edges: bool,
    #[serde(default = "default_containment_label")]
    pub containment_label: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            outgoing: DegreeRange::default(),
            incoming: DegreeRange::default(),
            include_self_edges: default_true(),
            containment_label: default_containment_label(),
        }
    }
}

/// Inclusive bounds on a node's distinct-neighbour count; unset bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeRange {
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
}

impl DegreeRange {
    #[must_use]
    pub const fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    #[must_use]
    pub fn contains(&self, count: usize) -> bool {
        self.min.is_none_or(|min| count >= min) && self.max.is_none_or(|max| count <= max)
    }
}

/// Allowed dependency direction between architectural layers.
///
/// `order` lists layer names top first; a layer may depend on itself or on
/// any layer listed after it. `allow` adds explicit exceptions. An empty
/// `order` disables the rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPolicy {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub allow: Vec<LayerRule>,
}

impl LayerPolicy {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.order.is_empty()
    }
}

/// An explicitly permitted `from -> to` layer dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRule {
    pub from: String,
    pub to: String,
}

/// Bounds for the in-memory cycle search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Longest cycle (in edges) the search will follow.
    #[serde(default = "default_cycle_depth")]
    pub max_depth: usize,
    /// Stop collecting after this many cycles.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_depth: default_cycle_depth(),
            max_cycles: default_max_cycles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".archlens/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("archlens/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(
        cli_json,
        user.output.clone(),
        env_format,
        std::io::stdout().is_terminal(),
    );

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
    is_tty: bool,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if is_tty { "pretty" } else { "text" }.to_string()
}

const fn default_true() -> bool {
    true
}

fn default_containment_label() -> String {
    "CONTAINS".to_string()
}

const fn default_cycle_depth() -> usize {
    32
}

const fn default_max_cycles() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.processor.max_depth, None);
        assert!(cfg.processor.include_self_edges);
        assert_eq!(cfg.processor.containment_label, "CONTAINS");
        assert!(!cfg.layers.is_enabled());
        assert_eq!(cfg.cycles.max_depth, 32);
        assert_eq!(cfg.cycles.max_cycles, 10_000);
    }

    #[test]
    fn project_config_parses_all_sections() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        std::fs::create_dir_all(root.path().join(".archlens")).expect("create .archlens");
        std::fs::write(
            root.path().join(".archlens/config.toml"),
            r#"
[processor]
max_depth = 2
include_self_edges = false

[processor.outgoing]
min = 1

[layers]
order = ["presentation", "application", "domain", "infrastructure"]
allow = [{ from = "infrastructure", to = "domain" }]

[cycles]
max_depth = 8
"#,
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.processor.max_depth, Some(2));
        assert!(!cfg.processor.include_self_edges);
        assert_eq!(cfg.processor.outgoing, DegreeRange::new(Some(1), None));
        assert!(cfg.processor.incoming.is_unbounded());
        assert_eq!(cfg.layers.order.len(), 4);
        assert_eq!(cfg.layers.allow[0].from, "infrastructure");
        assert_eq!(cfg.cycles.max_depth, 8);
        assert_eq!(cfg.cycles.max_cycles, 10_000);
    }

    #[test]
    fn invalid_project_config_reports_path() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        std::fs::create_dir_all(root.path().join(".archlens")).expect("create .archlens");
        std::fs::write(root.path().join(".archlens/config.toml"), "processor = 3")
            .expect("write config");

        let err = load_project_config(root.path()).expect_err("parse must fail");
        assert!(err.to_string().contains("Failed to parse"), "{err}");
    }

    #[test]
    fn degree_range_bounds_are_inclusive() {
        let range = DegreeRange::new(Some(1), Some(3));
        assert!(!range.contains(0));
        assert!(range.contains(1));
        assert!(range.contains(3));
        assert!(!range.contains(4));
        assert!(DegreeRange::default().contains(usize::MAX));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()), true);
        assert_eq!(output, "json");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        let pretty = resolve_output(false, Some("table".to_string()), Some("human".to_string()), false);
        assert_eq!(pretty, "pretty");

        let text = resolve_output(false, Some("human".to_string()), Some("table".to_string()), true);
        assert_eq!(text, "text");
    }

    #[test]
    fn tty_detection_is_the_last_resort() {
        assert_eq!(resolve_output(false, None, None, true), "pretty");
        assert_eq!(resolve_output(false, None, Some("bogus".to_string()), false), "text");
    }
}
