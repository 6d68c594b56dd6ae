//! Harness configuration (TOML).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Runner configuration.
///
/// Missing fields default to the values the runner uses when no file is given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Maximum number of effects a single run may accumulate.
    pub max_effects: usize,

    pub render: RenderConfig,
}

/// Layout limits for rendered values in diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Spaces per indentation level.
    pub tab_width: usize,
    /// Containers nested deeper than this are collapsed to `{…} (n)`.
    pub max_depth: usize,
    /// Containers longer than this show only their first elements.
    pub max_items: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tab_width: 2,
            max_depth: 6,
            max_items: 50,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_effects: 100,
            render: RenderConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_effects == 0 {
            return Err(anyhow!("max_effects must be > 0"));
        }
        if self.render.tab_width == 0 {
            return Err(anyhow!("render.tab_width must be > 0"));
        }
        if self.render.max_depth == 0 {
            return Err(anyhow!("render.max_depth must be > 0"));
        }
        if self.render.max_items == 0 {
            return Err(anyhow!("render.max_items must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
