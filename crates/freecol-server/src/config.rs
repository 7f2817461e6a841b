//! Server configuration

use std::path::Path;
use std::sync::Arc;

use freecol_core::{
    load_rules, load_scenario, CompiledRules, GameOptions, GameState, RulesError, RulesSource,
    ScenarioError, ScenarioSource,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("rules: {0}")]
    Rules(#[from] RulesError),
    #[error("scenario: {0}")]
    Scenario(#[from] ScenarioError),
}

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Session seed; drawn at random when absent and logged at startup
    pub seed: Option<u64>,
    /// Ruleset directory; the embedded classic rules when absent
    pub rules_path: Option<String>,
    /// Scenario file; the embedded scenario when absent
    pub scenario_path: Option<String>,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Replaces the scenario's game options
    pub options: Option<GameOptions>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            rules_path: None,
            scenario_path: None,
            log_filter: "freecol_server=info".to_string(),
            options: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn load_rules(&self) -> Result<Arc<CompiledRules>, ConfigError> {
        let source = match &self.rules_path {
            Some(path) => RulesSource::Path(path.clone()),
            None => RulesSource::Embedded,
        };
        Ok(Arc::new(load_rules(source)?))
    }

    /// Builds the opening state, applying the configured options over the scenario's.
    pub fn load_state(&self, rules: &CompiledRules) -> Result<GameState, ConfigError> {
        let source = match &self.scenario_path {
            Some(path) => ScenarioSource::Path(path.clone()),
            None => ScenarioSource::Embedded,
        };
        let mut state = load_scenario(rules, source)?;
        if let Some(options) = &self.options {
            state.options = options.clone();
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: ServerConfig =
            serde_yaml::from_str("seed: 1492\noptions:\n  tension_war_threshold: 250\n")
                .expect("config");
        assert_eq!(config.seed, Some(1492));
        assert_eq!(config.log_filter, "freecol_server=info");
        let options = config.options.expect("options");
        assert_eq!(options.tension_war_threshold, 250);
        assert!(options.equipment_capture);
    }

    #[test]
    fn options_override_the_scenario() {
        let config = ServerConfig {
            options: Some(GameOptions {
                amphibious_moves: true,
                ..GameOptions::default()
            }),
            ..ServerConfig::default()
        };
        let rules = config.load_rules().expect("rules");
        let state = config.load_state(&rules).expect("state");
        assert!(state.options.amphibious_moves);
    }
}
