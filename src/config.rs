//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/detangle/detangle.toml`
//! 3. Local config: `./.detangle.toml`, or the file passed with `--config`
//! 4. Environment variables: `DETANGLE_*` prefix, `__` between section and key
//!    (e.g. `DETANGLE_OPTIMIZER__MAX_COUNT=200`)
//!
//! Command line flags are applied on top by the CLI layer.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::WeightedObjective;

/// Search schedule for the optimizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Random increments applied per proposal at the start
    pub starting_intensity: usize,
    /// Rejected steps tolerated before the intensity is reduced
    pub plateau_before_cooling: usize,
    /// Maximum number of full passes over all trees
    pub max_count: usize,
    /// Rejected steps tolerated at intensity 1 before stopping
    pub plateau_before_stop: usize,
    /// Factor applied to the intensity on each cooling event
    pub intensity_reduction: f64,
    /// Keep the first-loaded tree fixed
    pub skip_first_tree: bool,
    /// Seed for reproducible runs; drawn from the OS when absent
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            starting_intensity: 50,
            plateau_before_cooling: 50,
            max_count: 5000,
            plateau_before_stop: 5000,
            intensity_reduction: 0.99,
            skip_first_tree: false,
            seed: None,
        }
    }
}

/// What to do when two trees being compared do not share their leaves.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedLeafPolicy {
    /// Leave unmatched positions out of the pair's metrics
    #[default]
    Skip,
    /// Refuse to load such a tree set
    Strict,
}

/// Weights of the minimized objective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectiveConfig {
    pub flatness_weight: f64,
    pub crossing_weight: f64,
    pub alpha_weight: f64,
    pub unmatched_leaves: UnmatchedLeafPolicy,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        let weights = WeightedObjective::default();
        Self {
            flatness_weight: weights.flatness,
            crossing_weight: weights.crossing,
            alpha_weight: weights.alpha,
            unmatched_leaves: UnmatchedLeafPolicy::default(),
        }
    }
}

impl ObjectiveConfig {
    pub fn weighted(&self) -> WeightedObjective {
        WeightedObjective::new(self.flatness_weight, self.crossing_weight, self.alpha_weight)
    }
}

/// Checkpoint file locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving all checkpoint files
    pub dir: PathBuf,
    /// Written before the search starts and after it ends
    pub canonical: String,
    /// Alternating checkpoint slots written on every improvement
    pub slot_one: String,
    pub slot_two: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            canonical: "result.dat".into(),
            slot_one: "result1.dat".into(),
            slot_two: "result2.dat".into(),
        }
    }
}

/// Unified configuration for detangle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub optimizer: OptimizerConfig,
    pub objective: ObjectiveConfig,
    pub output: OutputConfig,
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "detangle").map(|dirs| dirs.config_dir().join("detangle.toml"))
}

/// Local config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".detangle.toml";

/// Environment variable source with the documented naming scheme.
pub fn environment() -> Environment {
    Environment::with_prefix("DETANGLE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// An explicit `config_file` replaces the `./.detangle.toml` lookup and
    /// must exist.
    pub fn load(config_file: Option<&Path>) -> ApplicationResult<Self> {
        let local = config_file
            .map(|p| (p.to_path_buf(), true))
            .unwrap_or_else(|| (PathBuf::from(LOCAL_CONFIG_FILE), false));
        Self::load_layers(global_config_path().as_deref(), Some(local), environment())
    }

    /// Load from explicit layers. `local` carries whether the file is required.
    pub fn load_layers(
        global: Option<&Path>,
        local: Option<(PathBuf, bool)>,
        env: Environment,
    ) -> ApplicationResult<Self> {
        // 1. Defaults
        let mut builder =
            Config::builder().add_source(Config::try_from(&Settings::default()).map_err(config_err)?);

        // 2. Global config
        if let Some(global_path) = global {
            builder = builder.add_source(File::from(global_path).required(false));
        }

        // 3. Local config
        if let Some((local_path, required)) = local {
            if required && !local_path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local_path.display()),
                });
            }
            builder = builder.add_source(File::from(local_path).required(required));
        }

        // 4. Environment variables
        builder = builder.add_source(env);

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the output directory.
    fn expand_paths(&mut self) {
        let raw = self.output.dir.to_string_lossy().into_owned();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.output.dir = PathBuf::from(expanded.as_ref());
        }
    }

    /// Reject values the optimizer cannot work with.
    pub fn validate(&self) -> ApplicationResult<()> {
        let reduction = self.optimizer.intensity_reduction;
        if !(reduction > 0.0 && reduction <= 1.0) {
            return Err(invalid(format!(
                "optimizer.intensity_reduction must be in (0, 1], got {reduction}"
            )));
        }
        for (key, weight) in [
            ("flatness_weight", self.objective.flatness_weight),
            ("crossing_weight", self.objective.crossing_weight),
            ("alpha_weight", self.objective.alpha_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(format!(
                    "objective.{key} must be a finite, non-negative number, got {weight}"
                )));
            }
        }
        for (key, name) in [
            ("canonical", &self.output.canonical),
            ("slot_one", &self.output.slot_one),
            ("slot_two", &self.output.slot_two),
        ] {
            if name.trim().is_empty() {
                return Err(invalid(format!("output.{key} must not be empty")));
            }
        }
        if self.output.slot_one == self.output.slot_two {
            return Err(invalid("output.slot_one and output.slot_two must differ".into()));
        }
        for (key, slot) in [
            ("slot_one", &self.output.slot_one),
            ("slot_two", &self.output.slot_two),
        ] {
            if *slot == self.output.canonical {
                return Err(invalid(format!("output.canonical and output.{key} must differ")));
            }
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# detangle configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/detangle/detangle.toml
#   Local:  ./.detangle.toml (or --config <file>)
#   Env:    DETANGLE_<SECTION>__<KEY>, e.g. DETANGLE_OPTIMIZER__SEED=7

[optimizer]
# Random increments per proposal at the start of the search
# starting_intensity = 50
# Rejected steps before the intensity is multiplied by intensity_reduction
# plateau_before_cooling = 50
# intensity_reduction = 0.99
# Upper bound on full passes over all trees
# max_count = 5000
# Rejected steps at intensity 1 before the search stops
# plateau_before_stop = 5000
# Keep the first loaded tree fixed
# skip_first_tree = false
# Fix the random seed for reproducible runs
# seed = 42

[objective]
# objective = flatness * flatness_weight + crossings * crossing_weight + alpha * alpha_weight
# flatness_weight = 1.0
# crossing_weight = 1.0
# alpha_weight = 0.5
# "skip" ignores leaves missing from a partner tree, "strict" refuses to load them
# unmatched_leaves = "skip"

[output]
# dir = "."
# canonical = "result.dat"
# slot_one = "result1.dat"
# slot_two = "result2.dat"
"#
        .to_string()
    }
}

fn invalid(message: String) -> ApplicationError {
    ApplicationError::Config { message }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load_layers(None, None, env_from(&[])).expect("load defaults");

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.optimizer.starting_intensity, 50);
        assert_eq!(settings.optimizer.plateau_before_cooling, 50);
        assert_eq!(settings.optimizer.max_count, 5000);
        assert_eq!(settings.optimizer.plateau_before_stop, 5000);
        assert_eq!(settings.optimizer.intensity_reduction, 0.99);
        assert!(!settings.optimizer.skip_first_tree);
        assert_eq!(settings.objective.weighted(), WeightedObjective::default());
    }

    #[test]
    fn given_env_vars_when_loading_then_they_override_defaults() {
        let env = env_from(&[
            ("DETANGLE_OPTIMIZER__MAX_COUNT", "12"),
            ("DETANGLE_OPTIMIZER__SKIP_FIRST_TREE", "true"),
            ("DETANGLE_OPTIMIZER__SEED", "7"),
            ("DETANGLE_OBJECTIVE__ALPHA_WEIGHT", "0"),
        ]);

        let settings = Settings::load_layers(None, None, env).unwrap();

        assert_eq!(settings.optimizer.max_count, 12);
        assert!(settings.optimizer.skip_first_tree);
        assert_eq!(settings.optimizer.seed, Some(7));
        assert_eq!(settings.objective.alpha_weight, 0.0);
    }

    #[test]
    fn given_tilde_in_output_dir_when_loading_then_expands_to_home() {
        let env = env_from(&[("DETANGLE_OUTPUT__DIR", "~/tangles")]);

        let settings = Settings::load_layers(None, None, env).unwrap();

        let home = std::env::var("HOME").expect("HOME should be set");
        let dir = settings.output.dir.to_string_lossy();
        assert!(dir.starts_with(&home), "{dir}");
        assert!(!dir.contains('~'), "{dir}");
    }

    #[test]
    fn given_missing_required_file_when_loading_then_errors() {
        let result = Settings::load_layers(
            None,
            Some((PathBuf::from("/nonexistent/detangle.toml"), true)),
            env_from(&[]),
        );
        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_bad_reduction_when_validating_then_errors() {
        let mut settings = Settings::default();
        settings.optimizer.intensity_reduction = 1.5;
        assert!(settings.validate().is_err());

        settings.optimizer.intensity_reduction = 0.0;
        assert!(settings.validate().is_err());

        settings.optimizer.intensity_reduction = 1.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn given_negative_weight_or_same_slots_when_validating_then_errors() {
        let mut settings = Settings::default();
        settings.objective.crossing_weight = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.output.slot_two = settings.output.slot_one.clone();
        assert!(settings.validate().is_err());
    }

    #[rstest]
    #[case("result1.dat", "slot_one")]
    #[case("result2.dat", "slot_two")]
    fn given_canonical_equal_to_slot_when_validating_then_errors(
        #[case] canonical: &str,
        #[case] key: &str,
    ) {
        let mut settings = Settings::default();
        settings.output.canonical = canonical.into();

        match settings.validate() {
            Err(ApplicationError::Config { message }) => {
                assert!(message.contains(&format!("output.{key}")), "{message}");
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn given_template_when_parsed_then_yields_defaults() {
        let parsed: Settings = toml::from_str(&Settings::template()).unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn given_settings_when_serialized_then_round_trips() {
        let mut settings = Settings::default();
        settings.optimizer.seed = Some(3);
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
