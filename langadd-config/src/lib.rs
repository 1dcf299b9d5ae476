//! Shared configuration loader for add-language.
//!
//! `defaults/langadd.default.toml` is embedded into the binary so the documented
//! defaults and runtime behavior stay in sync. Callers layer a repository's
//! `langadd.toml`, an explicit file and CLI overrides on top via [`Loader`] before
//! deserializing into [`LangaddConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use langadd_core::{ChoicePattern, Generator, Invocation, RepoLayout, WorkflowOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/langadd.default.toml");

/// Per-repository configuration file, looked up in the repository root.
pub const PROJECT_FILE: &str = "langadd.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LangaddConfig {
    pub paths: PathsConfig,
    pub grammar: GrammarConfig,
    pub generator: GeneratorConfig,
    pub status: StatusConfig,
}

/// Artifact locations, relative to the repository root.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub grammar_source: PathBuf,
    pub grammar_json: PathBuf,
    pub node_types: PathBuf,
}

/// How the language choice is found in the grammar source.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarConfig {
    pub marker: String,
    pub rule: String,
    pub anchor: String,
    pub skip_existing: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub program: String,
    pub version_args: Vec<String>,
    pub generate_args: Vec<String>,
    pub install_hint: String,
}

/// Command whose output closes the run.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl LangaddConfig {
    pub fn layout(&self, root: impl Into<PathBuf>) -> RepoLayout {
        RepoLayout::new(root)
            .with_grammar_source(&self.paths.grammar_source)
            .with_grammar_json(&self.paths.grammar_json)
            .with_node_types(&self.paths.node_types)
    }

    pub fn workflow_options(&self) -> WorkflowOptions {
        let generator = &self.generator;
        WorkflowOptions {
            pattern: ChoicePattern {
                marker: self.grammar.marker.clone(),
                rule: self.grammar.rule.clone(),
                anchor: self.grammar.anchor.clone(),
            },
            skip_existing: self.grammar.skip_existing,
            generator: Generator {
                version: Invocation::new(&generator.program, &generator.version_args),
                generate: Invocation::new(&generator.program, &generator.generate_args),
                install_hint: generator.install_hint.clone(),
            },
            status: Invocation::new(&self.status.program, &self.status.args),
        }
    }
}

/// Helper for layering overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `<root>/langadd.toml` if the repository has one.
    pub fn with_project_file(self, root: impl AsRef<Path>) -> Self {
        self.with_optional_file(root.as_ref().join(PROJECT_FILE))
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<LangaddConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<LangaddConfig, ConfigError> {
    Loader::new().build()
}
