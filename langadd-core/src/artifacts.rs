//! Reconciling the generated JSON artifacts
//!
//! `tree-sitter generate` rewrites `src/grammar.json` and `src/node-types.json` from
//! `grammar.js`. After it has run, each artifact is checked for the new language and the
//! entry is appended when missing. A file that already lists the language is not written
//! at all, so repeated runs leave it byte-identical.
//!
//! Both artifacts are handled through [`LanguageTable`]: where the per-language entries
//! live in the document, how an entry is recognised, and what a new entry looks like.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Result, UpdateError};
use crate::files::{read_text, write_atomic};
use crate::language::Language;

/// Result of reconciling one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Added,
    AlreadyPresent,
}

/// A JSON document holding one entry per supported language.
pub trait LanguageTable {
    /// The ordered list of entries inside `root`, or a description of what is missing.
    fn entries<'a>(&self, root: &'a mut Value) -> Result<&'a mut Vec<Value>, String>;

    fn matches(&self, entry: &Value, language: &Language) -> bool;

    fn entry(&self, language: &Language) -> Value;
}

/// `src/grammar.json`: the `STRING` members of `rules.<rule>`.
#[derive(Debug, Clone)]
pub struct GrammarDescription {
    rule: String,
}

impl GrammarDescription {
    pub fn new(rule: impl Into<String>) -> Self {
        Self { rule: rule.into() }
    }
}

impl Default for GrammarDescription {
    fn default() -> Self {
        Self::new("languageName")
    }
}

impl LanguageTable for GrammarDescription {
    fn entries<'a>(&self, root: &'a mut Value) -> Result<&'a mut Vec<Value>, String> {
        root.get_mut("rules")
            .ok_or_else(|| "no `rules` object".to_string())?
            .get_mut(&self.rule)
            .ok_or_else(|| format!("no `rules.{}` rule", self.rule))?
            .get_mut("members")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| format!("`rules.{}` has no `members` list", self.rule))
    }

    fn matches(&self, entry: &Value, language: &Language) -> bool {
        entry.get("value").and_then(Value::as_str) == Some(language.as_str())
    }

    fn entry(&self, language: &Language) -> Value {
        json!({ "type": "STRING", "value": language.as_str() })
    }
}

/// `src/node-types.json`: a flat list of node descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeTypeTable;

impl LanguageTable for NodeTypeTable {
    fn entries<'a>(&self, root: &'a mut Value) -> Result<&'a mut Vec<Value>, String> {
        root.as_array_mut()
            .ok_or_else(|| "expected a top-level list of node types".to_string())
    }

    fn matches(&self, entry: &Value, language: &Language) -> bool {
        entry.get("type").and_then(Value::as_str) == Some(language.as_str())
    }

    fn entry(&self, language: &Language) -> Value {
        json!({ "type": language.as_str(), "named": false })
    }
}

/// Make sure the artifact at `path` lists `language`, appending it if needed.
///
/// The whole document is parsed and validated before anything is written.
pub fn reconcile(
    table: &impl LanguageTable,
    path: &Path,
    language: &Language,
) -> Result<Reconciled> {
    plan(table, path, language)?.commit()
}

/// Parse and validate the artifact at `path` and prepare its updated content, without
/// writing. Callers touching several artifacts plan all of them before committing any.
pub fn plan(table: &impl LanguageTable, path: &Path, language: &Language) -> Result<PendingEdit> {
    let source = read_text(path)?;
    let mut root: Value = serde_json::from_str(&source).map_err(|source| UpdateError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = table
        .entries(&mut root)
        .map_err(|detail| UpdateError::ArtifactShape {
            path: path.to_path_buf(),
            detail,
        })?;

    if entries.iter().any(|entry| table.matches(entry, language)) {
        debug!(path = %path.display(), %language, "language already listed");
        return Ok(PendingEdit {
            path: path.to_path_buf(),
            rendered: None,
        });
    }

    entries.push(table.entry(language));
    debug!(path = %path.display(), %language, entries = entries.len(), "language entry planned");
    Ok(PendingEdit {
        path: path.to_path_buf(),
        rendered: Some(render(path, &root)?),
    })
}

/// A validated artifact update that has not been written yet.
#[derive(Debug)]
#[must_use = "a pending edit does nothing until committed"]
pub struct PendingEdit {
    path: PathBuf,
    rendered: Option<String>,
}

impl PendingEdit {
    /// What [`commit`](Self::commit) will report.
    pub fn result(&self) -> Reconciled {
        match self.rendered {
            Some(_) => Reconciled::Added,
            None => Reconciled::AlreadyPresent,
        }
    }

    pub fn commit(self) -> Result<Reconciled> {
        let result = self.result();
        if let Some(rendered) = self.rendered {
            info!(path = %self.path.display(), "appending language");
            write_atomic(&self.path, rendered.as_bytes())?;
        }
        Ok(result)
    }
}

/// Two-space indented JSON with a trailing newline, matching the generator's output.
fn render(path: &Path, value: &Value) -> Result<String> {
    let mut rendered = serde_json::to_string_pretty(value).map_err(|source| UpdateError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    rendered.push('\n');
    Ok(rendered)
}
