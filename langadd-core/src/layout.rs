//! Where the grammar source and its generated artifacts live.

use std::path::{Path, PathBuf};

/// An explicit repository root and the artifact paths relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
    grammar_source: PathBuf,
    grammar_json: PathBuf,
    node_types: PathBuf,
}

impl RepoLayout {
    /// The tree-sitter layout: `grammar.js`, `src/grammar.json`, `src/node-types.json`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            grammar_source: PathBuf::from("grammar.js"),
            grammar_json: Path::new("src").join("grammar.json"),
            node_types: Path::new("src").join("node-types.json"),
        }
    }

    pub fn with_grammar_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.grammar_source = path.into();
        self
    }

    pub fn with_grammar_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.grammar_json = path.into();
        self
    }

    pub fn with_node_types(mut self, path: impl Into<PathBuf>) -> Self {
        self.node_types = path.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn grammar_source(&self) -> Artifact<'_> {
        Artifact::new(&self.root, &self.grammar_source)
    }

    pub fn grammar_json(&self) -> Artifact<'_> {
        Artifact::new(&self.root, &self.grammar_json)
    }

    pub fn node_types(&self) -> Artifact<'_> {
        Artifact::new(&self.root, &self.node_types)
    }
}

/// One file of the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact<'a> {
    relative: &'a Path,
    path: PathBuf,
}

impl<'a> Artifact<'a> {
    fn new(root: &Path, relative: &'a Path) -> Self {
        Self {
            relative,
            path: root.join(relative),
        }
    }

    /// Absolute (or root-relative) path to read and write.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short name for progress messages: `grammar.json`.
    pub fn name(&self) -> String {
        self.relative
            .file_name()
            .unwrap_or(self.relative.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}
