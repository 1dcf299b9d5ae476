//! The identifier of the language being added.

use std::fmt;

use crate::error::{Result, UpdateError};

/// A language name as it appears in `grammar.js`, `grammar.json` and `node-types.json`.
///
/// Names are taken verbatim, spaces and punctuation included. The only rejected inputs
/// are those that would break the single-quoted literal in `grammar.js`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Language(String);

impl Language {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.contains(['\n', '\r']) {
            Some("name contains a line break")
        } else if name.contains('\'') {
            Some("name contains a single quote")
        } else if name.contains('\\') {
            Some("name contains a backslash")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(UpdateError::InvalidLanguage { name, reason }),
            None => Ok(Language(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a grammar.js string literal: `'kotlin'`.
    pub fn literal(&self) -> String {
        format!("'{}'", self.0)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
