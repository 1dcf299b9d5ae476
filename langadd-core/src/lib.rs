//! # langadd-core
//!
//! Adds a target language to the GritQL tree-sitter grammar.
//!
//! A tree-sitter grammar repository keeps the list of languages GritQL can target in
//! three places:
//!
//! - `grammar.js`, the grammar source, as a `choice(...)` of string literals under the
//!   `languageName` rule;
//! - `src/grammar.json`, generated from the source, as the members of that rule;
//! - `src/node-types.json`, also generated, as one anonymous node type per literal.
//!
//! [`Workflow`] edits the source, runs `tree-sitter generate`, then makes sure both
//! generated files list the language, printing what it does along the way.
//!
//! ```text
//! let layout = RepoLayout::new("/src/tree-sitter-gritql");
//! let workflow = Workflow::new(layout, WorkflowOptions::default(), &SystemRunner);
//! workflow.run(&Language::new("kotlin")?, &mut std::io::stdout())?;
//! ```

pub mod artifacts;
pub mod choice;
pub mod error;
pub mod files;
pub mod language;
pub mod layout;
pub mod tools;
pub mod workflow;

pub use artifacts::Reconciled;
pub use choice::{ChoiceBlock, ChoiceError, ChoicePattern};
pub use error::UpdateError;
pub use language::Language;
pub use layout::RepoLayout;
pub use tools::{Generator, Invocation, SystemRunner, ToolRunner};
pub use workflow::{Outcome, Report, SourceEdit, Workflow, WorkflowOptions};
