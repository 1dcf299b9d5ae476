//! The language-adding run
//!
//! Steps run strictly in order, each one blocking until done:
//!
//! 1. Add the language to the choice block in `grammar.js`.
//! 2. Ask the generator for its version. If it cannot run, stop here with
//!    [`Outcome::GeneratorMissing`]; only `grammar.js` has changed.
//! 3. Run the generator.
//! 4. Reconcile `src/grammar.json` and `src/node-types.json`. Both are parsed and
//!    validated first; neither is written if either is malformed.
//! 5. Print the repository status.
//!
//! Nothing is rolled back: if a later step fails, the edit to `grammar.js` stays.
//! Progress is narrated to the writer passed to [`Workflow::run`].

use std::io::Write;

use tracing::info;

use crate::artifacts::{plan, GrammarDescription, NodeTypeTable, PendingEdit, Reconciled};
use crate::choice::{ChoiceBlock, ChoicePattern};
use crate::error::{Result, UpdateError};
use crate::files::{read_text, write_atomic};
use crate::language::Language;
use crate::layout::{Artifact, RepoLayout};
use crate::tools::{run_checked, Availability, Generator, Invocation, ToolOutput, ToolRunner};

/// What the run may do besides the fixed sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOptions {
    pub pattern: ChoicePattern,
    /// Leave `grammar.js` alone when the language is already listed.
    ///
    /// Off by default: the text edit appends unconditionally.
    pub skip_existing: bool,
    pub generator: Generator,
    pub status: Invocation,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            pattern: ChoicePattern::default(),
            skip_existing: false,
            generator: Generator::default(),
            status: Invocation::new("git", ["status"]),
        }
    }
}

/// What happened to the grammar source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEdit {
    Inserted,
    /// Only with [`WorkflowOptions::skip_existing`].
    AlreadyListed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub source: SourceEdit,
    pub generator_version: String,
    pub grammar_json: Reconciled,
    pub node_types: Reconciled,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Report),
    /// The generator could not be run; the derived artifacts were not touched.
    GeneratorMissing { source: SourceEdit, reason: String },
}

pub struct Workflow<'r> {
    layout: RepoLayout,
    options: WorkflowOptions,
    runner: &'r dyn ToolRunner,
}

impl<'r> Workflow<'r> {
    pub fn new(layout: RepoLayout, options: WorkflowOptions, runner: &'r dyn ToolRunner) -> Self {
        Self {
            layout,
            options,
            runner,
        }
    }

    pub fn run(&self, language: &Language, out: &mut dyn Write) -> Result<Outcome> {
        info!(root = %self.layout.root().display(), %language, "adding language");
        let source = self.update_grammar_source(language, out)?;

        let generator = &self.options.generator;
        let root = self.layout.root();
        let generator_version = match generator.probe(self.runner, root) {
            Availability::Available { version } => version,
            Availability::Missing { reason } => {
                writeln!(
                    out,
                    "{} is not installed. Please install it first.",
                    generator.name()
                )?;
                writeln!(out, "using `{}`", generator.install_hint)?;
                return Ok(Outcome::GeneratorMissing { source, reason });
            }
        };
        writeln!(out, "using {}", generator_version)?;

        let generated = generator.generate(self.runner, root)?;
        print_output(out, &generated)?;

        let (grammar_json, node_types) = self.reconcile_artifacts(language, out)?;

        let status = run_checked(self.runner, &self.options.status, root)?;
        print_output(out, &status)?;

        Ok(Outcome::Completed(Report {
            source,
            generator_version,
            grammar_json,
            node_types,
            status: status.stdout.trim().to_string(),
        }))
    }

    /// Append `language` to the choice block and write the grammar source back.
    ///
    /// The block is located and validated before anything is written.
    pub fn update_grammar_source(
        &self,
        language: &Language,
        out: &mut dyn Write,
    ) -> Result<SourceEdit> {
        let artifact = self.layout.grammar_source();
        let text = read_text(artifact.path())?;
        let block = ChoiceBlock::locate(&text, &self.options.pattern).map_err(|source| {
            UpdateError::StructuralMismatch {
                path: artifact.path().to_path_buf(),
                source,
            }
        })?;

        writeln!(
            out,
            "Found {} choice in {}",
            self.options.pattern.rule,
            artifact.name()
        )?;
        writeln!(out, "{}", block.text(&text))?;

        if self.options.skip_existing && block.contains(language) {
            writeln!(out, "{} already exists in {}", language, artifact.name())?;
            return Ok(SourceEdit::AlreadyListed);
        }

        let updated = block.insert_after_last(&text, language);
        write_atomic(artifact.path(), updated.as_bytes())?;
        info!(path = %artifact.path().display(), %language, "grammar source updated");
        Ok(SourceEdit::Inserted)
    }

    /// Make both JSON artifacts list `language`.
    ///
    /// Both files are parsed and validated before either is written.
    pub fn reconcile_artifacts(
        &self,
        language: &Language,
        out: &mut dyn Write,
    ) -> Result<(Reconciled, Reconciled)> {
        let grammar = GrammarDescription::new(self.options.pattern.rule.clone());
        let grammar_json = self.layout.grammar_json();
        let node_types = self.layout.node_types();
        let grammar_edit = plan(&grammar, grammar_json.path(), language)?;
        let node_types_edit = plan(&NodeTypeTable, node_types.path(), language)?;

        Ok((
            commit_one(grammar_edit, grammar_json, language, out)?,
            commit_one(node_types_edit, node_types, language, out)?,
        ))
    }
}

fn commit_one(
    edit: PendingEdit,
    artifact: Artifact<'_>,
    language: &Language,
    out: &mut dyn Write,
) -> Result<Reconciled> {
    match edit.result() {
        Reconciled::AlreadyPresent => {
            writeln!(out, "{} already exists in {}", language, artifact.name())?
        }
        Reconciled::Added => writeln!(out, "Adding {} to the {}", language, artifact.name())?,
    }
    edit.commit()
}

fn print_output(out: &mut dyn Write, output: &ToolOutput) -> Result<()> {
    let text = output.combined();
    if !text.is_empty() {
        writeln!(out, "{}", text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::{failed, ok, FakeRunner};
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/gritql");
    const ARTIFACTS: [&str; 3] = ["grammar.js", "src/grammar.json", "src/node-types.json"];

    fn fixture_repo() -> TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        for name in ARTIFACTS {
            fs::copy(Path::new(FIXTURE).join(name), dir.path().join(name)).unwrap();
        }
        dir
    }

    fn snapshot(dir: &TempDir) -> Vec<Vec<u8>> {
        ARTIFACTS
            .iter()
            .map(|name| fs::read(dir.path().join(name)).unwrap())
            .collect()
    }

    fn working_tools() -> FakeRunner {
        FakeRunner::new()
            .respond("tree-sitter --version", ok("tree-sitter 0.22.6\n"))
            .respond("tree-sitter generate", ok(""))
            .respond("git status", ok("On branch main\nChanges not staged for commit:\n"))
    }

    fn run(
        dir: &TempDir,
        options: WorkflowOptions,
        runner: &FakeRunner,
        name: &str,
    ) -> (Result<Outcome>, String) {
        let workflow = Workflow::new(RepoLayout::new(dir.path()), options, runner);
        let mut out = Vec::new();
        let result = workflow.run(&Language::new(name).unwrap(), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn listed(dir: &TempDir, name: &str) -> usize {
        let text = fs::read_to_string(dir.path().join("grammar.js")).unwrap();
        let block = ChoiceBlock::locate(&text, &ChoicePattern::default()).unwrap();
        block.values().filter(|v| *v == name).count()
    }

    fn json_mentions(dir: &TempDir, file: &str, name: &str) -> usize {
        let text = fs::read_to_string(dir.path().join(file)).unwrap();
        text.matches(&format!("\"{}\"", name)).count()
    }

    #[test]
    fn adds_language_to_all_three_artifacts() {
        let dir = fixture_repo();
        let runner = working_tools();

        let (result, narration) = run(&dir, WorkflowOptions::default(), &runner, "kotlin");

        let report = match result.unwrap() {
            Outcome::Completed(report) => report,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(report.source, SourceEdit::Inserted);
        assert_eq!(report.generator_version, "tree-sitter 0.22.6");
        assert_eq!(report.grammar_json, Reconciled::Added);
        assert_eq!(report.node_types, Reconciled::Added);
        assert!(report.status.starts_with("On branch main"));

        assert_eq!(listed(&dir, "kotlin"), 1);
        assert_eq!(json_mentions(&dir, "src/grammar.json", "kotlin"), 1);
        assert_eq!(json_mentions(&dir, "src/node-types.json", "kotlin"), 1);

        assert_eq!(
            runner.calls(),
            vec!["tree-sitter --version", "tree-sitter generate", "git status"]
        );
        assert!(narration.starts_with("Found languageName choice in grammar.js\n"));
        assert!(narration.contains("using tree-sitter 0.22.6\n"));
        assert!(narration.contains("Adding kotlin to the grammar.json\n"));
        assert!(narration.contains("Adding kotlin to the node-types.json\n"));
        assert!(narration.ends_with("Changes not staged for commit:\n"));
    }

    #[test]
    fn rerun_appends_to_source_but_not_to_artifacts() {
        let dir = fixture_repo();
        let runner = working_tools();
        run(&dir, WorkflowOptions::default(), &runner, "kotlin").0.unwrap();
        let first = snapshot(&dir);

        let (result, narration) = run(&dir, WorkflowOptions::default(), &runner, "kotlin");

        assert!(matches!(result.unwrap(), Outcome::Completed(_)));
        assert_eq!(listed(&dir, "kotlin"), 2);
        let second = snapshot(&dir);
        assert_ne!(second[0], first[0]);
        assert_eq!(second[1..], first[1..]);
        assert!(narration.contains("kotlin already exists in grammar.json\n"));
        assert!(narration.contains("kotlin already exists in node-types.json\n"));
    }

    #[test]
    fn skip_existing_makes_the_source_edit_a_no_op() {
        let dir = fixture_repo();
        let runner = working_tools();
        let options = WorkflowOptions {
            skip_existing: true,
            ..WorkflowOptions::default()
        };
        run(&dir, options.clone(), &runner, "kotlin").0.unwrap();
        let first = snapshot(&dir);

        let (result, narration) = run(&dir, options, &runner, "kotlin");

        match result.unwrap() {
            Outcome::Completed(report) => assert_eq!(report.source, SourceEdit::AlreadyListed),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(snapshot(&dir), first);
        assert!(narration.contains("kotlin already exists in grammar.js\n"));
    }

    #[test]
    fn missing_generator_stops_after_source_edit() {
        let dir = fixture_repo();
        let before = snapshot(&dir);
        let runner = FakeRunner::new();

        let (result, narration) = run(&dir, WorkflowOptions::default(), &runner, "kotlin");

        assert!(matches!(
            result.unwrap(),
            Outcome::GeneratorMissing {
                source: SourceEdit::Inserted,
                ..
            }
        ));
        let after = snapshot(&dir);
        assert_ne!(after[0], before[0]);
        assert_eq!(after[1..], before[1..]);
        assert_eq!(runner.calls(), vec!["tree-sitter --version"]);
        assert!(narration.ends_with(
            "tree-sitter is not installed. Please install it first.\n\
             using `npm install -g tree-sitter-cli`\n"
        ));
    }

    #[test]
    fn drifted_grammar_touches_nothing() {
        let dir = fixture_repo();
        let grammar = dir.path().join("grammar.js");
        let drifted = fs::read_to_string(&grammar)
            .unwrap()
            .replace("        'c',\n", "        'c'\n");
        fs::write(&grammar, drifted).unwrap();
        let before = snapshot(&dir);
        let runner = working_tools();

        let (result, narration) = run(&dir, WorkflowOptions::default(), &runner, "kotlin");

        let err = result.unwrap_err();
        assert!(matches!(err, UpdateError::StructuralMismatch { .. }), "{err}");
        assert!(err.to_string().contains("found `'c'`"), "{err}");
        assert_eq!(snapshot(&dir), before);
        assert!(runner.calls().is_empty());
        assert!(narration.is_empty());
    }

    #[test]
    fn generator_failure_leaves_artifacts_alone() {
        let dir = fixture_repo();
        let before = snapshot(&dir);
        let runner = FakeRunner::new()
            .respond("tree-sitter --version", ok("tree-sitter 0.22.6"))
            .respond("tree-sitter generate", failed(1, "Error: conflict"));

        let (result, _) = run(&dir, WorkflowOptions::default(), &runner, "kotlin");

        assert!(matches!(result.unwrap_err(), UpdateError::ToolFailed { .. }));
        assert_eq!(snapshot(&dir)[1..], before[1..]);
        assert_eq!(runner.calls(), vec!["tree-sitter --version", "tree-sitter generate"]);
    }

    #[test]
    fn malformed_artifact_is_fatal() {
        let dir = fixture_repo();
        fs::write(dir.path().join("src/node-types.json"), "[{").unwrap();
        let before = snapshot(&dir);
        let runner = working_tools();

        let (result, out) = run(&dir, WorkflowOptions::default(), &runner, "kotlin");

        assert!(matches!(result.unwrap_err(), UpdateError::Json { .. }));
        assert!(!runner.calls().contains(&"git status".to_string()));
        // grammar.json is valid and lacks kotlin, yet stays as generated.
        assert_eq!(snapshot(&dir)[1], before[1]);
        assert!(!out.contains("Adding kotlin to the grammar.json"), "{out}");
    }

    #[test]
    fn status_failure_is_fatal() {
        let dir = fixture_repo();
        let runner = FakeRunner::new()
            .respond("tree-sitter --version", ok("tree-sitter 0.22.6"))
            .respond("tree-sitter generate", ok(""))
            .respond("git status", failed(128, "fatal: not a git repository"));

        let (result, _) = run(&dir, WorkflowOptions::default(), &runner, "kotlin");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("not a git repository"), "{err}");
        assert_eq!(json_mentions(&dir, "src/node-types.json", "kotlin"), 1);
    }
}
