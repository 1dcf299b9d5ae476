//! The enumerated-choice block of `grammar.js`
//!
//! The block this module edits looks like this in the grammar source:
//!
//! ```text
//!     // These are target languages
//!     languageName: (_$) =>
//!       choice(
//!         'grit',
//!         'js',
//!         'python',
//!       ),
//! ```
//!
//! Locating it is two-staged. A regex finds the three header lines (marker comment, rule
//! head, `choice(`), tolerating any indentation. The member lines that follow are then
//! parsed one at a time into a [`ChoiceBlock`], so a drifted file is reported with the
//! offending line instead of a silent "pattern not found".
//!
//! Edits never re-render the block: a new member is spliced in after the last member
//! line, and every other byte of the document is preserved.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::language::Language;

/// `'value',` on a line of its own.
static MEMBER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)'(?P<value>[^'\\\r\n]+)',[ \t]*$").expect("member pattern")
});

/// The `),` that closes the choice and ends the rule.
static CLOSING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*\),[ \t]*$").expect("closing pattern"));

/// Why the grammar source does not contain a usable choice block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceError {
    #[error("could not find `{marker}` followed by `{rule}: (_$) =>` and `choice(`")]
    HeaderNotFound { marker: String, rule: String },

    #[error("the `{rule}` choice header appears {count} times; expected exactly one")]
    Ambiguous { rule: String, count: usize },

    #[error("line {line}: expected `'<language>',` or `),`, found `{content}`")]
    UnexpectedLine { line: usize, content: String },

    #[error("line {line}: end of file inside the `{rule}` choice")]
    Unterminated { line: usize, rule: String },

    #[error("the `{rule}` choice must start with '{anchor}', found {found}")]
    MissingAnchor {
        rule: String,
        anchor: String,
        found: String,
    },

    #[error("the `{rule}` choice lists no languages after '{anchor}'")]
    NoLanguages { rule: String, anchor: String },
}

/// What identifies the block inside the grammar source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoicePattern {
    /// Comment line directly above the rule.
    pub marker: String,
    /// Rule name, e.g. `languageName`.
    pub rule: String,
    /// Literal that must open the choice.
    pub anchor: String,
}

impl Default for ChoicePattern {
    fn default() -> Self {
        Self {
            marker: "// These are target languages".to_string(),
            rule: "languageName".to_string(),
            anchor: "grit".to_string(),
        }
    }
}

impl ChoicePattern {
    fn header_regex(&self) -> Regex {
        let pattern = format!(
            r"(?m)^[ \t]*{marker}[ \t]*\r?\n[ \t]*{rule}[ \t]*:[ \t]*\([ \t]*_?\$[ \t]*\)[ \t]*=>[ \t]*\r?\n[ \t]*choice\([ \t]*\r?\n",
            marker = regex::escape(self.marker.trim()),
            rule = regex::escape(&self.rule),
        );
        // Both inputs are escaped, so the pattern is always valid.
        Regex::new(&pattern).expect("escaped header pattern")
    }
}

/// One quoted literal of the choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceMember {
    pub value: String,
    pub indent: String,
    /// 1-based line number in the grammar source.
    pub line: usize,
    /// Byte range of the line, terminator included.
    span: Range<usize>,
    terminator: &'static str,
}

/// The located block: its byte span in the document and its parsed members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceBlock {
    span: Range<usize>,
    members: Vec<ChoiceMember>,
}

impl ChoiceBlock {
    /// Find and parse the block described by `pattern` in `text`.
    pub fn locate(text: &str, pattern: &ChoicePattern) -> Result<Self, ChoiceError> {
        let header_regex = pattern.header_regex();
        let mut headers = header_regex.find_iter(text);
        let header = headers.next().ok_or_else(|| ChoiceError::HeaderNotFound {
            marker: pattern.marker.trim().to_string(),
            rule: pattern.rule.clone(),
        })?;
        let extra = headers.count();
        if extra > 0 {
            return Err(ChoiceError::Ambiguous {
                rule: pattern.rule.clone(),
                count: extra + 1,
            });
        }

        let mut members = Vec::new();
        let mut pos = header.end();
        let mut line = text[..pos].matches('\n').count() + 1;

        let block_end = loop {
            if pos >= text.len() {
                return Err(ChoiceError::Unterminated {
                    line,
                    rule: pattern.rule.clone(),
                });
            }

            let end = text[pos..].find('\n').map_or(text.len(), |i| pos + i + 1);
            let raw = &text[pos..end];
            let content = raw.trim_end_matches('\n').trim_end_matches('\r');
            let terminator = &raw[content.len()..];

            if let Some(caps) = MEMBER_LINE.captures(content) {
                members.push(ChoiceMember {
                    value: caps["value"].to_string(),
                    indent: caps["indent"].to_string(),
                    line,
                    span: pos..end,
                    terminator: line_terminator(terminator),
                });
            } else if CLOSING_LINE.is_match(content) {
                break pos + content.len();
            } else {
                return Err(ChoiceError::UnexpectedLine {
                    line,
                    content: content.trim().to_string(),
                });
            }

            pos = end;
            line += 1;
        };

        match members.first() {
            Some(first) if first.value == pattern.anchor => {}
            first => {
                return Err(ChoiceError::MissingAnchor {
                    rule: pattern.rule.clone(),
                    anchor: pattern.anchor.clone(),
                    found: first.map_or_else(
                        || "an empty choice".to_string(),
                        |m| format!("'{}' on line {}", m.value, m.line),
                    ),
                })
            }
        }
        if members.len() < 2 {
            return Err(ChoiceError::NoLanguages {
                rule: pattern.rule.clone(),
                anchor: pattern.anchor.clone(),
            });
        }

        Ok(ChoiceBlock {
            span: header.start()..block_end,
            members,
        })
    }

    pub fn members(&self) -> &[ChoiceMember] {
        &self.members
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.value.as_str())
    }

    pub fn contains(&self, language: &Language) -> bool {
        self.values().any(|v| v == language.as_str())
    }

    /// The block as it appears in `text`, from the marker to the closing `),`.
    pub fn text<'a>(&self, text: &'a str) -> &'a str {
        &text[self.span.clone()]
    }

    /// Return `text` with `language` added as a new last member.
    ///
    /// The new line copies the indentation and line terminator of the current last
    /// member. Inserting a language that is already listed adds it again; callers that
    /// want a no-op check [`ChoiceBlock::contains`] first.
    pub fn insert_after_last(&self, text: &str, language: &Language) -> String {
        // `locate` guarantees at least the anchor and one language.
        let last = &self.members[self.members.len() - 1];
        let at = last.span.end;
        let line = format!("{}{},{}", last.indent, language.literal(), last.terminator);

        let mut updated = String::with_capacity(text.len() + line.len());
        updated.push_str(&text[..at]);
        updated.push_str(&line);
        updated.push_str(&text[at..]);
        updated
    }
}

fn line_terminator(raw: &str) -> &'static str {
    match raw {
        "\r\n" => "\r\n",
        _ => "\n",
    }
}
