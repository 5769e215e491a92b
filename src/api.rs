//! The public facade: owns the compiled patterns, orchestrates
//! add → compile → query, and confirms candidates with the real engine.

use crate::analyze;
use crate::scan;
use crate::triggers::{TriggerTree, DEFAULT_MIN_ATOM_LEN};
use regex_syntax::hir::Hir;
use std::fmt;

/// Flags used to control pattern parsing.
/// The default flags are case-sensitive, not-multiline, not-dot-all.
#[derive(Debug, Copy, Clone, Default)]
pub struct Flags {
    /// If set, make the pattern case-insensitive.
    pub icase: bool,

    /// If set, ^ and $ match at line separators, not just the input
    /// boundaries.
    pub multiline: bool,

    /// If set, . matches line separators as well as any other character.
    pub dot_all: bool,
}

impl From<&str> for Flags {
    /// Construct a Flags from a string of flag letters:
    /// 'i' for case-insensitive, 'm' for multiline, 's' for dot-all.
    /// Unknown letters are silently skipped.
    fn from(s: &str) -> Self {
        let mut result = Self::default();
        for c in s.chars() {
            match c {
                'i' => result.icase = true,
                'm' => result.multiline = true,
                's' => result.dot_all = true,
                _ => {}
            }
        }
        result
    }
}

/// Errors surfaced by [`FilteredRegex`].
#[derive(Debug, Clone)]
pub enum Error {
    /// The pattern was rejected by the regex engine. The text contains the
    /// engine's human-readable message; the pattern was not registered.
    Parse(String),

    /// add was called after compile froze the pattern set.
    AlreadyCompiled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(text) => f.write_str(text),
            Error::AlreadyCompiled => f.write_str("pattern set is frozen by compile"),
        }
    }
}

impl std::error::Error for Error {}

struct Pattern {
    re: regex::Regex,
    hir: Hir,
}

/// A set of regexes behind a shared prefilter.
///
/// Patterns are added one at a time, then [`compile`](Self::compile) freezes
/// the set and emits the atom list. The caller searches each text for those
/// atoms (with its own matcher, or [`matching_atoms`](Self::matching_atoms))
/// and passes the observed atom indices to the query methods, which confirm
/// only the candidate regexes against the text.
///
/// The borrow checker enforces the two lifecycle phases: build methods take
/// `&mut self`, query methods take `&self` and share no mutable state, so a
/// compiled filter can be queried from many threads.
pub struct FilteredRegex {
    patterns: Vec<Pattern>,
    tree: TriggerTree,
    compiled: bool,
}

impl FilteredRegex {
    pub fn new() -> Self {
        Self::with_min_atom_len(DEFAULT_MIN_ATOM_LEN)
    }

    /// Construct with a custom minimum atom length: atoms shorter than this
    /// are not useful filters and are dropped from the trigger network.
    pub fn with_min_atom_len(min_atom_len: usize) -> Self {
        FilteredRegex {
            patterns: Vec::new(),
            tree: TriggerTree::with_min_atom_len(min_atom_len),
            compiled: false,
        }
    }

    /// Compile \p pattern and append it to the set.
    ///
    /// \return the pattern's id: its index, also used in query results.
    /// A rejected pattern registers nothing and consumes no id.
    pub fn add(&mut self, pattern: &str, flags: Flags) -> Result<usize, Error> {
        if self.compiled {
            return Err(Error::AlreadyCompiled);
        }
        let hir = regex_syntax::ParserBuilder::new()
            .case_insensitive(flags.icase)
            .multi_line(flags.multiline)
            .dot_matches_new_line(flags.dot_all)
            .build()
            .parse(pattern)
            .map_err(|e| Error::Parse(e.to_string()))?;
        let re = regex::RegexBuilder::new(pattern)
            .case_insensitive(flags.icase)
            .multi_line(flags.multiline)
            .dot_matches_new_line(flags.dot_all)
            .build()
            .map_err(|e| Error::Parse(e.to_string()))?;
        let id = self.patterns.len();
        self.patterns.push(Pattern { re, hir });
        Ok(id)
    }

    /// Freeze the pattern set: derive each pattern's prefilter, build the
    /// shared trigger network, and emit the atom list for the caller's
    /// string matcher. Idempotent; a second call changes nothing, and a
    /// call on an empty set does not freeze it.
    pub fn compile(&mut self) -> &[String] {
        if !self.compiled && !self.patterns.is_empty() {
            self.compiled = true;
            for pattern in &self.patterns {
                self.tree.add(analyze::prefilter_for_hir(&pattern.hir));
            }
            self.tree.compile();
        }
        self.tree.atoms()
    }

    /// \return the compiled atom list (empty before compile).
    pub fn atoms(&self) -> &[String] {
        self.tree.atoms()
    }

    /// \return the candidate pattern ids given the observed atom indices,
    /// ascending. Candidates are a superset of the patterns that actually
    /// match; before compile this degrades to every pattern id.
    pub fn matching_regexes(&self, matched_atoms: &[usize]) -> Vec<usize> {
        if !self.compiled {
            return (0..self.patterns.len()).collect();
        }
        self.tree.regexes_given_atoms(matched_atoms)
    }

    /// \return the ids of every pattern confirmed to match \p text, given
    /// the observed atom indices.
    pub fn all_matches(&self, text: &str, matched_atoms: &[usize]) -> Vec<usize> {
        self.matching_regexes(matched_atoms)
            .into_iter()
            .filter(|&id| self.patterns[id].re.is_match(text))
            .collect()
    }

    /// Like [`all_matches`](Self::all_matches), stopping at the first
    /// confirmed pattern.
    pub fn first_match(&self, text: &str, matched_atoms: &[usize]) -> Option<usize> {
        self.matching_regexes(matched_atoms)
            .into_iter()
            .find(|&id| self.patterns[id].re.is_match(text))
    }

    /// \return the first matching pattern id by linear scan, bypassing the
    /// filter entirely. Fallback and verification path.
    pub fn slow_first_match(&self, text: &str) -> Option<usize> {
        (0..self.patterns.len()).find(|&id| self.patterns[id].re.is_match(text))
    }

    /// Convenience atom scan over \p text, for callers without their own
    /// multi-pattern string matcher. \return observed atom indices,
    /// ascending, suitable for the query methods.
    pub fn matching_atoms(&self, text: &str) -> Vec<usize> {
        scan::matching_atoms(self.tree.atoms(), text)
    }

    /// \return the number of patterns added.
    pub fn num_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// \return the compiled engine regex for a pattern id.
    pub fn regex(&self, id: usize) -> &regex::Regex {
        &self.patterns[id].re
    }
}

impl Default for FilteredRegex {
    fn default() -> Self {
        Self::new()
    }
}
