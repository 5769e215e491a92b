//! The prefilter tree: a necessary condition on substrings for a regex match.

use std::collections::BTreeSet;
use std::fmt;

/// A Prefilter expresses a *necessary* (never sufficient) condition for a
/// regex to match a text, phrased over literal substrings ("atoms").
///
/// If a text does not satisfy a regex's prefilter, the regex cannot match it
/// and need not be run. The converse does not hold: satisfying the prefilter
/// only makes the regex a candidate.
///
/// Atom text is always stored case-folded; the external atom matcher is
/// assumed to search case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefilter {
    /// Satisfied by every text; no filtering constraint.
    All,

    /// Satisfied by no text.
    None,

    /// Requires the given substring to be present.
    Atom(String),

    /// Requires every child to be satisfied.
    And(Vec<Prefilter>),

    /// Requires at least one child to be satisfied.
    Or(Vec<Prefilter>),
}

/// Case-fold a string to its canonical lowercase form.
pub(crate) fn fold(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

impl Prefilter {
    /// \return a prefilter requiring \p s as a substring.
    /// The string is folded; an empty string constrains nothing.
    pub fn from_string(s: &str) -> Prefilter {
        let folded = fold(s);
        if folded.is_empty() {
            Prefilter::All
        } else {
            Prefilter::Atom(folded)
        }
    }

    /// \return the conjunction of \p self and \p other.
    pub fn and(self, other: Prefilter) -> Prefilter {
        and_or(true, self, other)
    }

    /// \return the disjunction of \p self and \p other.
    pub fn or(self, other: Prefilter) -> Prefilter {
        and_or(false, self, other)
    }

    /// Collapse degenerate And/Or shapes: zero children become All/None,
    /// a single child replaces its parent.
    pub fn simplify(self) -> Prefilter {
        match self {
            Prefilter::And(mut children) => match children.len() {
                0 => Prefilter::All,
                1 => children.pop().unwrap().simplify(),
                _ => Prefilter::And(children),
            },
            Prefilter::Or(mut children) => match children.len() {
                0 => Prefilter::None,
                1 => children.pop().unwrap().simplify(),
                _ => Prefilter::Or(children),
            },
            other => other,
        }
    }

    /// \return the disjunction of one atom per member of \p strs, after
    /// dropping members made redundant by a shorter member: if "ab" is in the
    /// set, requiring "abc" adds nothing, since any text containing "abc"
    /// already contains "ab".
    pub fn or_strings(strs: BTreeSet<String>) -> Prefilter {
        let mut result = Prefilter::None;
        for s in simplify_string_set(&strs) {
            result = result.or(Prefilter::from_string(&s));
        }
        result
    }
}

fn and_or(is_and: bool, a: Prefilter, b: Prefilter) -> Prefilter {
    let a = a.simplify();
    let b = b.simplify();
    // All is the identity for And and absorbing for Or; None is the reverse.
    match (a, b) {
        (Prefilter::All, x) | (x, Prefilter::All) => {
            if is_and {
                x
            } else {
                Prefilter::All
            }
        }
        (Prefilter::None, x) | (x, Prefilter::None) => {
            if is_and {
                Prefilter::None
            } else {
                x
            }
        }
        (a, b) => {
            let mut children = Vec::new();
            merge_child(&mut children, is_and, a);
            merge_child(&mut children, is_and, b);
            if is_and {
                Prefilter::And(children)
            } else {
                Prefilter::Or(children)
            }
        }
    }
}

/// Append \p child to \p children, flattening a same-kind node rather than
/// nesting it.
fn merge_child(children: &mut Vec<Prefilter>, is_and: bool, child: Prefilter) {
    match child {
        Prefilter::And(subs) if is_and => children.extend(subs),
        Prefilter::Or(subs) if !is_and => children.extend(subs),
        other => children.push(other),
    }
}

/// Remove members which contain another member as a substring.
fn simplify_string_set(strs: &BTreeSet<String>) -> BTreeSet<String> {
    let mut kept = BTreeSet::new();
    for s in strs {
        let redundant = strs.iter().any(|t| t != s && s.contains(t.as_str()));
        if !redundant {
            kept.insert(s.clone());
        }
    }
    kept
}

impl fmt::Display for Prefilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn write_children(
            f: &mut fmt::Formatter,
            children: &[Prefilter],
            sep: &str,
        ) -> fmt::Result {
            f.write_str("(")?;
            for (idx, child) in children.iter().enumerate() {
                if idx > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", child)?;
            }
            f.write_str(")")
        }
        match self {
            Prefilter::All => f.write_str("*"),
            Prefilter::None => f.write_str("!"),
            Prefilter::Atom(s) => f.write_str(s),
            Prefilter::And(children) => write_children(f, children, " AND "),
            Prefilter::Or(children) => write_children(f, children, " OR "),
        }
    }
}
