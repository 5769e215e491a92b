//! Bottom-up derivation of a [`Prefilter`] from a parsed regex.
//!
//! The walk computes, per parse-tree node, either an exact finite set of
//! strings the node can match, or an abstract prefilter describing a
//! necessary condition. The result is a sound over-approximation: any text
//! matched by the regex satisfies the derived condition. Whenever analysis
//! would be unprofitable or unbounded, the node degrades to the
//! unconstrained prefilter, which is always safe.

use crate::prefilter::{fold, Prefilter};
use regex_syntax::hir::{Class, Hir, HirKind};
use std::collections::BTreeSet;

/// Exact-set cross products larger than this collapse the accumulated run
/// into a prefilter before continuing.
const MAX_EXACT_SET: usize = 16;

/// Character classes enumerating more code points than this are treated as
/// unconstrained.
const MAX_CLASS_SIZE: usize = 10;

/// Per-node analysis result, consumed during the single bottom-up walk.
enum Info {
    /// The node matches exactly this finite set of (folded) strings.
    Exact(BTreeSet<String>),

    /// A necessary condition on the node's matches.
    Abstract(Prefilter),
}

impl Info {
    fn empty_string() -> Info {
        let mut set = BTreeSet::new();
        set.insert(String::new());
        Info::Exact(set)
    }

    fn unconstrained() -> Info {
        Info::Abstract(Prefilter::All)
    }

    /// Convert a terminal Info into an owned prefilter.
    fn into_prefilter(self) -> Prefilter {
        match self {
            Info::Exact(set) => Prefilter::or_strings(set),
            Info::Abstract(p) => p,
        }
    }
}

/// \return the prefilter for a parsed regex: a necessary condition on atoms
/// for the regex to match.
pub fn prefilter_for_hir(hir: &Hir) -> Prefilter {
    build_info(hir).into_prefilter()
}

fn build_info(hir: &Hir) -> Info {
    match hir.kind() {
        // Empty matches and zero-width assertions (anchors, word boundaries)
        // impose no substring requirement.
        HirKind::Empty | HirKind::Look(..) => Info::empty_string(),

        HirKind::Literal(lit) => {
            let s = String::from_utf8_lossy(&lit.0);
            let mut set = BTreeSet::new();
            set.insert(fold(&s));
            Info::Exact(set)
        }

        HirKind::Class(class) => class_info(class),

        // Grouping does not change which strings are required.
        HirKind::Capture(cap) => build_info(&cap.sub),

        HirKind::Repetition(rep) => {
            if rep.min == 0 {
                // The subtree may match zero occurrences, so nothing from it
                // is guaranteed present.
                Info::unconstrained()
            } else {
                // At least one occurrence: the child's condition is
                // necessary, but exactness is lost since the repetition
                // count is unknown.
                Info::Abstract(build_info(&rep.sub).into_prefilter())
            }
        }

        HirKind::Alternation(subs) => alternation_info(subs),

        HirKind::Concat(subs) => concat_info(subs),

        #[allow(unreachable_patterns)]
        _ => Info::unconstrained(),
    }
}

/// \return the Info for a character class: an exact set of one-char strings
/// when small enough to enumerate, unconstrained otherwise. An empty class
/// matches nothing.
fn class_info(class: &Class) -> Info {
    match class {
        Class::Unicode(cls) => {
            let ranges = cls.ranges();
            if ranges.is_empty() {
                return Info::Abstract(Prefilter::None);
            }
            let mut count = 0usize;
            for r in ranges {
                count += (r.end() as usize) - (r.start() as usize) + 1;
                if count > MAX_CLASS_SIZE {
                    return Info::unconstrained();
                }
            }
            let mut set = BTreeSet::new();
            for r in ranges {
                for cp in (r.start() as u32)..=(r.end() as u32) {
                    if let Some(c) = std::char::from_u32(cp) {
                        set.insert(fold(&c.to_string()));
                    }
                }
            }
            Info::Exact(set)
        }
        Class::Bytes(cls) => {
            let ranges = cls.ranges();
            if ranges.is_empty() {
                return Info::Abstract(Prefilter::None);
            }
            let mut count = 0usize;
            for r in ranges {
                // Non-ASCII bytes are UTF-8 fragments, not standalone
                // substrings; give up on the whole class.
                if !r.end().is_ascii() {
                    return Info::unconstrained();
                }
                count += (r.end() as usize) - (r.start() as usize) + 1;
                if count > MAX_CLASS_SIZE {
                    return Info::unconstrained();
                }
            }
            let mut set = BTreeSet::new();
            for r in ranges {
                for b in r.start()..=r.end() {
                    set.insert(fold(&(b as char).to_string()));
                }
            }
            Info::Exact(set)
        }
    }
}

/// Alternation stays exact when every branch is exact (union of the sets);
/// otherwise each branch collapses to a prefilter and the result is their
/// disjunction.
fn alternation_info(subs: &[Hir]) -> Info {
    let infos: Vec<Info> = subs.iter().map(build_info).collect();
    if infos.iter().all(|i| matches!(i, Info::Exact(..))) {
        let mut union = BTreeSet::new();
        for info in infos {
            if let Info::Exact(set) = info {
                union.extend(set);
            }
        }
        Info::Exact(union)
    } else {
        let mut result = Prefilter::None;
        for info in infos {
            result = result.or(info.into_prefilter());
        }
        Info::Abstract(result)
    }
}

/// Concatenation accumulates contiguous exact runs via cross product, cutting
/// a run whose product would exceed [`MAX_EXACT_SET`]; completed runs and
/// non-exact children become conjuncts of the overall condition.
fn concat_info(subs: &[Hir]) -> Info {
    let mut conjuncts: Vec<Prefilter> = Vec::new();
    let mut run: Option<BTreeSet<String>> = None;
    for sub in subs {
        match build_info(sub) {
            Info::Exact(set) => {
                run = Some(match run.take() {
                    None => set,
                    Some(prev) => {
                        if prev.len() * set.len() > MAX_EXACT_SET {
                            conjuncts.push(Prefilter::or_strings(prev));
                            set
                        } else {
                            cross_product(&prev, &set)
                        }
                    }
                });
            }
            Info::Abstract(p) => {
                if let Some(prev) = run.take() {
                    conjuncts.push(Prefilter::or_strings(prev));
                }
                conjuncts.push(p);
            }
        }
    }
    if conjuncts.is_empty() {
        Info::Exact(run.unwrap_or_else(|| {
            let mut set = BTreeSet::new();
            set.insert(String::new());
            set
        }))
    } else {
        if let Some(prev) = run.take() {
            conjuncts.push(Prefilter::or_strings(prev));
        }
        let mut result = Prefilter::All;
        for conjunct in conjuncts {
            result = result.and(conjunct);
        }
        Info::Abstract(result)
    }
}

fn cross_product(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for x in a {
        for y in b {
            out.insert(format!("{}{}", x, y));
        }
    }
    out
}
