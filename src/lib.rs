/*!

# refilter - a multi-pattern regex prefilter

When many independent regexes must be run against many texts, evaluating
every regex against every text is wasteful. This crate derives, for each
regex, a *necessary* condition over literal substrings ("atoms"), merges the
conditions of all regexes into one shared trigger network, and at query time
maps "these atoms were observed in the text" to the minimal set of candidate
regexes that could possibly match. Only the candidates are then confirmed
with a real match.

The condition is necessary but never sufficient: filtering can admit false
candidates (resolved by confirmation) but never drops a true match.

# Example: filtering a pattern set

```rust
use refilter::{FilteredRegex, Flags};

let mut filter = FilteredRegex::new();
let abc = filter.add("abc", Flags::default()).unwrap();
let xyz = filter.add(".*xyz", Flags::default()).unwrap();
filter.compile();

// "abc" never occurs in the text, so that pattern is not even a candidate.
let observed = filter.matching_atoms("say xyzzy");
assert_eq!(filter.matching_regexes(&observed), vec![xyz]);
assert_eq!(filter.all_matches("say xyzzy", &observed), vec![xyz]);
assert_eq!(filter.first_match("say xyzzy", &observed), Some(xyz));
assert_ne!(abc, xyz);
```

# Example: driving an external string matcher

`compile` returns the atom list. Callers with a real multi-pattern matcher
(Aho-Corasick or similar) index those atoms themselves, search each text
case-insensitively, and feed back the indices of the atoms they observed:

```rust
use refilter::{FilteredRegex, Flags};

let mut filter = FilteredRegex::new();
filter.add("foo.*bar", Flags::default()).unwrap();
let atoms: Vec<String> = filter.compile().to_vec();
assert_eq!(atoms, vec!["foo".to_string(), "bar".to_string()]);

// Pretend an external matcher saw "bar" (atom index 1) but not "foo".
assert!(filter.matching_regexes(&[1]).is_empty());
// Both atoms observed: the pattern becomes a candidate.
assert_eq!(filter.matching_regexes(&[0, 1]), vec![0]);
```

# Patterns with no useful atoms

A pattern like `.*` guarantees no substring at all. Such patterns are kept
on an "unfiltered" list and are always candidates; they are confirmed on
every text, exactly as if no filtering existed:

```rust
use refilter::{FilteredRegex, Flags};

let mut filter = FilteredRegex::new();
let any = filter.add(".*", Flags::default()).unwrap();
filter.compile();
assert_eq!(filter.matching_regexes(&[]), vec![any]);
```

# Case folding

Atoms are emitted case-folded, and the design assumes the external atom
matcher searches case-insensitively; the built-in
[`matching_atoms`](FilteredRegex::matching_atoms) scanner folds the text
before searching. Confirmation matching still honors each pattern's own
case sensitivity, so a case-sensitive pattern is filtered permissively and
then confirmed exactly.

# Architecture

refilter has a per-regex analysis pass producing a [`Prefilter`] tree
(AND/OR over required atoms), a cross-regex compiler deduplicating
structurally identical subtrees into a shared [`TriggerTree`], and a
breadth-first propagator that converts observed atoms into candidate ids.
Parsing and confirmation are delegated to the `regex-syntax` and `regex`
crates; atom string-search is the caller's concern.

*/

#![warn(clippy::all)]

pub use crate::api::*;
pub use crate::prefilter::Prefilter;
pub use crate::triggers::{TriggerTree, DEFAULT_MIN_ATOM_LEN};

mod analyze;
mod api;
mod prefilter;
mod scan;
mod triggers;
