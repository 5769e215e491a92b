//! Cross-regex compilation of prefilters into a shared trigger network, and
//! the propagation that turns observed atoms into candidate regex ids.
//!
//! Structurally identical prefilter nodes across different regexes are
//! deduplicated into a single canonical id; canonical ids index an arena of
//! [`Entry`] rows rather than being stored on the nodes themselves, so the
//! compiled table holds no aliased pointers. Lifecycle is two-phase: any
//! number of [`TriggerTree::add`] calls, one [`TriggerTree::compile`], then
//! read-only queries.

use crate::prefilter::Prefilter;
use std::collections::{HashMap, VecDeque};

/// Default minimum length for an atom to be worth string-matching. Shorter
/// substrings occur in most texts and filter out almost nothing.
pub const DEFAULT_MIN_ATOM_LEN: usize = 3;

/// A node referenced as a child by more parents than this becomes a
/// candidate for detachment (common-trigger pruning).
const MAX_COMMON_PARENTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Atom,
    And,
    Or,
}

/// The compiled trigger-table row for one canonical node.
#[derive(Debug)]
struct Entry {
    kind: NodeKind,

    /// Number of distinct children that must fire before this node fires:
    /// 1 for atoms and Or nodes, the distinct-child count for And nodes.
    propagate_up_at_count: usize,

    /// Canonical ids referencing this node as a child.
    parents: Vec<usize>,

    /// Regex ids whose root prefilter canonicalizes to this node.
    /// Non-empty only for root nodes.
    regexes: Vec<usize>,
}

/// Structural identity of a node: the deduplication key. And/Or children are
/// identified positionally by their already-assigned canonical ids, so
/// `And(a, b)` and `And(b, a)` deliberately remain distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Atom(String),
    And(Vec<usize>),
    Or(Vec<usize>),
}

/// The shared trigger network over every added regex's prefilter.
pub struct TriggerTree {
    min_atom_len: usize,
    compiled: bool,
    num_regexes: usize,

    /// Per added regex: its weakened prefilter, or None when no useful
    /// condition survived. Drained by compile.
    prefilters: Vec<Option<Prefilter>>,

    /// Regex ids that must always be treated as candidates.
    unfiltered: Vec<usize>,

    /// Arena of canonical nodes, indexed by canonical id.
    entries: Vec<Entry>,

    /// Emitted atoms, in first-seen order during id assignment.
    atoms: Vec<String>,

    /// Atom index (position in `atoms`) to canonical entry id.
    atom_to_entry: Vec<usize>,
}

impl TriggerTree {
    pub fn new() -> Self {
        Self::with_min_atom_len(DEFAULT_MIN_ATOM_LEN)
    }

    /// Construct with a custom minimum atom length.
    pub fn with_min_atom_len(min_atom_len: usize) -> Self {
        TriggerTree {
            min_atom_len,
            compiled: false,
            num_regexes: 0,
            prefilters: Vec::new(),
            unfiltered: Vec::new(),
            entries: Vec::new(),
            atoms: Vec::new(),
            atom_to_entry: Vec::new(),
        }
    }

    /// Register the prefilter of the next regex; regex ids are assigned in
    /// add order, starting at zero. Must not be called after compile.
    pub fn add(&mut self, prefilter: Prefilter) {
        debug_assert!(!self.compiled, "add after compile");
        let regex_id = self.num_regexes;
        self.num_regexes += 1;
        match self.keep_part(prefilter) {
            Some(kept) => self.prefilters.push(Some(kept)),
            None => {
                self.unfiltered.push(regex_id);
                self.prefilters.push(None);
            }
        }
    }

    /// Weaken a prefilter to the part fit for atom search, or discard it.
    ///
    /// Atoms shorter than the configured minimum are unfit. Dropping a
    /// conjunct from an And only relaxes the condition, so unfit And
    /// children are removed; dropping a disjunct from an Or would *tighten*
    /// it and could exclude a true match, so an Or survives only whole.
    fn keep_part(&self, prefilter: Prefilter) -> Option<Prefilter> {
        match prefilter {
            Prefilter::All | Prefilter::None => None,
            Prefilter::Atom(s) => {
                if s.len() >= self.min_atom_len {
                    Some(Prefilter::Atom(s))
                } else {
                    None
                }
            }
            Prefilter::And(children) => {
                let kept: Vec<Prefilter> = children
                    .into_iter()
                    .filter_map(|c| self.keep_part(c))
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Self::keep_simplified(Prefilter::And(kept))
                }
            }
            Prefilter::Or(children) => {
                let mut kept = Vec::with_capacity(children.len());
                for child in children {
                    kept.push(self.keep_part(child)?);
                }
                Self::keep_simplified(Prefilter::Or(kept))
            }
        }
    }

    /// Simplify a rebuilt node, discarding it when it collapses to a shape
    /// with no atom content. A childless Or simplifies to None, so this is
    /// what keeps canonicalization free of All/None nodes.
    fn keep_simplified(prefilter: Prefilter) -> Option<Prefilter> {
        match prefilter.simplify() {
            Prefilter::All | Prefilter::None => None,
            kept => Some(kept),
        }
    }

    /// Build the canonical-node arena, the entry table, and the atom list.
    /// A second call, or a call with no regexes added, changes nothing.
    ///
    /// \return the atoms to hand to the caller's string matcher; query-time
    /// atom indices are positions in this slice.
    pub fn compile(&mut self) -> &[String] {
        if self.compiled || self.num_regexes == 0 {
            return &self.atoms;
        }
        self.compiled = true;
        let mut keys: HashMap<NodeKey, usize> = HashMap::new();
        let prefilters = std::mem::take(&mut self.prefilters);
        for (regex_id, prefilter) in prefilters.into_iter().enumerate() {
            if let Some(prefilter) = prefilter {
                let root = self.canonicalize(&prefilter, &mut keys);
                self.entries[root].regexes.push(regex_id);
            }
        }
        self.prune_common_triggers();
        &self.atoms
    }

    /// Assign a canonical id to \p prefilter, reusing the id of a
    /// structurally identical node seen earlier. Children are canonicalized
    /// first so a parent's key is formed from final child ids.
    fn canonicalize(
        &mut self,
        prefilter: &Prefilter,
        keys: &mut HashMap<NodeKey, usize>,
    ) -> usize {
        let (key, kind, child_ids) = match prefilter {
            Prefilter::Atom(s) => (NodeKey::Atom(s.clone()), NodeKind::Atom, Vec::new()),
            Prefilter::And(children) => {
                let ids: Vec<usize> = children
                    .iter()
                    .map(|c| self.canonicalize(c, keys))
                    .collect();
                (NodeKey::And(ids.clone()), NodeKind::And, ids)
            }
            Prefilter::Or(children) => {
                let ids: Vec<usize> = children
                    .iter()
                    .map(|c| self.canonicalize(c, keys))
                    .collect();
                (NodeKey::Or(ids.clone()), NodeKind::Or, ids)
            }
            Prefilter::All | Prefilter::None => {
                unreachable!("keep_part removes unconstrained nodes")
            }
        };
        if let Some(&id) = keys.get(&key) {
            return id;
        }
        let id = self.entries.len();
        let mut distinct = child_ids;
        distinct.sort_unstable();
        distinct.dedup();
        let propagate_up_at_count = match kind {
            NodeKind::And => distinct.len(),
            NodeKind::Atom | NodeKind::Or => 1,
        };
        self.entries.push(Entry {
            kind,
            propagate_up_at_count,
            parents: Vec::new(),
            regexes: Vec::new(),
        });
        for &child in &distinct {
            self.entries[child].parents.push(id);
        }
        if let NodeKey::Atom(ref s) = key {
            self.atoms.push(s.clone());
            self.atom_to_entry.push(id);
        }
        keys.insert(key, id);
        id
    }

    /// Detach nodes referenced by many And parents that each carry other,
    /// independent guards. The detached node is thereafter treated as
    /// already satisfied from those parents' point of view, trading
    /// precision (more candidates) for propagation cost; it can never hide a
    /// true match.
    fn prune_common_triggers(&mut self) {
        for id in 0..self.entries.len() {
            if self.entries[id].parents.len() <= MAX_COMMON_PARENTS {
                continue;
            }
            let all_guarded = self.entries[id].parents.iter().all(|&p| {
                let parent = &self.entries[p];
                parent.kind == NodeKind::And && parent.propagate_up_at_count > 1
            });
            if !all_guarded {
                continue;
            }
            let parents = std::mem::take(&mut self.entries[id].parents);
            for parent in parents {
                self.entries[parent].propagate_up_at_count -= 1;
            }
        }
    }

    /// \return the candidate regex ids for a text whose observed atoms are
    /// \p matched_atoms (indices into the compiled atom list), ascending.
    ///
    /// An uncompiled tree degrades to no filtering: every regex id is a
    /// candidate.
    pub fn regexes_given_atoms(&self, matched_atoms: &[usize]) -> Vec<usize> {
        if !self.compiled {
            return (0..self.num_regexes).collect();
        }
        let mut candidates = self.unfiltered.clone();
        // Counters are per-call locals: concurrent queries share nothing.
        let mut fired_children = vec![0usize; self.entries.len()];
        let mut pending: VecDeque<usize> = VecDeque::new();
        for &atom_index in matched_atoms {
            debug_assert!(atom_index < self.atom_to_entry.len(), "bad atom index");
            if let Some(&id) = self.atom_to_entry.get(atom_index) {
                pending.push_back(id);
            }
        }
        while let Some(id) = pending.pop_front() {
            fired_children[id] += 1;
            // Fire exactly once, on the transition to the threshold.
            if fired_children[id] == self.entries[id].propagate_up_at_count {
                let entry = &self.entries[id];
                candidates.extend_from_slice(&entry.regexes);
                pending.extend(entry.parents.iter().copied());
            }
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// \return the compiled atom list (empty before compile).
    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    /// \return whether compile has run.
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// \return how many regexes have been added.
    pub fn num_regexes(&self) -> usize {
        self.num_regexes
    }
}

impl Default for TriggerTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::TriggerTree;
    use crate::prefilter::Prefilter;

    fn atom(s: &str) -> Prefilter {
        Prefilter::Atom(s.to_string())
    }

    #[test]
    fn keep_part_drops_short_atoms_from_and() {
        let mut tree = TriggerTree::new();
        // "ab" is below the minimum length; the And weakens to the survivor.
        tree.add(Prefilter::And(vec![atom("ab"), atom("cdef")]));
        let atoms = tree.compile().to_vec();
        assert_eq!(atoms, vec!["cdef".to_string()]);
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![0]);
        assert_eq!(tree.regexes_given_atoms(&[]), Vec::<usize>::new());
    }

    #[test]
    fn keep_part_discards_or_with_any_short_atom() {
        let mut tree = TriggerTree::new();
        tree.add(Prefilter::Or(vec![atom("ab"), atom("cdef")]));
        assert!(tree.compile().is_empty());
        // The regex is unfiltered: a candidate even with no atoms observed.
        assert_eq!(tree.regexes_given_atoms(&[]), vec![0]);
    }

    #[test]
    fn childless_nodes_are_unfiltered_not_a_panic() {
        let mut tree = TriggerTree::new();
        // An empty Or simplifies to None; it must take the unfiltered route
        // rather than reach canonicalization.
        tree.add(Prefilter::Or(vec![]));
        tree.add(Prefilter::And(vec![Prefilter::Or(vec![])]));
        tree.add(atom("abcd"));
        let atoms = tree.compile().to_vec();
        assert_eq!(atoms, vec!["abcd".to_string()]);
        assert_eq!(tree.regexes_given_atoms(&[]), vec![0, 1]);
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![0, 1, 2]);
    }

    #[test]
    fn all_and_none_roots_are_unfiltered() {
        let mut tree = TriggerTree::new();
        tree.add(Prefilter::All);
        tree.add(Prefilter::None);
        tree.add(atom("abc"));
        tree.compile();
        assert_eq!(tree.regexes_given_atoms(&[]), vec![0, 1]);
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![0, 1, 2]);
    }

    #[test]
    fn structural_dedup_across_regexes() {
        let mut tree = TriggerTree::new();
        tree.add(atom("abc"));
        tree.add(Prefilter::Or(vec![atom("abc"), atom("abd")]));
        let atoms = tree.compile().to_vec();
        // "abc" is shared: it appears once in the atom list.
        assert_eq!(atoms, vec!["abc".to_string(), "abd".to_string()]);
        // One observed atom can trigger both owning regexes.
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![0, 1]);
        assert_eq!(tree.regexes_given_atoms(&[1]), vec![1]);
    }

    #[test]
    fn identical_prefilters_share_everything_but_ids() {
        let mut tree = TriggerTree::new();
        tree.add(atom("abc"));
        tree.add(atom("abc"));
        let atoms = tree.compile().to_vec();
        assert_eq!(atoms, vec!["abc".to_string()]);
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![0, 1]);
    }

    #[test]
    fn and_fires_only_when_all_distinct_children_fire() {
        let mut tree = TriggerTree::new();
        tree.add(Prefilter::And(vec![atom("abc"), atom("def"), atom("ghi")]));
        tree.compile();
        assert_eq!(tree.regexes_given_atoms(&[0, 1]), Vec::<usize>::new());
        assert_eq!(tree.regexes_given_atoms(&[0, 1, 2]), vec![0]);
    }

    #[test]
    fn duplicate_and_children_count_once() {
        let mut tree = TriggerTree::new();
        tree.add(Prefilter::And(vec![atom("abc"), atom("abc")]));
        tree.compile();
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![0]);
    }

    #[test]
    fn positional_child_order_is_not_canonicalized() {
        let mut tree = TriggerTree::new();
        tree.add(Prefilter::And(vec![atom("abc"), atom("def")]));
        tree.add(Prefilter::And(vec![atom("def"), atom("abc")]));
        let atoms = tree.compile().to_vec();
        // The two Ands are distinct nodes, but both still fire from the same
        // pair of shared atoms.
        assert_eq!(atoms, vec!["abc".to_string(), "def".to_string()]);
        assert_eq!(tree.regexes_given_atoms(&[0, 1]), vec![0, 1]);
        assert_eq!(tree.regexes_given_atoms(&[0]), Vec::<usize>::new());
    }

    #[test]
    fn duplicate_matched_atoms_do_not_double_fire() {
        let mut tree = TriggerTree::new();
        tree.add(Prefilter::And(vec![atom("abc"), atom("def")]));
        tree.compile();
        assert_eq!(tree.regexes_given_atoms(&[0, 0]), Vec::<usize>::new());
    }

    #[test]
    fn compile_is_idempotent() {
        let mut tree = TriggerTree::new();
        tree.add(atom("abc"));
        let first = tree.compile().to_vec();
        let second = tree.compile().to_vec();
        assert_eq!(first, second);
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![0]);
    }

    #[test]
    fn uncompiled_tree_degrades_to_no_filtering() {
        let mut tree = TriggerTree::new();
        tree.add(atom("abc"));
        tree.add(atom("def"));
        assert_eq!(tree.regexes_given_atoms(&[]), vec![0, 1]);
    }

    #[test]
    fn empty_tree_compile_is_a_noop() {
        let mut tree = TriggerTree::new();
        assert!(tree.compile().is_empty());
        assert!(!tree.is_compiled());
        assert_eq!(tree.regexes_given_atoms(&[]), Vec::<usize>::new());
    }

    #[test]
    fn min_atom_len_is_configurable() {
        let mut tree = TriggerTree::with_min_atom_len(2);
        tree.add(atom("ab"));
        assert_eq!(tree.compile().to_vec(), vec!["ab".to_string()]);

        let mut tree = TriggerTree::with_min_atom_len(4);
        tree.add(atom("abc"));
        assert!(tree.compile().is_empty());
        assert_eq!(tree.regexes_given_atoms(&[]), vec![0]);
    }

    #[test]
    fn common_trigger_pruning_detaches_overloaded_atoms() {
        // Ten And regexes all guarded by "common" plus one unique atom each:
        // "common" exceeds the parent budget and every parent has another
        // guard, so it is detached and the Ands fire from the unique atom
        // alone.
        let mut tree = TriggerTree::new();
        let uniques: Vec<String> = (0..10).map(|i| format!("unique{}", i)).collect();
        for unique in &uniques {
            tree.add(Prefilter::And(vec![atom("common"), atom(unique)]));
        }
        let atoms = tree.compile().to_vec();
        assert_eq!(atoms[0], "common");

        // The unique atom of regex 3 is atoms[4] ("common" is atoms[0]).
        let unique3 = atoms.iter().position(|a| a == "unique3").unwrap();
        assert_eq!(tree.regexes_given_atoms(&[unique3]), vec![3]);

        // "common" alone no longer triggers anything.
        assert_eq!(tree.regexes_given_atoms(&[0]), Vec::<usize>::new());
    }

    #[test]
    fn pruning_skipped_when_a_parent_is_not_a_guarded_and() {
        // Ten parents, one of which is an Or: the all-guarded test fails and
        // nothing is detached.
        let mut tree = TriggerTree::new();
        for i in 0..9 {
            tree.add(Prefilter::And(vec![
                atom("common"),
                atom(&format!("unique{}", i)),
            ]));
        }
        tree.add(Prefilter::Or(vec![atom("common"), atom("zzzz")]));
        tree.compile();
        // "common" is still wired: through the Or it fires regex 9, while
        // the Ands still require both of their atoms.
        assert_eq!(tree.regexes_given_atoms(&[0]), vec![9]);
        let unique0 = tree.atoms().iter().position(|a| a == "unique0").unwrap();
        assert_eq!(tree.regexes_given_atoms(&[unique0]), Vec::<usize>::new());
        assert_eq!(tree.regexes_given_atoms(&[0, unique0]), vec![0, 9]);
    }
}
