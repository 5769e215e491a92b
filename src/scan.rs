//! Case-insensitive scan of a text for the compiled atom list.
//!
//! This stands in for the external multi-pattern string matcher a real
//! high-volume caller indexes the atoms into; it is linear in the number of
//! atoms and meant for tests and small deployments.

use crate::prefilter::fold;
use memchr::memmem;

/// \return the indices of \p atoms occurring in \p text, ascending.
/// Atoms are stored folded, so the text is folded before searching.
pub fn matching_atoms(atoms: &[String], text: &str) -> Vec<usize> {
    let folded = fold(text);
    atoms
        .iter()
        .enumerate()
        .filter(|(_, atom)| memmem::find(folded.as_bytes(), atom.as_bytes()).is_some())
        .map(|(index, _)| index)
        .collect()
}
