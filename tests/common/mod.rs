use refilter::{FilteredRegex, Flags};

/// Build a compiled filter over \p patterns with default flags.
pub fn build(patterns: &[&str]) -> FilteredRegex {
    let mut filter = FilteredRegex::new();
    for pattern in patterns {
        filter
            .add(pattern, Flags::default())
            .unwrap_or_else(|e| panic!("pattern {:?} should compile: {}", pattern, e));
    }
    filter.compile();
    filter
}

/// \return the candidate pattern ids for \p text, driving the built-in atom
/// scanner end to end.
pub fn candidates(filter: &FilteredRegex, text: &str) -> Vec<usize> {
    filter.matching_regexes(&filter.matching_atoms(text))
}

/// \return the confirmed matches for \p text.
pub fn confirmed(filter: &FilteredRegex, text: &str) -> Vec<usize> {
    filter.all_matches(text, &filter.matching_atoms(text))
}

/// \return every pattern id matching \p text, by brute-force linear scan.
pub fn brute_force(filter: &FilteredRegex, text: &str) -> Vec<usize> {
    (0..filter.num_patterns())
        .filter(|&id| filter.regex(id).is_match(text))
        .collect()
}
