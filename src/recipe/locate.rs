//! Recipe name variants tried during lookup.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

/// Spellings of `name`: as given, then dot and dash/underscore substitutions,
/// breadth first without duplicates.
pub(crate) fn name_variants(name: &str) -> Vec<String> {
    let mut variants = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([name.to_string()]);

    while let Some(base) = queue.pop_front() {
        if !seen.insert(base.clone()) {
            continue;
        }
        let mut next = Vec::new();
        if base.contains('.') {
            next.push(base.replace('.', "_"));
            next.push(base.replace('.', std::path::MAIN_SEPARATOR_STR));
        }
        if base.contains('-') {
            next.push(base.replace('-', "_"));
        }
        if base.contains('_') {
            next.push(base.replace('_', "-"));
        }
        queue.extend(next.into_iter().filter(|v| !seen.contains(v)));
        variants.push(base);
    }
    variants
}

/// File names to try: each variant, followed by the variant with each
/// extension when it has none of its own.
pub(crate) fn candidate_names(name: &str, extensions: &[String]) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    for base in name_variants(name) {
        let has_extension = Path::new(&base).extension().is_some();
        if seen.insert(base.clone()) {
            names.push(base.clone());
        }
        if has_extension {
            continue;
        }
        for ext in extensions {
            let candidate = format!("{}.{}", base, ext);
            if seen.insert(candidate.clone()) {
                names.push(candidate);
            }
        }
    }
    names
}
