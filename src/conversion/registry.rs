// ABOUTME: Run-scoped registry that makes unique index names globally distinct
// ABOUTME: SQLite index names share one namespace per database, MySQL's are per table

use std::collections::{HashMap, HashSet};

/// Resolves per-table index names into names unique across the whole script
///
/// The first table to claim a base name keeps it. Later claims get the base
/// name suffixed with an increasing counter (`idx_email1`, `idx_email2`, ...),
/// skipping any candidate that was already handed out. One registry lives for
/// exactly one conversion run.
#[derive(Debug, Default)]
pub struct IndexNameRegistry {
    counters: HashMap<String, u32>,
    issued: HashSet<String>,
}

impl IndexNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, base: &str) -> String {
        if !self.counters.contains_key(base) && !self.issued.contains(base) {
            self.counters.insert(base.to_string(), 0);
            self.issued.insert(base.to_string());
            return base.to_string();
        }

        let counter = self.counters.entry(base.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}{}", base, counter);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Number of names handed out so far
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_claim_keeps_base_name() {
        let mut registry = IndexNameRegistry::new();
        assert_eq!(registry.resolve("idx_email"), "idx_email");
        assert_eq!(registry.resolve("idx_name"), "idx_name");
    }

    #[test]
    fn test_collisions_get_increasing_suffixes() {
        let mut registry = IndexNameRegistry::new();
        assert_eq!(registry.resolve("idx_email"), "idx_email");
        assert_eq!(registry.resolve("idx_email"), "idx_email1");
        assert_eq!(registry.resolve("idx_email"), "idx_email2");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_suffix_skips_literal_names_already_issued() {
        let mut registry = IndexNameRegistry::new();
        assert_eq!(registry.resolve("idx_a1"), "idx_a1");
        assert_eq!(registry.resolve("idx_a"), "idx_a");
        // "idx_a1" is taken by a literal index name.
        assert_eq!(registry.resolve("idx_a"), "idx_a2");
    }

    #[test]
    fn test_literal_name_matching_issued_suffix() {
        let mut registry = IndexNameRegistry::new();
        registry.resolve("idx_a");
        assert_eq!(registry.resolve("idx_a"), "idx_a1");
        // A later literal "idx_a1" must not reuse the suffixed name.
        assert_eq!(registry.resolve("idx_a1"), "idx_a11");
    }

    #[test]
    fn test_resolved_names_never_coincide() {
        let mut registry = IndexNameRegistry::new();
        let bases = ["u", "u", "u1", "u", "u11", "u1", "u"];
        let resolved: Vec<String> = bases.iter().map(|b| registry.resolve(b)).collect();
        let distinct: HashSet<&String> = resolved.iter().collect();
        assert_eq!(distinct.len(), resolved.len(), "{:?}", resolved);
    }
}
