//! Per-rule suppression globs.
//!
//! Configuration may list glob patterns per rule-id; an alert is suppressed
//! when its file path (relative to the scan root) matches any pattern for
//! its rule. A bare filename pattern (no `/`) matches anywhere in the tree.

use std::collections::{BTreeMap, HashMap};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// `**` crosses directories, `*` stays within one path segment.
fn compile_glob(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Compiled suppression matcher for one run.
#[derive(Default)]
pub struct IgnoreRules {
    by_rule: HashMap<String, GlobSet>,
}

impl IgnoreRules {
    /// Compile the `ignoreRules` configuration map. Invalid globs are
    /// skipped with a warning rather than failing the run.
    pub fn new(rules: &BTreeMap<String, Vec<String>>) -> Self {
        let mut by_rule = HashMap::new();
        for (rule_id, patterns) in rules {
            let mut builder = GlobSetBuilder::new();
            let mut added = false;
            for pattern in patterns {
                let pattern = pattern.trim();
                if pattern.is_empty() {
                    continue;
                }
                match compile_glob(pattern) {
                    Ok(glob) => {
                        builder.add(glob);
                        added = true;
                    }
                    Err(err) => {
                        tracing::warn!(rule = %rule_id, pattern, %err, "invalid ignore glob");
                    }
                }
                // Bare filenames should match at any depth.
                if !pattern.contains('/')
                    && let Ok(glob) = compile_glob(&format!("**/{pattern}"))
                {
                    builder.add(glob);
                    added = true;
                }
            }
            if added && let Ok(set) = builder.build() {
                by_rule.insert(rule_id.clone(), set);
            }
        }
        Self { by_rule }
    }

    /// True iff the rule is suppressed for this root-relative path.
    pub fn is_suppressed(&self, rule_id: &str, relative_path: &str) -> bool {
        self.by_rule
            .get(rule_id)
            .is_some_and(|set| set.is_match(relative_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(entries: &[(&str, &[&str])]) -> IgnoreRules {
        let map: BTreeMap<String, Vec<String>> = entries
            .iter()
            .map(|(rule, patterns)| {
                (
                    rule.to_string(),
                    patterns.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect();
        IgnoreRules::new(&map)
    }

    #[test]
    fn double_star_matches_subpaths() {
        let rules = rules(&[("magic-number", &["src/generated/**"])]);
        assert!(rules.is_suppressed("magic-number", "src/generated/deep/file.ts"));
        assert!(!rules.is_suppressed("magic-number", "src/other/file.ts"));
    }

    #[test]
    fn bare_filename_matches_anywhere() {
        let rules = rules(&[("over-commenting", &["legacy.py"])]);
        assert!(rules.is_suppressed("over-commenting", "legacy.py"));
        assert!(rules.is_suppressed("over-commenting", "src/deep/legacy.py"));
        assert!(!rules.is_suppressed("over-commenting", "src/other.py"));
    }

    #[test]
    fn suppression_is_per_rule() {
        let rules = rules(&[("god-function", &["**/*.test.ts"])]);
        assert!(rules.is_suppressed("god-function", "src/a.test.ts"));
        assert!(!rules.is_suppressed("hollow-function", "src/a.test.ts"));
    }

    #[test]
    fn invalid_glob_is_skipped() {
        let rules = rules(&[("x", &["[unclosed"])]);
        assert!(!rules.is_suppressed("x", "anything"));
    }

    #[test]
    fn single_star_stays_single_level() {
        let rules = rules(&[("mixed-naming", &["src/*.ts"])]);
        assert!(rules.is_suppressed("mixed-naming", "src/a.ts"));
        assert!(!rules.is_suppressed("mixed-naming", "src/nested/a.ts"));
    }
}
