//! File discovery and classification.
//!
//! Walks a root directory, applies include/exclude globs plus a built-in
//! ignore set, enforces the size cap, and classifies each surviving path by
//! language and kind. Files that cannot be stat'd are skipped with a single
//! warning; they never abort the scan.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::ScanningConfig;
use crate::types::{FileRecord, Language};

/// Directories no scan should descend into, regardless of configuration.
const BUILTIN_IGNORES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/.venv/**",
    "**/dist/**",
    "**/build/**",
    "**/.next/**",
    "**/.nuxt/**",
    "**/.output/**",
    "**/target/**",
    "**/vendor/**",
];

/// Directory names pruned during the walk; mirrors [`BUILTIN_IGNORES`].
const IGNORED_DIR_NAMES: &[&str] = &[
    "node_modules",
    ".git",
    ".venv",
    "dist",
    "build",
    ".next",
    ".nuxt",
    ".output",
    "target",
    "vendor",
];

/// Extensions considered source code for analysis purposes.
const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "py", "rs", "go", "java", "kt", "cs", "cpp", "c", "h",
    "php", "rb", "swift", "scala", "vue", "svelte",
];

/// Manifest basenames (compared case-insensitively) and the ecosystem
/// language each one maps to.
const MANIFEST_BASENAMES: &[(&str, Language)] = &[
    ("package.json", Language::Javascript),
    ("requirements.txt", Language::Python),
    ("pyproject.toml", Language::Python),
    ("cargo.toml", Language::Rust),
    ("go.mod", Language::Go),
];

/// Build a globset from patterns, skipping invalid ones with a warning.
pub fn build_globset(patterns: &[&str]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            continue;
        }
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => tracing::warn!(pattern, %err, "invalid scan glob"),
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Classify a single path. Exposed for the manifest and rule layers.
pub fn classify(path: &Path) -> (Language, bool, bool) {
    let basename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();

    if let Some((_, language)) = MANIFEST_BASENAMES.iter().find(|(m, _)| *m == basename) {
        return (*language, false, true);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let language = Language::from_extension(&ext);
    let is_source = SOURCE_EXTENSIONS.contains(&ext.as_str());
    (language, is_source, false)
}

/// Walk `root` and produce the deduplicated, size-filtered, sorted file list.
pub fn scan_files(root: &Path, scanning: &ScanningConfig) -> Vec<FileRecord> {
    let include_refs: Vec<&str> = scanning.include.iter().map(String::as_str).collect();
    let exclude_refs: Vec<&str> = scanning.exclude.iter().map(String::as_str).collect();
    let include = build_globset(&include_refs);
    let exclude = build_globset(&exclude_refs);
    let builtin = build_globset(BUILTIN_IGNORES);

    // BTreeMap keyed by relative path: deduplicates and fixes the order.
    let mut selected: BTreeMap<PathBuf, FileRecord> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(scanning.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        // Don't descend into directories nothing can ever match.
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| IGNORED_DIR_NAMES.contains(&name)))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);

        if !include.is_match(relative) {
            continue;
        }
        if builtin.is_match(relative) || exclude.is_match(relative) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot stat file, skipping");
                continue;
            }
        };
        if metadata.len() > scanning.max_file_size {
            tracing::debug!(
                path = %path.display(),
                size = metadata.len(),
                "file exceeds maxFileSize, skipping"
            );
            continue;
        }

        let (language, is_source, is_manifest) = classify(path);
        selected.insert(
            relative.to_path_buf(),
            FileRecord {
                path: path.to_path_buf(),
                language,
                size: metadata.len(),
                is_source,
                is_manifest,
            },
        );
    }

    selected.into_values().collect()
}
