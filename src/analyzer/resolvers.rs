use std::path::{Component, Path, PathBuf};

/// Candidate extensions tried, in order, when a specifier has no match on
/// disk as written.
const CANDIDATE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "d.ts", ""];

/// Resolve a raw import specifier to a root-relative path, consulting the
/// set of known files rather than the filesystem so resolution stays
/// deterministic with respect to the scanned file list.
///
/// `@/x` resolves against `src/x`; `./x` and `../x` resolve against the
/// importing file's directory. Returns `None` for anything else (bare
/// third-party specifiers in particular).
pub fn resolve_specifier(
    from: &str,
    spec: &str,
    known_files: &dyn Fn(&str) -> bool,
) -> Option<String> {
    let base = if let Some(rest) = spec.strip_prefix("@/") {
        PathBuf::from("src").join(rest)
    } else if spec.starts_with('.') {
        let parent = Path::new(from).parent().unwrap_or(Path::new(""));
        normalize(&parent.join(spec))
    } else {
        return None;
    };
    let base = to_slash(&base);

    for ext in CANDIDATE_EXTENSIONS {
        let candidate = join_ext(&base, ext);
        if known_files(&candidate) {
            return Some(candidate);
        }
        // A `.js` suffix in the import may really live in a `.ts`/`.tsx`
        // file with the same stem.
        if ext.is_empty()
            && let Some(stem) = base.strip_suffix(".js")
        {
            for ts_ext in ["ts", "tsx"] {
                let candidate = format!("{stem}.{ts_ext}");
                if known_files(&candidate) {
                    return Some(candidate);
                }
            }
        }
    }

    // Directory import: try index files.
    for ext in CANDIDATE_EXTENSIONS {
        if ext.is_empty() {
            continue;
        }
        let candidate = format!("{base}/index.{ext}");
        if known_files(&candidate) {
            return Some(candidate);
        }
    }

    None
}

fn join_ext(base: &str, ext: &str) -> String {
    if ext.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{ext}")
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn resolver(files: &[&str]) -> impl Fn(&str) -> bool {
        let set: HashSet<String> = files.iter().map(|s| s.to_string()).collect();
        move |p: &str| set.contains(p)
    }

    #[test]
    fn relative_with_extension_ladder() {
        let known = resolver(&["src/util.ts"]);
        assert_eq!(
            resolve_specifier("src/app.ts", "./util", &known).as_deref(),
            Some("src/util.ts")
        );
    }

    #[test]
    fn parent_directory_navigation() {
        let known = resolver(&["lib/core.js"]);
        assert_eq!(
            resolve_specifier("src/deep/mod.ts", "../../lib/core", &known).as_deref(),
            Some("lib/core.js")
        );
    }

    #[test]
    fn alias_resolves_under_src() {
        let known = resolver(&["src/services/api.ts"]);
        assert_eq!(
            resolve_specifier("pages/home.tsx", "@/services/api", &known).as_deref(),
            Some("src/services/api.ts")
        );
    }

    #[test]
    fn directory_import_finds_index() {
        let known = resolver(&["src/components/index.tsx"]);
        assert_eq!(
            resolve_specifier("src/app.tsx", "./components", &known).as_deref(),
            Some("src/components/index.tsx")
        );
    }

    #[test]
    fn js_suffix_remaps_to_ts() {
        let known = resolver(&["src/helper.ts"]);
        assert_eq!(
            resolve_specifier("src/app.ts", "./helper.js", &known).as_deref(),
            Some("src/helper.ts")
        );
    }

    #[test]
    fn bare_specifier_never_resolves() {
        let known = resolver(&["node_modules/react/index.js"]);
        assert_eq!(resolve_specifier("src/app.ts", "react", &known), None);
    }

    #[test]
    fn extension_priority_prefers_ts() {
        let known = resolver(&["src/util.ts", "src/util.js"]);
        assert_eq!(
            resolve_specifier("src/app.ts", "./util", &known).as_deref(),
            Some("src/util.ts")
        );
    }
}
