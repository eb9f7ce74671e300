//! Multi-language syntax-tree facade.
//!
//! Wraps ast-grep (tree-sitter underneath) behind a small surface: parse a
//! source file into a concrete tree, walk nodes by kind, and run pattern
//! queries whose metavariables (`$NAME`) act as named captures. Vue and
//! Svelte single-file components are parsed through their single top-level
//! `<script>` block, with reported lines mapped back to whole-file
//! coordinates.
//!
//! tree-sitter always yields a tree, inserting error nodes for unparseable
//! regions; callers must tolerate partial trees.

use std::sync::OnceLock;

use ast_grep_core::Node;
use ast_grep_core::matcher::KindMatcher;
use ast_grep_core::ops::Any;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_language::{LanguageExt, SupportLang};
use regex::Regex;

use crate::types::Language;

/// Concrete tree type produced by the facade.
pub type AstTree = ast_grep_core::AstGrep<StrDoc<SupportLang>>;

/// Node handle within an [`AstTree`].
pub type AstNode<'a> = Node<'a, StrDoc<SupportLang>>;

fn regex_script_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script([^>]*)>").expect("valid regex literal"))
}

fn regex_script_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</script>").expect("valid regex literal"))
}

/// Map a file language to its tree-sitter grammar, if AST analysis is
/// supported for it. SFC languages report the grammar of their script block.
pub fn support_lang(language: Language) -> Option<SupportLang> {
    match language {
        Language::Javascript => Some(SupportLang::JavaScript),
        Language::Typescript => Some(SupportLang::TypeScript),
        Language::Python => Some(SupportLang::Python),
        Language::Vue | Language::Svelte => Some(SupportLang::JavaScript),
        _ => None,
    }
}

/// The script block of an SFC, with enough context to map lines back.
pub struct ScriptBlock {
    pub text: String,
    pub lang: SupportLang,
    /// Lines preceding the script content in the original file.
    pub line_offset: usize,
}

/// Extract the first top-level `<script>...</script>` block from a Vue or
/// Svelte component. Returns `None` when no block is present.
pub fn extract_script_block(text: &str) -> Option<ScriptBlock> {
    let open = regex_script_open().captures(text)?;
    let attrs = open.get(1).map(|m| m.as_str()).unwrap_or_default();
    let content_start = open.get(0)?.end();
    let close = regex_script_close().find_at(text, content_start)?;
    let content = &text[content_start..close.start()];

    let lang = if attrs.contains("\"ts\"") || attrs.contains("'ts'") || attrs.contains("typescript")
    {
        SupportLang::TypeScript
    } else {
        SupportLang::JavaScript
    };
    // Lines before the script content, including the partial line holding
    // the opening tag.
    let line_offset = text[..content_start].matches('\n').count();

    Some(ScriptBlock {
        text: content.to_string(),
        lang,
        line_offset,
    })
}

/// A parsed source file ready for structural queries.
pub struct ParsedSource {
    pub tree: AstTree,
    pub lang: SupportLang,
    /// Added to every node line when mapping back to the original file
    /// (non-zero only for SFC script blocks).
    pub line_offset: usize,
}

impl ParsedSource {
    /// Parse `text` according to the scanner's language tag. Returns `None`
    /// for languages without AST support and for SFCs without a script
    /// block.
    pub fn parse(language: Language, text: &str) -> Option<ParsedSource> {
        match language {
            Language::Vue | Language::Svelte => {
                let block = extract_script_block(text)?;
                let tree = block.lang.ast_grep(&block.text);
                Some(ParsedSource {
                    tree,
                    lang: block.lang,
                    line_offset: block.line_offset,
                })
            }
            _ => {
                let lang = support_lang(language)?;
                let tree = lang.ast_grep(text);
                Some(ParsedSource {
                    tree,
                    lang,
                    line_offset: 0,
                })
            }
        }
    }

    /// All nodes of any of the given kinds, in document order.
    pub fn find_kinds<'a>(&'a self, kinds: &[&str]) -> Vec<AstNode<'a>> {
        let matchers: Vec<KindMatcher> = kinds
            .iter()
            .map(|kind| KindMatcher::new(kind, self.lang))
            .collect();
        let matcher = Any::new(matchers);
        self.tree
            .root()
            .find_all(&matcher)
            .map(|m| (*m).clone())
            .collect()
    }

    /// All matches of an ast-grep pattern; metavariables in the pattern are
    /// retrievable from each match's environment.
    pub fn find_pattern<'a>(
        &'a self,
        pattern: &str,
    ) -> Vec<ast_grep_core::NodeMatch<'a, StrDoc<SupportLang>>> {
        self.tree.root().find_all(pattern).collect()
    }

    /// 1-based line of a node in the original file.
    pub fn line_of(&self, node: &AstNode<'_>) -> usize {
        node.start_pos().line() + 1 + self.line_offset
    }

    /// 1-based column of a node.
    pub fn column_of(&self, node: &AstNode<'_>) -> usize {
        node.start_pos().column(node) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_javascript_function() {
        let parsed = ParsedSource::parse(Language::Javascript, "function a() { return 1; }")
            .expect("js should parse");
        let functions = parsed.find_kinds(&["function_declaration"]);
        assert_eq!(functions.len(), 1);
        assert_eq!(parsed.line_of(&functions[0]), 1);
    }

    #[test]
    fn parses_python_function() {
        let parsed =
            ParsedSource::parse(Language::Python, "def f():\n    pass\n").expect("py should parse");
        let functions = parsed.find_kinds(&["function_definition"]);
        assert_eq!(functions.len(), 1);
    }

    #[test]
    fn unknown_language_is_unsupported() {
        assert!(ParsedSource::parse(Language::Unknown, "whatever").is_none());
        assert!(ParsedSource::parse(Language::Go, "package main").is_none());
    }

    #[test]
    fn pattern_query_captures_names() {
        let parsed = ParsedSource::parse(Language::Javascript, "foo(); bar();").unwrap();
        let matches = parsed.find_pattern("$FN()");
        let names: Vec<String> = matches
            .iter()
            .filter_map(|m| m.get_env().get_match("FN"))
            .map(|n| n.text().to_string())
            .collect();
        assert!(names.contains(&"foo".to_string()));
        assert!(names.contains(&"bar".to_string()));
    }

    #[test]
    fn vue_script_block_extraction() {
        let sfc = "<template>\n  <div>{{ x }}</div>\n</template>\n<script lang=\"ts\">\nexport default { data() { return { x: 1 }; } }\n</script>\n";
        let block = extract_script_block(sfc).unwrap();
        assert_eq!(block.lang, SupportLang::TypeScript);
        assert_eq!(block.line_offset, 3);
        assert!(block.text.contains("export default"));
    }

    #[test]
    fn vue_lines_map_back_to_file() {
        let sfc = "<template>x</template>\n<script>\nfunction inner() { return 1; }\n</script>\n";
        let parsed = ParsedSource::parse(Language::Vue, sfc).unwrap();
        let functions = parsed.find_kinds(&["function_declaration"]);
        assert_eq!(functions.len(), 1);
        // Script content starts after the opening tag's newline: offset 2,
        // so the declaration on script-line 1 reports file-line 3.
        assert_eq!(parsed.line_of(&functions[0]), 3);
    }

    #[test]
    fn svelte_without_script_block_is_none() {
        assert!(ParsedSource::parse(Language::Svelte, "<h1>hello</h1>").is_none());
    }

    #[test]
    fn broken_source_still_yields_tree() {
        let parsed = ParsedSource::parse(Language::Typescript, "function ( {{{").unwrap();
        // Partial trees are fine; queries simply find less.
        let _ = parsed.find_kinds(&["function_declaration"]);
    }
}
