//! Dependency scanner for C sources

use super::Dependency;
use regex::Regex;
use std::sync::LazyLock;

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"#\s*include\s+([<"])([^">]+)[">]"#).unwrap());
static MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"DRO_MODULE\s*\(\s*"([^"]+)"\s*\)"#).unwrap());

/// Scan C source text for header includes and runtime module references
///
/// Comments are removed first, so commented-out includes are ignored. At most one
/// dependency is reported per line, an include taking precedence.
pub fn scan(source: &str) -> Vec<Dependency> {
    let stripped = strip_comments(source);
    let mut deps = Vec::new();

    for (idx, line) in stripped.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(caps) = INCLUDE_RE.captures(line) {
            let system = &caps[1] == "<";
            deps.push(Dependency::header(&caps[2], system, line_no));
        } else if let Some(caps) = MODULE_RE.captures(line) {
            deps.push(Dependency::module(&caps[1], line_no));
        }
    }

    deps
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str,
    Char,
}

/// Replace comments with spaces, keeping newlines so line numbers stay intact
///
/// Comment openers inside string and character literals are not treated as comments.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '"' => {
                    out.push(c);
                    state = State::Str;
                }
                '\'' => {
                    out.push(c);
                    state = State::Char;
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::Str | State::Char => {
                out.push(c);
                let quote = if state == State::Str { '"' } else { '\'' };
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                        if next == '\n' {
                            state = State::Code;
                        }
                    }
                } else if c == quote || c == '\n' {
                    state = State::Code;
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DependencyKind;

    #[test]
    fn test_scan_includes_and_modules() {
        let src = r#"#include <stdint.h>
#include "app.h"

DRO_MODULE("graphics");

void _start(void) {}
"#;
        let deps = scan(src);
        assert_eq!(
            deps,
            vec![
                Dependency::header("stdint.h", true, 1),
                Dependency::header("app.h", false, 2),
                Dependency::module("graphics", 4),
            ]
        );
    }

    #[test]
    fn test_ignores_commented_dependencies() {
        let src = "// #include <old.h>\n/* #include \"gone.h\"\n   DRO_MODULE(\"net\") */\n#include <kept.h>\n";
        let deps = scan(src);
        assert_eq!(deps, vec![Dependency::header("kept.h", true, 4)]);
    }

    #[test]
    fn test_block_comment_on_one_line_keeps_rest() {
        let src = "/* note */ #include \"after.h\"\n";
        let deps = scan(src);
        assert_eq!(deps, vec![Dependency::header("after.h", false, 1)]);
    }

    #[test]
    fn test_include_wins_over_module_on_same_line() {
        let src = "#include \"a.h\" DRO_MODULE(\"m\")\n";
        let deps = scan(src);
        assert_eq!(deps.len(), 1);
        assert!(matches!(deps[0].kind, DependencyKind::Header { system: false }));
    }

    #[test]
    fn test_module_with_spacing() {
        let deps = scan("DRO_MODULE ( \"power\" )\n");
        assert_eq!(deps, vec![Dependency::module("power", 1)]);
    }

    #[test]
    fn test_comment_opener_inside_string() {
        let src = "const char *u = \"http://x\"; DRO_MODULE(\"net\")\n";
        assert_eq!(scan(src), vec![Dependency::module("net", 1)]);
    }

    #[test]
    fn test_strip_preserves_lines() {
        let src = "a /* b\nc */ d\n";
        let stripped = strip_comments(src);
        assert_eq!(stripped.lines().count(), 2);
        assert!(stripped.starts_with("a "));
        assert!(stripped.ends_with(" d\n"));
        assert!(!stripped.contains('b'));
    }

    #[test]
    fn test_empty_source() {
        assert!(scan("").is_empty());
    }
}
