//! POSIX shell-glob to anchored regular expression compiler.
//!
//! [`compile`] scans the pattern one character at a time, keeping a stack of
//! subpattern buffers. Opening a bracket expression pushes a buffer so that an
//! expression still open at end of input can be replayed as literal text
//! instead of producing an invalid regex.
//!
//! Translation rules:
//!
//! | glob          | regex                                   |
//! |---------------|-----------------------------------------|
//! | `*`, `**`     | `.*` (runs collapse to one operator)    |
//! | `?`           | `.`                                     |
//! | `.` `^` `+` … | escaped literal                         |
//! | `\x`          | literal `x`                             |
//! | `[!a-z]`      | `[^a-z]`                                |
//! | `[]a]`        | `[\]a]` (leading `]` is a member)       |
//! | `[abc`        | `\[abc` (unterminated bracket)          |
//!
//! The whole expression is anchored, so partial matches never succeed.

use regex::{Regex, RegexBuilder};

use crate::error::{MimeError, MimeResult};

/// Compiled-program ceiling handed to the regex engine. Globs with deeply
/// repeated wildcards or brackets past this bound fail to compile instead of
/// producing pathological matchers.
pub const GLOB_SIZE_LIMIT: usize = 1 << 20;

/// Options for [`compile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GlobFlags {
    pub case_insensitive: bool,
}

impl GlobFlags {
    pub fn case_insensitive() -> Self {
        Self {
            case_insensitive: true,
        }
    }

    pub fn case_sensitive() -> Self {
        Self {
            case_insensitive: false,
        }
    }
}

/// A glob translated into an anchored regex.
#[derive(Debug, Clone)]
pub struct CompiledGlob {
    pattern: String,
    flags: GlobFlags,
    regex: Regex,
}

impl CompiledGlob {
    /// The original glob text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> GlobFlags {
        self.flags
    }

    /// The translated regex source, including anchors.
    pub fn regex_source(&self) -> &str {
        self.regex.as_str()
    }

    /// Match the whole of `text` against the glob.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Compile a glob into an anchored matcher.
///
/// Fails with [`MimeError::MalformedPattern`] on empty input, on a NUL byte,
/// or when the regex engine rejects the translation (including when it
/// exceeds [`GLOB_SIZE_LIMIT`]).
pub fn compile(pattern: &str, flags: GlobFlags) -> MimeResult<CompiledGlob> {
    let source = translate(pattern)?;
    let regex = RegexBuilder::new(&source)
        .case_insensitive(flags.case_insensitive)
        .dot_matches_new_line(true)
        .size_limit(GLOB_SIZE_LIMIT)
        .build()
        .map_err(|e| MimeError::malformed_pattern(pattern, e.to_string()))?;

    Ok(CompiledGlob {
        pattern: pattern.to_string(),
        flags,
        regex,
    })
}

/// Returns `true` if `text` contains an unescaped glob metacharacter.
pub fn has_wildcards(text: &str) -> bool {
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

/// Translate a glob into anchored regex source without compiling it.
pub fn translate(pattern: &str) -> MimeResult<String> {
    if pattern.is_empty() {
        return Err(MimeError::malformed_pattern(pattern, "empty pattern"));
    }
    if pattern.contains('\0') {
        return Err(MimeError::malformed_pattern(
            pattern,
            "pattern contains a NUL byte",
        ));
    }

    let mut translator = Translator::new();
    let chars: Vec<char> = pattern.chars().collect();
    translator.feed_all(&chars);
    translator.finish();

    let body = translator.stack.pop().map(|b| b.out).unwrap_or_default();
    Ok(format!("^(?:{body})$"))
}

/// One level of the subpattern stack.
#[derive(Debug, Default)]
struct Buffer {
    /// Translated regex text.
    out: String,
    /// Glob text consumed since the opening `[`, replayed if never closed.
    source: Vec<char>,
    bracket: bool,
    negated: bool,
    members: usize,
    last_was_star: bool,
}

struct Translator {
    stack: Vec<Buffer>,
    escaped: bool,
}

impl Translator {
    fn new() -> Self {
        Self {
            stack: vec![Buffer::default()],
            escaped: false,
        }
    }

    fn top(&mut self) -> &mut Buffer {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn feed_all(&mut self, chars: &[char]) {
        let mut i = 0;
        while i < chars.len() {
            i += self.feed(chars, i);
        }
    }

    /// Consume the token at `chars[i]`, returning how many chars were used.
    fn feed(&mut self, chars: &[char], i: usize) -> usize {
        let c = chars[i];
        let in_bracket = self.top().bracket;
        if in_bracket {
            self.top().source.push(c);
        }

        if self.escaped {
            self.escaped = false;
            self.literal(c);
            return 1;
        }

        if c == '\\' {
            self.escaped = true;
            return 1;
        }

        if in_bracket {
            return self.feed_bracket(chars, i);
        }

        match c {
            '*' => {
                let top = self.top();
                if !top.last_was_star {
                    top.out.push_str(".*");
                    top.last_was_star = true;
                }
            }
            '?' => {
                let top = self.top();
                top.out.push('.');
                top.last_was_star = false;
            }
            '[' => {
                self.top().last_was_star = false;
                self.stack.push(Buffer {
                    bracket: true,
                    ..Buffer::default()
                });
            }
            _ => self.literal(c),
        }
        1
    }

    fn feed_bracket(&mut self, chars: &[char], i: usize) -> usize {
        let c = chars[i];
        let (members, negated) = {
            let top = self.top();
            (top.members, top.negated)
        };

        if (c == '!' || c == '^') && members == 0 && !negated {
            self.top().negated = true;
            return 1;
        }

        if c == ']' {
            if members == 0 {
                self.literal(c);
            } else {
                self.close_bracket();
            }
            return 1;
        }

        if c == '[' && chars.get(i + 1) == Some(&':') {
            if let Some(len) = posix_class_len(&chars[i..]) {
                let class: String = chars[i..i + len].iter().collect();
                let top = self.top();
                top.source.extend_from_slice(&chars[i + 1..i + len]);
                top.out.push_str(&class);
                top.members += 1;
                return len;
            }
        }

        if c == '-' && members > 0 && chars.get(i + 1).is_some_and(|n| *n != ']') {
            self.top().out.push('-');
            return 1;
        }

        self.literal(c);
        1
    }

    fn close_bracket(&mut self) {
        let Some(buffer) = self.stack.pop() else {
            return;
        };
        let parent = self.top();
        parent.out.push('[');
        if buffer.negated {
            parent.out.push('^');
        }
        parent.out.push_str(&buffer.out);
        parent.out.push(']');
        parent.last_was_star = false;
        if parent.bracket {
            parent.members += 1;
        }
    }

    fn literal(&mut self, c: char) {
        let top = self.top();
        top.out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
        top.last_was_star = false;
        if top.bracket {
            top.members += 1;
        }
    }

    fn finish(&mut self) {
        if self.escaped {
            self.escaped = false;
            self.literal('\\');
        }

        // Replay every bracket expression left open as literal text.
        while self.stack.len() > 1 {
            let Some(open) = self.stack.pop() else {
                break;
            };
            self.literal('[');
            let replay = open.source;
            self.escaped = false;
            let mut i = 0;
            while i < replay.len() {
                i += self.feed(&replay, i);
            }
            if self.escaped {
                self.escaped = false;
                self.literal('\\');
            }
        }
    }
}

/// Length of a `[:name:]` class starting at `chars[0]`, if well formed.
fn posix_class_len(chars: &[char]) -> Option<usize> {
    let mut j = 2;
    while j + 1 < chars.len() {
        let c = chars[j];
        if c == ':' && chars[j + 1] == ']' {
            let name_ok = j > 2 && chars[2..j].iter().all(|c| c.is_ascii_lowercase());
            return name_ok.then_some(j + 2);
        }
        if !c.is_ascii_lowercase() {
            return None;
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(pattern: &str) -> CompiledGlob {
        compile(pattern, GlobFlags::case_sensitive()).unwrap()
    }

    #[test]
    fn test_extension_glob() {
        let g = glob("*.jpg");
        assert!(g.is_match("photo.jpg"));
        assert!(!g.is_match("photo.jpeg"));
        assert!(!g.is_match("photo.jpg.bak"));
    }

    #[test]
    fn test_bracket_class() {
        let g = glob("[Mm]akefile.*");
        assert!(g.is_match("Makefile.lol"));
        assert!(g.is_match("makefile.lol"));
        assert!(!g.is_match("Makefile"));
        assert!(!g.is_match("xakefile.lol"));
    }

    #[test]
    fn test_compound_glob() {
        let g = glob("*.7z.001");
        assert!(g.is_match("archive.7z.001"));
        assert!(!g.is_match("archive.7z"));
    }

    #[test]
    fn test_empty_pattern_is_malformed() {
        assert!(matches!(
            compile("", GlobFlags::default()),
            Err(MimeError::MalformedPattern { .. })
        ));
    }

    #[test]
    fn test_nul_is_malformed() {
        assert!(matches!(
            compile("*.a\0b", GlobFlags::default()),
            Err(MimeError::MalformedPattern { .. })
        ));
    }

    #[test]
    fn test_star_runs_collapse() {
        assert_eq!(translate("***.txt").unwrap(), r"^(?:.*\.txt)$");
        assert_eq!(translate("a**b").unwrap(), "^(?:a.*b)$");
    }

    #[test]
    fn test_dot_is_literal() {
        let g = glob("a.c");
        assert!(g.is_match("a.c"));
        assert!(!g.is_match("abc"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let g = glob("file?.txt");
        assert!(g.is_match("file1.txt"));
        assert!(!g.is_match("file.txt"));
        assert!(!g.is_match("file12.txt"));
    }

    #[test]
    fn test_question_mark_literal_in_bracket() {
        let g = glob("a[?]b");
        assert!(g.is_match("a?b"));
        assert!(!g.is_match("axb"));
    }

    #[test]
    fn test_escaped_wildcards_are_literal() {
        let g = glob(r"\*.txt");
        assert!(g.is_match("*.txt"));
        assert!(!g.is_match("a.txt"));

        let g = glob(r"what\?");
        assert!(g.is_match("what?"));
        assert!(!g.is_match("whats"));
    }

    #[test]
    fn test_bang_negates_bracket() {
        let g = glob("[!a]x");
        assert!(g.is_match("bx"));
        assert!(!g.is_match("ax"));
    }

    #[test]
    fn test_caret_negates_bracket_but_is_literal_outside() {
        let g = glob("[^a]x");
        assert!(g.is_match("bx"));
        assert!(!g.is_match("ax"));

        let g = glob("^x");
        assert!(g.is_match("^x"));
        assert!(!g.is_match("x"));
    }

    #[test]
    fn test_bang_literal_outside_bracket() {
        let g = glob("hi!");
        assert!(g.is_match("hi!"));
    }

    #[test]
    fn test_leading_close_bracket_is_member() {
        let g = glob("[]a]");
        assert!(g.is_match("]"));
        assert!(g.is_match("a"));
        assert!(!g.is_match("b"));

        let g = glob("[!]]");
        assert!(g.is_match("x"));
        assert!(!g.is_match("]"));
    }

    #[test]
    fn test_unterminated_bracket_is_literal() {
        let g = glob("[abc");
        assert!(g.is_match("[abc"));
        assert!(!g.is_match("a"));

        let g = glob("*.[ch");
        assert!(g.is_match("x.[ch"));
    }

    #[test]
    fn test_unterminated_bracket_replays_wildcards() {
        let g = glob("[a*");
        assert!(g.is_match("[a"));
        assert!(g.is_match("[abc"));
    }

    #[test]
    fn test_range_in_bracket() {
        let g = glob("*.[0-9][0-9][0-9]");
        assert!(g.is_match("archive.001"));
        assert!(!g.is_match("archive.0a1"));
    }

    #[test]
    fn test_trailing_dash_in_bracket_is_literal() {
        let g = glob("[a-]");
        assert!(g.is_match("-"));
        assert!(g.is_match("a"));
    }

    #[test]
    fn test_posix_class() {
        let g = glob("[[:digit:]]x");
        assert!(g.is_match("7x"));
        assert!(!g.is_match("ax"));
    }

    #[test]
    fn test_regex_metacharacters_are_escaped() {
        let g = glob("a+(b)|{c}$");
        assert!(g.is_match("a+(b)|{c}$"));
        assert!(!g.is_match("aa(b)|{c}"));
    }

    #[test]
    fn test_trailing_backslash_is_literal() {
        let g = glob(r"abc\");
        assert!(g.is_match(r"abc\"));
    }

    #[test]
    fn test_anchored_no_partial_match() {
        let g = glob("README");
        assert!(g.is_match("README"));
        assert!(!g.is_match("README.md"));
        assert!(!g.is_match("xREADME"));
    }

    #[test]
    fn test_case_insensitive_flag() {
        let g = compile("*.JPG", GlobFlags::case_insensitive()).unwrap();
        assert!(g.is_match("a.jpg"));
        assert!(g.is_match("a.JpG"));

        let g = compile("*.JPG", GlobFlags::case_sensitive()).unwrap();
        assert!(!g.is_match("a.jpg"));
    }

    #[test]
    fn test_has_wildcards() {
        assert!(has_wildcards("*.txt"));
        assert!(has_wildcards("file?"));
        assert!(has_wildcards("[ab]"));
        assert!(!has_wildcards("Makefile"));
        assert!(!has_wildcards(r"\*literal"));
    }

    #[test]
    fn test_pattern_accessors() {
        let g = glob("*.md");
        assert_eq!(g.pattern(), "*.md");
        assert_eq!(g.regex_source(), r"^(?:.*\.md)$");
        assert_eq!(g.flags(), GlobFlags::case_sensitive());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn compile_never_panics(pattern in ".*") {
            let _ = compile(&pattern, GlobFlags::case_insensitive());
        }

        #[test]
        fn literal_globs_match_themselves(name in "[a-zA-Z0-9_.-]{1,24}") {
            let glob = compile(&name, GlobFlags::case_sensitive()).unwrap();
            prop_assert!(glob.is_match(&name));
            prop_assert!(!has_wildcards(&name));
        }

        #[test]
        fn star_extension_matches_any_stem(stem in "[^/\\\\]{0,16}", ext in "[a-z0-9]{1,6}") {
            let glob = compile(&format!("*.{ext}"), GlobFlags::case_insensitive()).unwrap();
            let name = format!("{stem}.{}", ext.to_uppercase());
            prop_assert!(glob.is_match(&name));
        }
    }
}
