//! Brace-depth scanner for Gradle scripts.
//!
//! Gradle scripts are not parsed; instead every byte is classified as code
//! or as part of a comment/string literal, and `{ ... }` blocks are
//! delimited by counting braces in code only. Nesting depth is unbounded.

use std::ops::Range;

use regex_lite::Regex;

/// A `name { ... }` block located in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Byte offset of the block header (e.g. the `b` of `buildTypes`).
    pub start: usize,
    /// Byte offset of the opening brace.
    pub open: usize,
    /// Byte offset of the matching closing brace.
    pub close: usize,
}

impl Block {
    /// Offset one past the closing brace.
    pub fn end(&self) -> usize {
        self.close + 1
    }

    /// Range between the braces.
    pub fn body(&self) -> Range<usize> {
        self.open + 1..self.close
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str { quote: u8, triple: bool },
}

pub struct Scanner<'a> {
    text: &'a str,
    code: Vec<bool>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            code: classify(text.as_bytes()),
        }
    }

    /// Whether the byte at `pos` is code (outside comments and string literals).
    pub fn is_code(&self, pos: usize) -> bool {
        self.code.get(pos).copied().unwrap_or(false)
    }

    /// Finds the brace closing the one at `open`.
    pub fn matching_brace(&self, open: usize) -> Option<usize> {
        let bytes = self.text.as_bytes();
        if bytes.get(open) != Some(&b'{') || !self.is_code(open) {
            return None;
        }

        let mut depth = 0usize;
        for (i, &b) in bytes.iter().enumerate().skip(open) {
            if !self.code[i] {
                continue;
            }
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Number of unclosed code braces before `pos`.
    pub fn depth_at(&self, pos: usize) -> usize {
        let mut depth = 0usize;
        for (i, &b) in self.text.as_bytes()[..pos.min(self.text.len())].iter().enumerate() {
            if !self.code[i] {
                continue;
            }
            match b {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        depth
    }

    /// Finds blocks whose header matches `header` inside `within`.
    ///
    /// `header` must end with `\{`. When `depth` is given, only blocks whose
    /// header sits at that nesting depth are returned. Blocks with an
    /// unterminated body are skipped.
    pub fn blocks(&self, header: &Regex, within: Range<usize>, depth: Option<usize>) -> Vec<Block> {
        let bytes = self.text.as_bytes();
        let haystack = &self.text[within.clone()];

        header
            .find_iter(haystack)
            .filter_map(|m| {
                let start = within.start + m.start();
                let open = within.start + m.end() - 1;

                if !self.is_code(start) || !self.is_code(open) || bytes[open] != b'{' {
                    return None;
                }
                // `foo.release {` is a member access, not a block header.
                if start > 0 && bytes[start - 1] == b'.' {
                    return None;
                }
                if let Some(expected) = depth {
                    if self.depth_at(start) != expected {
                        return None;
                    }
                }

                let close = self.matching_brace(open)?;
                Some(Block { start, open, close })
            })
            .collect()
    }
}

fn classify(bytes: &[u8]) -> Vec<bool> {
    let mut code = vec![true; bytes.len()];
    let mut state = State::Code;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match state {
            State::Code => match b {
                b'/' if next == Some(b'/') => {
                    state = State::LineComment;
                    code[i] = false;
                }
                b'/' if next == Some(b'*') => {
                    state = State::BlockComment;
                    code[i] = false;
                    code[i + 1] = false;
                    i += 1;
                }
                b'"' | b'\'' => {
                    let triple = bytes.get(i + 1) == Some(&b) && bytes.get(i + 2) == Some(&b);
                    state = State::Str { quote: b, triple };
                    let width = if triple { 3 } else { 1 };
                    for flag in &mut code[i..i + width] {
                        *flag = false;
                    }
                    i += width - 1;
                }
                _ => {}
            },
            State::LineComment => {
                if b == b'\n' {
                    state = State::Code;
                } else {
                    code[i] = false;
                }
            }
            State::BlockComment => {
                code[i] = false;
                if b == b'*' && next == Some(b'/') {
                    code[i + 1] = false;
                    i += 1;
                    state = State::Code;
                }
            }
            State::Str { quote, triple } => {
                code[i] = false;
                if b == b'\\' && !triple {
                    if i + 1 < bytes.len() {
                        code[i + 1] = false;
                    }
                    i += 1;
                } else if b == quote {
                    if !triple {
                        state = State::Code;
                    } else if bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                        code[i + 1] = false;
                        code[i + 2] = false;
                        i += 2;
                        state = State::Code;
                    }
                } else if b == b'\n' && !triple {
                    // Unterminated single-line literal; resynchronise on the next line.
                    state = State::Code;
                }
            }
        }

        i += 1;
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str) -> Regex {
        Regex::new(&format!(r"\b{}\s*\{{", name)).unwrap()
    }

    #[test]
    fn test_matching_brace_nested() {
        let text = "a { b { c { } } d { } } tail";
        let scanner = Scanner::new(text);
        assert_eq!(scanner.matching_brace(2), Some(22));
        assert_eq!(scanner.matching_brace(6), Some(14));
    }

    #[test]
    fn test_braces_in_strings_and_comments_ignored() {
        let text = "x {\n  s = \"}\"\n  c = '{'\n  // }\n  /* } */\n  t = \"\"\"}\"\"\"\n}\n";
        let scanner = Scanner::new(text);
        let close = scanner.matching_brace(2).unwrap();
        assert_eq!(close, text.rfind('}').unwrap());
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let text = "x { s = \"a\\\"}\" }";
        let scanner = Scanner::new(text);
        assert_eq!(scanner.matching_brace(2), Some(text.len() - 1));
    }

    #[test]
    fn test_unterminated_block() {
        let scanner = Scanner::new("android {\n  defaultConfig {\n");
        assert_eq!(scanner.matching_brace(8), None);
        assert!(scanner.blocks(&header("android"), 0..26, None).is_empty());
    }

    #[test]
    fn test_blocks_depth_filter() {
        let text = "android {\n  defaultConfig { }\n  flavor { defaultConfig { } }\n}\n";
        let scanner = Scanner::new(text);
        let all = scanner.blocks(&header("defaultConfig"), 0..text.len(), None);
        assert_eq!(all.len(), 2);
        let direct = scanner.blocks(&header("defaultConfig"), 0..text.len(), Some(1));
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].start, text.find("defaultConfig").unwrap());
    }

    #[test]
    fn test_header_in_comment_skipped() {
        let text = "// android {\nandroid {\n}\n";
        let scanner = Scanner::new(text);
        let blocks = scanner.blocks(&header("android"), 0..text.len(), Some(0));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, 13);
    }

    #[test]
    fn test_member_access_not_a_header() {
        let text = "x { signingConfigs.release {\n} }";
        let scanner = Scanner::new(text);
        assert!(scanner.blocks(&header("release"), 0..text.len(), None).is_empty());
    }

    #[test]
    fn test_depth_at() {
        let text = "a { b { } c";
        let scanner = Scanner::new(text);
        assert_eq!(scanner.depth_at(0), 0);
        assert_eq!(scanner.depth_at(4), 1);
        assert_eq!(scanner.depth_at(6), 1);
        assert_eq!(scanner.depth_at(7), 2);
        assert_eq!(scanner.depth_at(text.len()), 1);
    }
}
