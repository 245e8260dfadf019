//! Mutable shader source buffer and the token-level primitives every
//! rewrite pass is built from.
//!
//! The buffer is owned by exactly one conversion; passes mutate it in
//! place. All offsets are byte offsets. Shader source in the engine's
//! dialect is ASCII outside of comments, and comments are stripped
//! before any structural pass runs.

/// Characters that can appear inside an identifier.
pub fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Characters that terminate a `*` operand at parenthesis depth zero.
const OPERAND_DELIMITERS: &[u8] = b";+-=*/,<>%?&|:{} \t\n\r";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBuffer {
    text: String,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Plain substring search, no token-boundary check.
    pub fn find_from(&self, pat: &str, from: usize) -> Option<usize> {
        if from > self.text.len() {
            return None;
        }
        self.text[from..].find(pat).map(|o| from + o)
    }

    /// Whether the match at `at..at + len` sits on identifier boundaries:
    /// the byte before and the byte after must not be identifier chars.
    pub fn on_token_boundary(&self, at: usize, len: usize) -> bool {
        let b = self.text.as_bytes();
        if at > 0 && is_ident_char(b[at - 1]) {
            return false;
        }
        if at + len < b.len() && is_ident_char(b[at + len]) {
            return false;
        }
        true
    }

    /// First whole-token occurrence of `name` at or after `from`.
    pub fn find_ident(&self, name: &str, from: usize) -> Option<usize> {
        let mut pos = from;
        while let Some(at) = self.find_from(name, pos) {
            if self.on_token_boundary(at, name.len()) {
                return Some(at);
            }
            pos = at + name.len();
        }
        None
    }

    pub fn contains_ident(&self, name: &str) -> bool {
        self.find_ident(name, 0).is_some()
    }

    /// Replaces every whole-token occurrence of `from` with `to` in one
    /// left-to-right sweep. The cursor advances past each inserted
    /// replacement, so a replacement containing `from` does not recurse.
    /// Returns whether at least one replacement occurred.
    pub fn replace_ident(&mut self, from: &str, to: &str) -> bool {
        if from.is_empty() {
            return false;
        }
        let mut replaced = false;
        let mut pos = 0;
        while let Some(at) = self.find_from(from, pos) {
            if !self.on_token_boundary(at, from.len()) {
                pos = at + from.len();
                continue;
            }
            self.text.replace_range(at..at + from.len(), to);
            pos = at + to.len();
            replaced = true;
        }
        replaced
    }

    pub fn insert(&mut self, at: usize, s: &str) {
        self.text.insert_str(at, s);
    }

    pub fn prepend(&mut self, s: &str) {
        self.text.insert_str(0, s);
    }

    pub fn append(&mut self, s: &str) {
        self.text.push_str(s);
    }

    pub fn replace_range(&mut self, range: std::ops::Range<usize>, with: &str) {
        self.text.replace_range(range, with);
    }

    pub fn remove_range(&mut self, range: std::ops::Range<usize>) {
        self.text.replace_range(range, "");
    }

    /// Removes `//` line comments (the newline survives) and `/* */`
    /// block comments. An unterminated block comment swallows the rest
    /// of the buffer.
    pub fn strip_comments(&mut self) {
        while let Some(from) = self.text.find("//") {
            let end = self.text[from..]
                .find(['\n', '\r'])
                .map(|o| from + o)
                .unwrap_or(self.text.len());
            self.text.replace_range(from..end, "");
        }
        while let Some(from) = self.text.find("/*") {
            let end = self.text[from + 2..]
                .find("*/")
                .map(|o| from + 2 + o + 2)
                .unwrap_or(self.text.len());
            self.text.replace_range(from..end, "");
        }
    }

    /// Start offset of the operand to the left of the `*` at `star`:
    /// a maximal run of identifier/number/dot/bracket characters plus
    /// balanced parenthesized subexpressions, ending at a
    /// statement-delimiting character at parenthesis depth zero.
    /// `None` when the scan runs off the buffer without a delimiter.
    pub fn operand_start(&self, star: usize) -> Option<usize> {
        let b = self.text.as_bytes();
        let mut depth = 0i32;
        let mut leading = true;
        let mut i = star;
        while i > 1 {
            i -= 1;
            let c = b[i];
            if leading && c <= b' ' {
                continue;
            }
            leading = false;
            if c == b')' {
                depth += 1;
            } else if c == b'(' {
                depth -= 1;
                if depth < 0 {
                    return Some(i + 1);
                }
            } else if depth == 0 && OPERAND_DELIMITERS.contains(&c) {
                return Some(i + 1);
            }
        }
        None
    }

    /// One-past-end offset of the operand to the right of the `*` at
    /// `star`. Same delimiter rules as [`Self::operand_start`].
    pub fn operand_end(&self, star: usize) -> Option<usize> {
        let b = self.text.as_bytes();
        let mut depth = 0i32;
        let mut leading = true;
        let mut i = star + 1;
        while i < b.len() {
            let c = b[i];
            if leading && c <= b' ' {
                i += 1;
                continue;
            }
            leading = false;
            if c == b'(' {
                depth += 1;
            } else if c == b')' {
                depth -= 1;
                if depth < 0 {
                    return Some(i);
                }
            } else if depth == 0 && OPERAND_DELIMITERS.contains(&c) {
                return Some(i);
            }
            i += 1;
        }
        None
    }
}
