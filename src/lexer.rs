//! Token lexer: splits a raw input line into argument strings.
//!
//! Single mutable cursor over the input bytes. Quoting state is tracked by a
//! `terminator` byte: `b' '` while unquoted, the open quote character
//! otherwise. Unlike a one-shot "detect the opening quote, then scan to its
//! close" scheme, `terminator` is re-evaluated on every character, so a
//! token can open and close several quoted regions in turn (`a"b"c'd'`).
//! Never fails — malformed quoting just runs to end of input and emits
//! whatever was accumulated.
//!
//! ## Adjacent-quote rule
//!
//! `a"b"c'd'` lexes to one token `abcd`: when a quoted region's terminator
//! quote is seen, a non-space, non-EOF follower keeps the token going (in a
//! freshly opened quote state if the follower is itself a quote char). Two
//! of the same quote character back to back (`''`, `""`) inside an
//! already-open quoted region are a no-op rather than a state change.

/// One token produced by [`lex`]. Never empty.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token(pub String);

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    terminator: u8,
    buf: String,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            terminator: b' ',
            buf: String::new(),
        }
    }

    fn done(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn prev(&self) -> u8 {
        self.src[self.pos - 1]
    }

    fn skip(&mut self) {
        self.pos += 1;
    }

    fn read(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.skip();
        Some(b)
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.skip();
        }
    }

    fn is_space_terminated(&self) -> bool {
        self.terminator == b' '
    }

    /// Sets up a new token: skip leading spaces, reset to the unquoted
    /// state. Whether the token's first character opens a quote is decided
    /// uniformly by the main loop in [`Self::next_arg`], same as any other
    /// character position.
    fn setup(&mut self) {
        self.skip_spaces();
        self.buf.clear();
        self.terminator = b' ';
    }

    /// `''` or `""` immediately adjacent inside an open quoted region:
    /// consume the second quote and stay in the same state.
    fn skip_twin_quotes(&mut self) -> bool {
        if self.is_space_terminated() || self.done() {
            return false;
        }
        if self.prev() == self.terminator && self.peek() == Some(self.terminator) {
            self.skip();
            return true;
        }
        false
    }

    /// Handles a `\` seen while accumulating a token. Returns the character
    /// to append.
    fn escape_backslash(&mut self) -> u8 {
        match self.terminator {
            b'"' => match self.peek() {
                Some(b @ (b'\\' | b'"')) => {
                    self.skip();
                    b
                }
                _ => self.prev(),
            },
            b'\'' => self.prev(),
            _ => self.read().unwrap_or(self.prev()),
        }
    }

    /// True when the token continues past the terminator quote because the
    /// next byte is neither a space nor end of input.
    fn is_concatenated(&self) -> bool {
        !self.is_space_terminated() && !self.done() && self.peek() != Some(b' ')
    }

    fn next_arg(&mut self) -> Option<String> {
        if self.done() {
            return None;
        }
        self.setup();

        loop {
            let b = match self.read() {
                Some(b) => b,
                None => break,
            };

            if b == b'\\' {
                let out = self.escape_backslash();
                self.buf.push(out as char);
                continue;
            }

            if self.is_space_terminated() {
                // Unquoted: a space ends the token, a quote char opens a new
                // quoted region starting here (re-evaluated every character,
                // not just at the start of the token).
                if b == b' ' {
                    break;
                }
                if b == b'\'' || b == b'"' {
                    self.terminator = b;
                    continue;
                }
                self.buf.push(b as char);
                continue;
            }

            if b == self.terminator {
                if self.skip_twin_quotes() {
                    continue;
                }
                let continues = self.is_concatenated();
                self.terminator = b' ';
                if continues {
                    continue;
                }
                break;
            }

            self.buf.push(b as char);
        }

        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

/// Lexes `line` into an ordered sequence of tokens.
pub fn lex(line: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(line);
    let mut tokens = Vec::new();
    while let Some(arg) = lexer.next_arg() {
        tokens.push(Token(arg));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        lex(line).into_iter().map(|t| t.0).collect()
    }

    #[test]
    fn simple_words() {
        assert_eq!(words("echo hello world"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn extra_whitespace() {
        assert_eq!(words("  echo   hello  "), vec!["echo", "hello"]);
    }

    #[test]
    fn single_quotes_preserve_spaces() {
        assert_eq!(words("echo 'hello   world'"), vec!["echo", "hello   world"]);
    }

    #[test]
    fn single_quotes_no_escape() {
        assert_eq!(words(r"echo 'a\b'"), vec!["echo", r"a\b"]);
    }

    #[test]
    fn double_quotes_escape_backslash_and_quote_only() {
        assert_eq!(words(r#"echo "a\"b" "c\\d""#), vec!["echo", "a\"b", r"c\d"]);
    }

    #[test]
    fn double_quotes_literal_backslash_before_other() {
        assert_eq!(words(r#"echo "a\nb""#), vec!["echo", r"a\nb"]);
    }

    #[test]
    fn unquoted_backslash_escapes_next_literally() {
        assert_eq!(words(r"echo a\ b"), vec!["echo", "a b"]);
    }

    #[test]
    fn adjacent_quote_concatenation() {
        assert_eq!(words("echo a\"b\"c'd'e"), vec!["echo", "abcde"]);
    }

    #[test]
    fn quote_opens_mid_token_not_just_at_start() {
        // A quote character reached partway through an unquoted run still
        // opens a quoted region — terminator state isn't latched once at
        // the start of the token.
        assert_eq!(words("echo a''b"), vec!["echo", "ab"]);
        assert_eq!(words(r#"echo a"b c"d"#), vec!["echo", "ab cd"]);
    }

    #[test]
    fn twin_quotes_are_noop() {
        // A matching quote pair inside an already-open quoted region doesn't
        // close it; both quote characters are simply dropped.
        assert_eq!(words("echo 'a''b'"), vec!["echo", "ab"]);
        assert_eq!(words(r#"echo "a""b""#), vec!["echo", "ab"]);
    }

    #[test]
    fn empty_quoted_token_is_dropped() {
        // An empty token never makes it into the output (see the no-empty-token invariant).
        assert_eq!(words("''"), Vec::<String>::new());
        assert_eq!(words("echo ''"), vec!["echo"]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(words(""), Vec::<String>::new());
        assert_eq!(words("   "), Vec::<String>::new());
    }

    #[test]
    fn redirection_operators_are_plain_words_here() {
        assert_eq!(words("echo hi > out.txt"), vec!["echo", "hi", ">", "out.txt"]);
    }
}
