//! Reader for JavaScript object literals.
//!
//! The manifest is a script, not JSON: keys may be bare identifiers,
//! strings may be single-quoted, and trailing commas and comments are
//! common. This reader accepts that subset and produces a
//! [`serde_json::Value`]. Anything that is not a literal (a reference to
//! another variable, `undefined`) reads as `null`; `new Array(...)` and
//! `new Object(...)` read as empty containers.

use serde_json::{Map, Number, Value};

/// Deepest object/array nesting a literal may have.
pub(crate) const MAX_DEPTH: usize = 128;

/// Parse one literal at the start of `input`.
///
/// Returns the value and the number of bytes consumed, so callers can
/// read a literal embedded in a larger script.
pub(crate) fn parse_literal(input: &str) -> Result<(Value, usize), String> {
    let mut reader = LiteralReader::new(input);
    let value = reader.value()?;
    Ok((value, reader.pos))
}

/// Copy of `src` with comments blanked to spaces and string contents
/// replaced by `_`.
///
/// Quotes stay in place and byte offsets line up with `src`, so a pattern
/// matched against the copy only hits live code and its match ranges index
/// straight into the original text.
pub(crate) fn blank_comments_and_strings(src: &str) -> String {
    let mut reader = LiteralReader::new(src);
    let mut out = Vec::with_capacity(src.len());
    while let Some(c) = reader.peek() {
        let start = reader.pos;
        match c {
            b'/' if matches!(reader.bytes.get(start + 1), Some(b'/') | Some(b'*')) => {
                reader.skip_trivia();
                out.resize(reader.pos, b' ');
            }
            b'"' | b'\'' | b'`' => {
                out.push(c);
                if reader.string().is_ok() {
                    out.resize(reader.pos - 1, b'_');
                    out.push(c);
                } else {
                    reader.pos = reader.bytes.len();
                    out.resize(reader.pos, b'_');
                }
            }
            _ => {
                out.push(c);
                reader.pos += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

struct LiteralReader<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> LiteralReader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, what: &str) -> String {
        match self.peek() {
            Some(c) => format!("{} at byte {} (found '{}')", what, self.pos, c as char),
            None => format!("{} at end of input", what),
        }
    }

    /// Skip whitespace, `//` and `/* */` comments.
    fn skip_trivia(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
                self.pos += 1;
            }
            let rest = &self.bytes[self.pos..];
            if rest.starts_with(b"//") {
                while !matches!(self.peek(), None | Some(b'\n')) {
                    self.pos += 1;
                }
            } else if rest.starts_with(b"/*") {
                match self.src[self.pos + 2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => self.pos = self.bytes.len(),
                }
            } else {
                return;
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), String> {
        self.skip_trivia();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_trivia();
        match self.peek() {
            Some(b'{') => self.nested(Self::object),
            Some(b'[') => self.nested(Self::array),
            Some(b'"') | Some(b'\'') => self.string().map(Value::String),
            Some(c) if c == b'-' || c == b'+' || c == b'.' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => self.word(),
            _ => Err(self.error("expected a value")),
        }
    }

    fn nested(&mut self, read: fn(&mut Self) -> Result<Value, String>) -> Result<Value, String> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(&format!("nesting deeper than {}", MAX_DEPTH)));
        }
        self.depth += 1;
        let value = read(self);
        self.depth -= 1;
        value
    }

    fn object(&mut self) -> Result<Value, String> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = self.key()?;
            self.expect(b':')?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn array(&mut self) -> Result<Value, String> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);

            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn key(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.string(),
            Some(c) if is_ident_start(c) => Ok(self.ident().to_string()),
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'.') {
                    self.pos += 1;
                }
                Ok(self.src[start..self.pos].to_string())
            }
            _ => Err(self.error("expected a property name")),
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let src = self.src;
        let quote = self.bytes[self.pos];
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = &src[self.pos..];
            let mut chars = rest.chars();
            let c = chars.next().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += c.len_utf8();
            match c {
                c if c as u32 == quote as u32 => return Ok(out),
                '\\' => {
                    let escaped = chars
                        .next()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    self.pos += escaped.len_utf8();
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        '0' => out.push('\0'),
                        'u' => out.push(self.hex_escape(4)?),
                        'x' => out.push(self.hex_escape(2)?),
                        // Line continuation
                        '\n' => {}
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, String> {
        let hex = self
            .src
            .get(self.pos..self.pos + digits)
            .ok_or_else(|| self.error("truncated escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid escape"))?;
        self.pos += digits;
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        let rest = &self.bytes[self.pos..];
        if rest.starts_with(b"0x") || rest.starts_with(b"0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let magnitude = i64::from_str_radix(&self.src[digits_start..self.pos], 16)
                .map_err(|_| self.error("invalid hex number"))?;
            let value = if self.bytes[start] == b'-' {
                -magnitude
            } else {
                magnitude
            };
            return Ok(Value::Number(value.into()));
        }

        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'-') | Some(b'+')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text = self.src[start..self.pos].trim_start_matches('+');
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        let float: f64 = text
            .parse()
            .map_err(|_| format!("invalid number '{}' at byte {}", text, start))?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| format!("non-finite number '{}' at byte {}", text, start))
    }

    fn ident(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.pos += 1;
        }
        &src[start..self.pos]
    }

    fn word(&mut self) -> Result<Value, String> {
        match self.ident() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" | "undefined" => Ok(Value::Null),
            "new" => {
                self.skip_trivia();
                let constructor = self.ident();
                self.skip_call_arguments()?;
                Ok(match constructor {
                    "Array" => Value::Array(Vec::new()),
                    _ => Value::Object(Map::new()),
                })
            }
            _ => {
                // Member access chains like `Foo.bar`
                while self.peek() == Some(b'.') {
                    self.pos += 1;
                    self.ident();
                }
                Ok(Value::Null)
            }
        }
    }

    /// Skip a balanced `( ... )` argument list if one follows.
    fn skip_call_arguments(&mut self) -> Result<(), String> {
        self.skip_trivia();
        if self.peek() != Some(b'(') {
            return Ok(());
        }
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced '('"))
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}
