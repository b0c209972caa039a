//! Decoder for Python-style literal text.
//!
//! Accepts the subset of literal syntax that nested metric documents take
//! after a round trip through a CSV export: dicts, lists, tuples, single or
//! double quoted strings, integers, floats, `True`, `False` and `None`.
//! Trailing commas are allowed. Produces the same `serde_json::Value` shape
//! the JSON decoder would.

use serde_json::{Map, Number, Value};

/// Same nesting limit serde_json applies.
const MAX_DEPTH: usize = 128;

/// Parse a complete literal expression.
pub fn parse_literal(input: &str) -> Result<Value, String> {
    let mut parser = LiteralParser {
        src: input,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, msg: &str) -> String {
        format!("{msg} at offset {}", self.pos)
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.nested(|p| p.dict()),
            Some('[') => self.nested(|p| p.sequence('[', ']')),
            Some('(') => self.nested(|p| p.sequence('(', ')')),
            Some('\'') | Some('"') => self.string().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, String>,
    ) -> Result<Value, String> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn dict(&mut self) -> Result<Value, String> {
        self.bump();
        let mut map = Map::new();
        loop {
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => (if b { "True" } else { "False" }).to_string(),
                Value::Null => "None".to_string(),
                _ => return Err(self.error("unhashable dict key")),
            };
            if !self.eat(':') {
                return Err(self.error("expected ':'"));
            }
            let value = self.value()?;
            map.insert(key, value);
            if !self.eat(',') {
                if self.eat('}') {
                    return Ok(Value::Object(map));
                }
                return Err(self.error("expected ',' or '}'"));
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, String> {
        debug_assert_eq!(self.peek(), Some(open));
        self.bump();
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            if !self.eat(',') {
                if self.eat(close) {
                    return Ok(Value::Array(items));
                }
                return Err(self.error(&format!("expected ',' or '{close}'")));
            }
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), String> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\\' | '\'' | '"' => c,
            // line continuation
            '\n' => return Ok(()),
            '0'..='7' => self.octal_char(c)?,
            'x' => self.hex_char(2)?,
            'u' => self.hex_char(4)?,
            'U' => self.hex_char(8)?,
            // unrecognised escapes keep their backslash
            _ => {
                out.push('\\');
                c
            }
        };
        out.push(decoded);
        Ok(())
    }

    /// Up to three octal digits, the first already consumed.
    fn octal_char(&mut self, first: char) -> Result<char, String> {
        let mut code = first.to_digit(8).unwrap_or_default();
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(d) => {
                    code = code * 8 + d;
                    self.pos += 1;
                }
                None => break,
            }
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn hex_char(&mut self, digits: usize) -> Result<char, String> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("bad hex escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("bad hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        let mut is_float = false;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if matches!(self.src[..self.pos].chars().last(), Some('e' | 'E')) => {}
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();

        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Number(i.into()));
            }
        }
        let f: f64 = text
            .parse()
            .map_err(|_| self.error(&format!("invalid number '{text}'")))?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.error("non-finite number"))
    }

    fn keyword(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        match &self.src[start..self.pos] {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            other => {
                self.pos = start;
                Err(self.error(&format!("unknown name '{other}'")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_python_dict() {
        let text = "{'total_engaged_users': 3, 'editors': [{'name': 'vscode', 'models': []}]}";
        let value = parse_literal(text).unwrap();
        assert_eq!(
            value,
            json!({"total_engaged_users": 3, "editors": [{"name": "vscode", "models": []}]})
        );
    }

    #[test]
    fn parse_keywords() {
        let value = parse_literal("{'is_custom_model': False, 'date': None, 'ok': True}").unwrap();
        assert_eq!(value, json!({"is_custom_model": false, "date": null, "ok": true}));
    }

    #[test]
    fn parse_numbers() {
        assert_eq!(parse_literal("-12").unwrap(), json!(-12));
        assert_eq!(parse_literal("3.5").unwrap(), json!(3.5));
        assert_eq!(parse_literal("1e3").unwrap(), json!(1000.0));
        assert_eq!(parse_literal("1_000").unwrap(), json!(1000));
        assert_eq!(parse_literal("2.5e-1").unwrap(), json!(0.25));
    }

    #[test]
    fn parse_tuples_and_trailing_commas() {
        assert_eq!(parse_literal("(1, 2,)").unwrap(), json!([1, 2]));
        assert_eq!(parse_literal("[1, 2, ]").unwrap(), json!([1, 2]));
        assert_eq!(parse_literal("{'a': 1,}").unwrap(), json!({"a": 1}));
        assert_eq!(parse_literal("()").unwrap(), json!([]));
    }

    #[test]
    fn parse_string_escapes() {
        assert_eq!(parse_literal(r"'it\'s'").unwrap(), json!("it's"));
        assert_eq!(parse_literal(r#""a\"b""#).unwrap(), json!("a\"b"));
        assert_eq!(parse_literal(r"'\x41é'").unwrap(), json!("Aé"));
        assert_eq!(parse_literal("'naïve'").unwrap(), json!("naïve"));
    }

    #[test]
    fn parse_errors() {
        assert!(parse_literal("").is_err());
        assert!(parse_literal("{'a': }").is_err());
        assert!(parse_literal("{'a' 1}").is_err());
        assert!(parse_literal("'unterminated").is_err());
        assert!(parse_literal("[1, 2").is_err());
        assert!(parse_literal("{'a': 1} extra").is_err());
        assert!(parse_literal("nan").is_err());
        assert!(parse_literal("__import__('os')").is_err());
    }

    #[test]
    fn octal_and_unknown_escapes() {
        assert_eq!(parse_literal(r"'\012'").unwrap(), json!("\n"));
        assert_eq!(parse_literal(r"'\0'").unwrap(), json!("\0"));
        assert_eq!(parse_literal(r"'\1019'").unwrap(), json!("A9"));
        assert_eq!(parse_literal(r"'\d+'").unwrap(), json!("\\d+"));
        assert_eq!(parse_literal("'a\\\nb'").unwrap(), json!("ab"));
    }

    #[test]
    fn hex_escape_rejects_signs() {
        assert!(parse_literal(r"'\x+1'").is_err());
        assert!(parse_literal(r"'\u-041'").is_err());
        assert!(parse_literal(r"'\x4'").is_err());
    }

    #[test]
    fn nesting_limit() {
        let nested = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&nested).is_ok());

        let too_deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(parse_literal(&too_deep).unwrap_err().contains("nesting too deep"));

        assert!(parse_literal(&"[".repeat(20_000)).is_err());
        assert!(parse_literal(&"{'a': ".repeat(20_000)).is_err());
    }
}
