//! Parser for the Python literals stored in the Kaggle list columns.
//!
//! Cells such as `genres`, `cast`, `crew` and `keywords` hold the `repr` of
//! a list of dicts, e.g. `[{'id': 28, 'name': 'Action'}]`. Only the literal
//! subset those columns use is accepted: lists, tuples, dicts, strings,
//! numbers, booleans and `None`.

use std::iter::Peekable;
use std::str::CharIndices;

/// A parsed Python literal
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a string key in a dict literal
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),

    #[error("trailing input at offset {0}")]
    TrailingInput(usize),

    #[error("nesting deeper than {MAX_DEPTH} at offset {0}")]
    TooDeep(usize),
}

/// Deepest list/dict nesting accepted before giving up on a cell
pub const MAX_DEPTH: usize = 64;

/// Parses a single literal; surrounding whitespace is allowed
pub fn parse_literal(input: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser {
        chars: input.char_indices().peekable(),
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    match parser.chars.next() {
        Some((offset, _)) => Err(LiteralError::TrailingInput(offset)),
        None => Ok(value),
    }
}

/// Parses a list cell, treating missing or blank cells as an empty list
pub fn parse_list_cell(cell: Option<&str>) -> Result<Vec<Literal>, LiteralError> {
    let cell = cell.map(str::trim).unwrap_or_default();
    if cell.is_empty() {
        return Ok(Vec::new());
    }
    match parse_literal(cell)? {
        Literal::List(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek(&mut self) -> Result<(usize, char), LiteralError> {
        self.skip_whitespace();
        self.chars.peek().copied().ok_or(LiteralError::UnexpectedEof)
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        let (offset, found) = self.peek()?;
        if found != expected {
            return Err(LiteralError::Unexpected { found, offset });
        }
        self.chars.next();
        Ok(())
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        let (offset, c) = self.peek()?;
        match c {
            '[' => self.nested(offset, |p| p.sequence('[', ']').map(Literal::List)),
            '(' => self.nested(offset, |p| p.sequence('(', ')').map(Literal::List)),
            '{' => self.nested(offset, Self::dict),
            '\'' | '"' => self.string().map(Literal::Str),
            '-' | '+' | '.' | '0'..='9' => self.number(),
            c if c.is_alphabetic() => self.keyword(offset),
            found => Err(LiteralError::Unexpected { found, offset }),
        }
    }

    fn nested(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<Literal, LiteralError>,
    ) -> Result<Literal, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(LiteralError::TooDeep(offset));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Vec<Literal>, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            if self.peek()?.1 == close {
                self.chars.next();
                return Ok(items);
            }
            items.push(self.value()?);
            let (offset, c) = self.peek()?;
            match c {
                ',' => {
                    self.chars.next();
                }
                c if c == close => {}
                found => return Err(LiteralError::Unexpected { found, offset }),
            }
        }
    }

    fn dict(&mut self) -> Result<Literal, LiteralError> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            if self.peek()?.1 == '}' {
                self.chars.next();
                return Ok(Literal::Dict(entries));
            }
            let key = self.value()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            let (offset, c) = self.peek()?;
            match c {
                ',' => {
                    self.chars.next();
                }
                '}' => {}
                found => return Err(LiteralError::Unexpected { found, offset }),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let (_, quote) = self.chars.next().ok_or(LiteralError::UnexpectedEof)?;
        let mut out = String::new();
        loop {
            let (offset, c) = self.chars.next().ok_or(LiteralError::UnexpectedEof)?;
            match c {
                c if c == quote => return Ok(out),
                '\\' => self.escape(offset, &mut out)?,
                c => out.push(c),
            }
        }
    }

    /// Unknown escapes are kept verbatim, backslash included
    fn escape(&mut self, offset: usize, out: &mut String) -> Result<(), LiteralError> {
        let (_, c) = self.chars.next().ok_or(LiteralError::UnexpectedEof)?;
        let escaped = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            '\n' => return Ok(()),
            '\\' | '\'' | '"' => c,
            '0'..='7' => self.octal_char(c),
            'x' => self.hex_char(2, offset)?,
            'u' => self.hex_char(4, offset)?,
            'U' => self.hex_char(8, offset)?,
            other => {
                out.push('\\');
                other
            }
        };
        out.push(escaped);
        Ok(())
    }

    /// Up to three octal digits, the first already consumed
    fn octal_char(&mut self, first: char) -> char {
        let mut code = first.to_digit(8).unwrap_or(0);
        for _ in 0..2 {
            match self.chars.peek().and_then(|&(_, c)| c.to_digit(8)) {
                Some(digit) => {
                    code = code * 8 + digit;
                    self.chars.next();
                }
                None => break,
            }
        }
        char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn hex_char(&mut self, digits: usize, offset: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let (_, c) = self.chars.next().ok_or(LiteralError::UnexpectedEof)?;
            let digit = c.to_digit(16).ok_or(LiteralError::InvalidEscape(offset))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(LiteralError::InvalidEscape(offset))
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let mut text = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_') {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let cleaned = text.replace('_', "");
        if let Ok(i) = cleaned.parse::<i64>() {
            return Ok(Literal::Int(i));
        }
        cleaned
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| LiteralError::InvalidNumber(text))
    }

    fn keyword(&mut self, offset: usize) -> Result<Literal, LiteralError> {
        let mut word = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match word.as_str() {
            "None" => Ok(Literal::None),
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "nan" => Ok(Literal::Float(f64::NAN)),
            _ => Err(LiteralError::Unexpected {
                found: word.chars().next().unwrap_or('?'),
                offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_genre_list() {
        let parsed =
            parse_literal("[{'id': 16, 'name': 'Animation'}, {'id': 35, 'name': 'Comedy'}]")
                .unwrap();
        let items = parsed.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("name").and_then(Literal::as_str), Some("Animation"));
        assert_eq!(items[1].get("id"), Some(&Literal::Int(35)));
    }

    #[test]
    fn test_double_quoted_strings_with_apostrophes() {
        let parsed = parse_literal(r#"[{'name': "Schindler's List"}]"#).unwrap();
        let items = parsed.as_list().unwrap();
        assert_eq!(
            items[0].get("name").and_then(Literal::as_str),
            Some("Schindler's List")
        );
    }

    #[test]
    fn test_escapes() {
        let parsed = parse_literal(r"'It\'s \xe9té'").unwrap();
        assert_eq!(parsed, Literal::Str("It's été".to_string()));
    }

    #[test]
    fn test_unknown_escapes_are_kept_verbatim() {
        let parsed = parse_literal(r"'C:\data\d3 \q'").unwrap();
        assert_eq!(parsed, Literal::Str(r"C:\data\d3 \q".to_string()));

        let crew = parse_list_cell(Some(r"[{'name': 'Jos\é'}]")).unwrap();
        assert_eq!(crew[0].get("name").and_then(Literal::as_str), Some(r"Jos\é"));
    }

    #[test]
    fn test_octal_and_control_escapes() {
        let parsed = parse_literal(r"'\012\101\0\a\b\f\v'").unwrap();
        assert_eq!(parsed, Literal::Str("\nA\0\x07\x08\x0c\x0b".to_string()));
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let within = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&within).is_ok());

        let deep = "[".repeat(100_000);
        assert_eq!(parse_literal(&deep), Err(LiteralError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse_literal("None").unwrap(), Literal::None);
        assert_eq!(parse_literal("True").unwrap(), Literal::Bool(true));
        assert_eq!(parse_literal("-3").unwrap(), Literal::Int(-3));
        assert_eq!(parse_literal("7.5").unwrap(), Literal::Float(7.5));
        assert_eq!(parse_literal("1e3").unwrap(), Literal::Float(1000.0));
    }

    #[test]
    fn test_crew_entry_with_null_profile() {
        let parsed = parse_literal(
            "[{'credit_id': '52fe4284c3a36847f8024f49', 'department': 'Directing', \
              'gender': 2, 'id': 7879, 'job': 'Director', 'name': 'John Lasseter', \
              'profile_path': None}]",
        )
        .unwrap();
        let crew = parsed.as_list().unwrap();
        assert_eq!(crew[0].get("job").and_then(Literal::as_str), Some("Director"));
        assert_eq!(crew[0].get("profile_path"), Some(&Literal::None));
    }

    #[test]
    fn test_tuples_and_trailing_commas() {
        let parsed = parse_literal("(1, 2,)").unwrap();
        assert_eq!(parsed, Literal::List(vec![Literal::Int(1), Literal::Int(2)]));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_literal("[1, 2"), Err(LiteralError::UnexpectedEof));
        assert!(matches!(
            parse_literal("[1] x"),
            Err(LiteralError::TrailingInput(4))
        ));
        assert!(matches!(
            parse_literal("{'a' 1}"),
            Err(LiteralError::Unexpected { found: '1', .. })
        ));
        assert!(parse_literal("'unterminated").is_err());
    }

    #[test]
    fn test_list_cell_blank_and_missing() {
        assert!(parse_list_cell(None).unwrap().is_empty());
        assert!(parse_list_cell(Some("  ")).unwrap().is_empty());
        assert!(parse_list_cell(Some("{'a': 1}")).unwrap().is_empty());
        assert_eq!(parse_list_cell(Some("[1]")).unwrap(), vec![Literal::Int(1)]);
    }
}
