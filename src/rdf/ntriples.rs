//! N-Triples parser

use super::skolem;
use crate::error::LoadError;
use crate::graph::{Assertion, Term};
use std::iter::Peekable;
use std::str::Chars;

/// Parse an N-Triples document
///
/// Language tags and datatypes are accepted but only the lexical value of a
/// literal is kept.
pub fn parse_ntriples(base: &str, content: &str) -> Result<Vec<Assertion>, LoadError> {
    let mut assertions = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let mut cursor = Cursor {
            chars: line.chars().peekable(),
            base,
        };
        cursor.skip_ws();
        if matches!(cursor.chars.peek(), None | Some('#')) {
            continue;
        }

        let assertion = cursor
            .statement()
            .map_err(|msg| LoadError::Malformed(format!("line {}: {}", index + 1, msg)))?;
        assertions.push(assertion);
    }

    Ok(assertions)
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    base: &'a str,
}

impl Cursor<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(format!("expected '{}', found '{}'", expected, c)),
            None => Err(format!("expected '{}', found end of line", expected)),
        }
    }

    fn statement(&mut self) -> Result<Assertion, String> {
        let subject = self.node()?;
        self.skip_ws();
        let predicate = self.iri()?;
        self.skip_ws();
        let object = match self.chars.peek() {
            Some('"') => Term::Literal(self.literal()?),
            _ => Term::Resource(self.node()?),
        };
        self.skip_ws();
        self.expect('.')?;
        self.skip_ws();
        match self.chars.next() {
            None | Some('#') => Ok(Assertion::new(subject, predicate, object)),
            Some(c) => Err(format!("unexpected '{}' after statement", c)),
        }
    }

    /// An IRI or a blank node label
    fn node(&mut self) -> Result<String, String> {
        match self.chars.peek() {
            Some('_') => {
                self.chars.next();
                self.expect(':')?;
                let mut label = String::new();
                while let Some(c) = self
                    .chars
                    .next_if(|c| c.is_alphanumeric() || matches!(*c, '_' | '-' | '.'))
                {
                    label.push(c);
                }
                // A trailing '.' terminates the statement, not the label
                if label.ends_with('.') {
                    return Err("blank node label must be followed by whitespace".to_string());
                }
                if label.is_empty() {
                    return Err("empty blank node label".to_string());
                }
                Ok(skolem(self.base, &label))
            }
            _ => self.iri(),
        }
    }

    fn iri(&mut self) -> Result<String, String> {
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.chars.next() {
                Some('>') => return Ok(iri),
                Some('\\') => iri.push(self.escape()?),
                Some(c) if c.is_whitespace() => return Err("whitespace in IRI".to_string()),
                Some(c) => iri.push(c),
                None => return Err("unterminated IRI".to_string()),
            }
        }
    }

    fn literal(&mut self) -> Result<String, String> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('"') => break,
                Some('\\') => value.push(self.escape()?),
                Some(c) => value.push(c),
                None => return Err("unterminated literal".to_string()),
            }
        }

        match self.chars.peek() {
            Some('@') => {
                self.chars.next();
                while self
                    .chars
                    .next_if(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .is_some()
                {}
            }
            Some('^') => {
                self.chars.next();
                self.expect('^')?;
                self.iri()?;
            }
            _ => {}
        }
        Ok(value)
    }

    fn escape(&mut self) -> Result<char, String> {
        let c = match self.chars.next() {
            Some('t') => '\t',
            Some('b') => '\u{8}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('f') => '\u{c}',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some('u') => self.unicode(4)?,
            Some('U') => self.unicode(8)?,
            Some(c) => return Err(format!("unknown escape '\\{}'", c)),
            None => return Err("dangling escape".to_string()),
        };
        Ok(c)
    }

    fn unicode(&mut self, digits: usize) -> Result<char, String> {
        let hex: String = (0..digits).filter_map(|_| self.chars.next()).collect();
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|_| hex.len() == digits)
            .and_then(char::from_u32)
            .ok_or_else(|| format!("invalid unicode escape '{}'", hex))
    }
}
