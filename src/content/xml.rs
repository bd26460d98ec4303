//! Minimal XML element-tree reader for companion page configuration.
//!
//! Strict and deliberately small: elements, attributes, character data,
//! comments, CDATA sections, the five predefined entities plus numeric
//! character references. No DTDs, no namespaces, no processing beyond
//! skipping the prolog. Page configuration files need nothing more, and a
//! malformed file should fail loudly rather than parse approximately.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XmlError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected `{found}` at byte {at}")]
    Unexpected { at: usize, found: char },
    #[error("mismatched closing tag: expected `</{expected}>`, found `</{found}>`")]
    MismatchedTag { expected: String, found: String },
    #[error("unknown entity `&{entity};`")]
    UnknownEntity { entity: String },
    #[error("content after the document element at byte {at}")]
    TrailingContent { at: usize },
}

/// A parsed element: name, attributes in document order, child elements, and
/// accumulated character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    text: String,
}

impl Element {
    /// First attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Character data with surrounding whitespace trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Child elements with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Parse a complete document and return its root element.
pub fn parse(input: &str) -> Result<Element, XmlError> {
    let mut parser = Parser { input, pos: 0 };
    parser.skip_misc();
    let root = parser.parse_element()?;
    parser.skip_misc();
    if parser.pos < parser.input.len() {
        return Err(XmlError::TrailingContent { at: parser.pos });
    }
    Ok(root)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Result<char, XmlError> {
        let ch = self.peek().ok_or(XmlError::UnexpectedEof)?;
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    fn expect(&mut self, expected: char) -> Result<(), XmlError> {
        let at = self.pos;
        let found = self.bump()?;
        if found == expected {
            Ok(())
        } else {
            Err(XmlError::Unexpected { at, found })
        }
    }

    fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Skip whitespace, comments, and prolog constructs between elements.
    fn skip_misc(&mut self) {
        loop {
            self.skip_whitespace();
            if self.eat("<?") {
                self.skip_until("?>");
            } else if self.rest().starts_with("<!--") {
                self.skip_comment();
            } else if self.eat("<!DOCTYPE") {
                self.skip_until(">");
            } else {
                return;
            }
        }
    }

    fn skip_comment(&mut self) {
        self.pos += "<!--".len();
        self.skip_until("-->");
    }

    fn skip_until(&mut self, terminator: &str) {
        match self.rest().find(terminator) {
            Some(offset) => self.pos += offset + terminator.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn read_name(&mut self) -> Result<String, XmlError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(ch) if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')
        ) {
            self.pos += self.peek().map_or(0, char::len_utf8);
        }
        if self.pos == start {
            return match self.peek() {
                Some(found) => Err(XmlError::Unexpected { at: start, found }),
                None => Err(XmlError::UnexpectedEof),
            };
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_element(&mut self) -> Result<Element, XmlError> {
        self.expect('<')?;
        let name = self.read_name()?;
        let mut element = Element {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        };

        loop {
            self.skip_whitespace();
            if self.eat("/>") {
                return Ok(element);
            }
            if self.eat(">") {
                self.parse_content(&mut element)?;
                return Ok(element);
            }
            let key = self.read_name()?;
            self.skip_whitespace();
            self.expect('=')?;
            self.skip_whitespace();
            let at = self.pos;
            let quote = self.bump()?;
            if quote != '"' && quote != '\'' {
                return Err(XmlError::Unexpected { at, found: quote });
            }
            let value = self.read_until_char(quote)?;
            element.attributes.push((key, decode_entities(&value)?));
        }
    }

    fn parse_content(&mut self, element: &mut Element) -> Result<(), XmlError> {
        loop {
            if self.rest().is_empty() {
                return Err(XmlError::UnexpectedEof);
            }
            if self.eat("</") {
                let found = self.read_name()?;
                self.skip_whitespace();
                self.expect('>')?;
                if found != element.name {
                    return Err(XmlError::MismatchedTag {
                        expected: element.name.clone(),
                        found,
                    });
                }
                return Ok(());
            }
            if self.rest().starts_with("<!--") {
                self.skip_comment();
                continue;
            }
            if self.eat("<![CDATA[") {
                let start = self.pos;
                match self.rest().find("]]>") {
                    Some(offset) => {
                        element.text.push_str(&self.input[start..start + offset]);
                        self.pos += offset + "]]>".len();
                    }
                    None => return Err(XmlError::UnexpectedEof),
                }
                continue;
            }
            if self.rest().starts_with('<') {
                let child = self.parse_element()?;
                element.children.push(child);
                continue;
            }
            let start = self.pos;
            let offset = self.rest().find('<').unwrap_or(self.rest().len());
            self.pos += offset;
            element
                .text
                .push_str(&decode_entities(&self.input[start..self.pos])?);
        }
    }

    fn read_until_char(&mut self, terminator: char) -> Result<String, XmlError> {
        let start = self.pos;
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len_utf8();
                Ok(self.input[start..start + offset].to_string())
            }
            None => Err(XmlError::UnexpectedEof),
        }
    }
}

fn decode_entities(raw: &str) -> Result<String, XmlError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp + 1..];
        let end = rest.find(';').ok_or(XmlError::UnexpectedEof)?;
        let entity = &rest[..end];
        match entity {
            "lt" => decoded.push('<'),
            "gt" => decoded.push('>'),
            "amp" => decoded.push('&'),
            "quot" => decoded.push('"'),
            "apos" => decoded.push('\''),
            _ => {
                let code = entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32);
                match code {
                    Some(ch) => decoded.push(ch),
                    None => {
                        return Err(XmlError::UnknownEntity {
                            entity: entity.to_string(),
                        });
                    }
                }
            }
        }
        rest = &rest[end + 1..];
    }
    decoded.push_str(rest);
    Ok(decoded)
}
