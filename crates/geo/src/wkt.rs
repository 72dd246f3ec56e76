//! # WKT Reader
//!
//! Minimal reader for the OGC/ESRI well-known-text CRS definitions found in
//! `.prj` sidecar files. Produces a generic node tree; interpretation of the
//! tree (projection method, parameters, units) happens in `coords`.

use crate::error::{GeoError, Result};

/// A keyword node such as `PROJCS["name", GEOGCS[...], ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub args: Vec<WktValue>,
}

/// One argument of a WKT node
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    /// Unquoted enumeration value (e.g. `EAST` in `AXIS["X",EAST]`)
    Ident(String),
    Node(WktNode),
}

impl WktNode {
    /// Parse a complete WKT string
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser { src: input.as_bytes(), pos: 0 };
        parser.skip_ws();
        let node = parser.node()?;
        parser.skip_ws();
        if parser.pos != parser.src.len() {
            return Err(GeoError::InvalidCrs(format!(
                "trailing characters at offset {}",
                parser.pos
            )));
        }
        Ok(node)
    }

    /// Whether the keyword matches (case-insensitive)
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    /// First string argument, conventionally the node name
    pub fn name(&self) -> Option<&str> {
        self.args.iter().find_map(|a| match a {
            WktValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Numeric arguments in order
    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.args.iter().filter_map(|a| match a {
            WktValue::Number(n) => Some(*n),
            _ => None,
        })
    }

    /// Direct child nodes
    pub fn children(&self) -> impl Iterator<Item = &WktNode> {
        self.args.iter().filter_map(|a| match a {
            WktValue::Node(n) => Some(n),
            _ => None,
        })
    }

    /// First direct child with the given keyword
    pub fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.children().find(|c| c.is(keyword))
    }

    /// Depth-first search for the first descendant with the given keyword
    pub fn find(&self, keyword: &str) -> Option<&WktNode> {
        for child in self.children() {
            if child.is(keyword) {
                return Some(child);
            }
            if let Some(found) = child.find(keyword) {
                return Some(found);
            }
        }
        None
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, what: &str) -> GeoError {
        GeoError::InvalidCrs(format!("{} at offset {}", what, self.pos))
    }

    fn ident(&mut self) -> Result<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected keyword"));
        }
        Ok(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn node(&mut self) -> Result<WktNode> {
        let keyword = self.ident()?;
        self.skip_ws();
        let close = match self.peek() {
            Some(b'[') => b']',
            Some(b'(') => b')',
            _ => return Err(self.error("expected '[' or '('")),
        };
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            args.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or closing bracket")),
            }
        }

        Ok(WktNode { keyword, args })
    }

    fn value(&mut self) -> Result<WktValue> {
        match self.peek() {
            Some(b'"') => self.text().map(WktValue::Text),
            Some(b) if b == b'-' || b == b'+' || b == b'.' || b.is_ascii_digit() => {
                self.number().map(WktValue::Number)
            }
            Some(b) if b.is_ascii_alphabetic() => {
                let save = self.pos;
                let ident = self.ident()?;
                self.skip_ws();
                if matches!(self.peek(), Some(b'[') | Some(b'(')) {
                    self.pos = save;
                    self.node().map(WktValue::Node)
                } else {
                    Ok(WktValue::Ident(ident))
                }
            }
            _ => Err(self.error("unexpected character")),
        }
    }

    fn text(&mut self) -> Result<String> {
        // opening quote
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(b'"') => {
                    self.pos += 1;
                    // "" is an escaped quote
                    if self.peek() == Some(b'"') {
                        out.push(b'"');
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b) if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E')
        ) {
            self.pos += 1;
        }
        let raw = std::str::from_utf8(&self.src[start..self.pos])
            .map_err(|_| self.error("invalid number"))?;
        raw.parse::<f64>()
            .map_err(|_| GeoError::InvalidCrs(format!("invalid number '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_geographic_definition() {
        let wkt = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        let node = WktNode::parse(wkt).unwrap();

        assert!(node.is("geogcs"));
        assert_eq!(node.name(), Some("GCS_WGS_1984"));
        let spheroid = node.find("SPHEROID").unwrap();
        let numbers: Vec<f64> = spheroid.numbers().collect();
        assert_eq!(numbers, vec![6378137.0, 298.257223563]);
        assert!(node.child("UNIT").is_some());
    }

    #[test]
    fn accepts_identifiers_and_escaped_quotes() {
        let node = WktNode::parse(r#"AXIS["say ""x""",EAST]"#).unwrap();
        assert_eq!(node.name(), Some("say \"x\""));
        assert_eq!(node.args[1], WktValue::Ident("EAST".to_string()));
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(WktNode::parse(r#"GEOGCS["x""#).is_err());
        assert!(WktNode::parse("GEOGCS[\"x\"] extra").is_err());
    }
}
