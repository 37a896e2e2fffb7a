#![forbid(unsafe_code)]

//! Escaping and the sortable namespace/attribute records used when writing
//! canonical output.
//!
//! Text nodes escape `&`, `<`, `>` and `\r`. Attribute values escape `&`,
//! `<`, `"`, `\t`, `\n` and `\r`. PI data escapes `\r` only.

use std::cmp::Ordering;

pub fn escape_text(out: &mut Vec<u8>, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '\r' => out.extend_from_slice(b"&#xD;"),
            _ => push_char(out, ch),
        }
    }
}

pub fn escape_attr(out: &mut Vec<u8>, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '"' => out.extend_from_slice(b"&quot;"),
            '\t' => out.extend_from_slice(b"&#x9;"),
            '\n' => out.extend_from_slice(b"&#xA;"),
            '\r' => out.extend_from_slice(b"&#xD;"),
            _ => push_char(out, ch),
        }
    }
}

pub fn escape_pi(out: &mut Vec<u8>, s: &str) {
    for ch in s.chars() {
        match ch {
            '\r' => out.extend_from_slice(b"&#xD;"),
            _ => push_char(out, ch),
        }
    }
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// "" for the default namespace.
    pub prefix: String,
    pub uri: String,
}

impl NsDecl {
    pub fn write(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        escape_attr(out, &self.uri);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    // Default namespace first, then by prefix.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// "" for no namespace.
    pub ns_uri: String,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        escape_attr(out, &self.value);
        out.push(b'"');
    }
}

impl Ord for Attr {
    // Unqualified attributes first, then by (namespace URI, local name).
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(f: fn(&mut Vec<u8>, &str), s: &str) -> String {
        let mut out = Vec::new();
        f(&mut out, s);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_escaping() {
        assert_eq!(text(escape_text, "USA & <Canada>\r"), "USA &amp; &lt;Canada&gt;&#xD;");
        assert_eq!(text(escape_attr, "a\"b>\t\n"), "a&quot;b>&#x9;&#xA;");
        assert_eq!(text(escape_pi, "x\ry"), "x&#xD;y");
        assert_eq!(text(escape_text, "blåbær"), "blåbær");
    }

    #[test]
    fn test_attr_order() {
        let attr = |ns: &str, local: &str| Attr {
            ns_uri: ns.into(),
            local_name: local.into(),
            qualified_name: local.into(),
            value: String::new(),
        };
        let mut attrs = vec![attr("urn:b", "a"), attr("", "model"), attr("urn:a", "z"), attr("", "brand")];
        attrs.sort();
        let order: Vec<_> = attrs.iter().map(|a| a.local_name.as_str()).collect();
        assert_eq!(order, ["brand", "model", "z", "a"]);
    }

    #[test]
    fn test_ns_order() {
        let decl = |p: &str| NsDecl { prefix: p.into(), uri: "urn:x".into() };
        let mut decls = vec![decl("ds"), decl(""), decl("a")];
        decls.sort();
        let order: Vec<_> = decls.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(order, ["", "a", "ds"]);
    }
}
