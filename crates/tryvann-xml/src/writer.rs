#![forbid(unsafe_code)]

//! A small XML writer used to build signature fragments.
//!
//! Output is compact: no indentation or whitespace is emitted between
//! elements, so the canonical form of a written fragment is predictable.

/// Builds XML text element by element.
#[derive(Debug, Default)]
pub struct XmlWriter {
    buf: String,
    open: Vec<String>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an element with the given qualified name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.write_start_tag(name, attrs);
        self.buf.push('>');
        self.open.push(name.to_owned());
        self
    }

    /// Write an element with no content as a start/end tag pair.
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.write_start_tag(name, attrs);
        self.buf.push_str("></");
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    /// Write an element containing only `text`.
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> &mut Self {
        self.start_element(name, attrs);
        self.write_text(text);
        self.end_element()
    }

    /// Close the most recently started element.
    pub fn end_element(&mut self) -> &mut Self {
        if let Some(name) = self.open.pop() {
            self.buf.push_str("</");
            self.buf.push_str(&name);
            self.buf.push('>');
        }
        self
    }

    pub fn write_text(&mut self, text: &str) -> &mut Self {
        escape_into(&mut self.buf, text, false);
        self
    }

    /// Close any open elements and return the text.
    pub fn into_string(mut self) -> String {
        while !self.open.is_empty() {
            self.end_element();
        }
        self.buf
    }

    fn write_start_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.buf.push('<');
        self.buf.push_str(name);
        for (key, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            escape_into(&mut self.buf, value, true);
            self.buf.push('"');
        }
    }
}

/// `prefix:local`, or `local` when `prefix` is empty.
pub fn qname(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_owned()
    } else {
        format!("{prefix}:{local}")
    }
}

fn escape_into(out: &mut String, s: &str, attr: bool) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            '\n' if attr => out.push_str("&#xA;"),
            '\t' if attr => out.push_str("&#x9;"),
            _ => out.push(ch),
        }
    }
}
