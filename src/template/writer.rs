// ==========================================
// Layout Exporter - template serialization
// ==========================================
// The consumer requires exactly this header: XML declaration, then the
// mso-application processing instruction, CRLF after each, UTF-8 body.
// Parsing drops every PI, so exactly one survives serialization.
// ==========================================

use crate::template::{TemplateDocument, XmlElement, XmlNode};
use std::fmt::Write as _;

/// Declaration + producing-application PI, CRLF line endings.
pub const DOCUMENT_HEADER: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n<?mso-application progid=\"Excel.Sheet\"?>\r\n";

/// Serialize the document back to markup. Untouched content is written
/// from its raw stored form, byte for byte.
pub fn serialize(doc: &TemplateDocument) -> String {
    let mut out = String::with_capacity(4 * 1024);
    out.push_str(DOCUMENT_HEADER);
    write_element(&mut out, &doc.root);
    out
}

fn write_element(out: &mut String, element: &XmlElement) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        let _ = write!(out, " {}=\"{}\"", key, value);
    }

    if element.children.is_empty() && element.is_self_closing() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(el) => write_element(out, el),
            XmlNode::Text(raw) => out.push_str(raw),
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}
