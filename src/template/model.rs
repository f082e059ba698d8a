// ==========================================
// Layout Exporter - template model
// ==========================================
// Owned XML tree parsed with quick-xml. Attribute values and text are
// stored raw (still escaped) so untouched content round-trips
// byte-identically; new content is escaped at construction time.
// Comments and processing instructions are dropped at parse time; the
// writer emits the single canonical header the consumer requires.
// ==========================================

use crate::error::{ExportError, ExportResult};
use crate::template::{HEADER_ROW, TYPE_HINT_ROW};
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One node of the template tree. Text carries the raw (escaped) form.
#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element as written in the source, namespace prefix included in the
/// name. Lookups match on the local name so templates using either the
/// default namespace or an `ss:` prefix behave the same.
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    self_closing: bool,
}

fn local_name(qname: &str) -> &str {
    match qname.rsplit_once(':') {
        Some((_, local)) => local,
        None => qname,
    }
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// Unescaped value of the attribute with the given local name.
    pub fn attr(&self, local: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(k, _)| local_name(k) == local)
            .map(|(_, v)| unescape(v).map(|c| c.into_owned()).unwrap_or_else(|_| v.clone()))
    }

    /// Set an attribute, replacing an existing one with the same local
    /// name. `value` is plain text and gets escaped here.
    pub fn set_attr(&mut self, qname: &str, value: &str) {
        let escaped = escape(value).into_owned();
        let local = local_name(qname);
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| local_name(k) == local) {
            slot.1 = escaped;
        } else {
            self.attrs.push((qname.to_string(), escaped));
        }
    }

    pub fn child_elements<'a, 'b>(
        &'a self,
        local: &'b str,
    ) -> impl Iterator<Item = &'a XmlElement> + use<'a, 'b> {
        self.children.iter().filter_map(move |node| match node {
            XmlNode::Element(el) if el.local_name() == local => Some(el),
            _ => None,
        })
    }

    pub fn find_child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements(local).next()
    }

    /// Depth-first descendant search, document order.
    pub fn find_descendant(&self, local: &str) -> Option<&XmlElement> {
        for node in &self.children {
            if let XmlNode::Element(el) = node {
                if el.local_name() == local {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant(local) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn find_descendant_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        for node in &mut self.children {
            if let XmlNode::Element(el) = node {
                if el.local_name() == local {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant_mut(local) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Concatenated, unescaped text of the direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(raw) = node {
                match unescape(raw) {
                    Ok(cow) => out.push_str(&cow),
                    Err(_) => out.push_str(raw),
                }
            }
        }
        out
    }

    pub fn push_element(&mut self, element: XmlElement) -> &mut XmlElement {
        self.children.push(XmlNode::Element(element));
        match self.children.last_mut() {
            Some(XmlNode::Element(el)) => el,
            _ => unreachable!(),
        }
    }

    /// Append plain text; escaped here.
    pub fn push_text(&mut self, text: &str) {
        self.children
            .push(XmlNode::Text(partial_escape(text).into_owned()));
    }
}

/// The parsed template. One instance is owned by one export run phase;
/// the regenerator re-parses the source for every batch.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    pub root: XmlElement,
}

fn element_from_start(start: &BytesStart<'_>) -> ExportResult<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|e| ExportError::TemplateParse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

impl TemplateDocument {
    pub fn parse(source: &str) -> ExportResult<Self> {
        let mut reader = Reader::from_str(source);
        // Synthetic document node at the bottom of the stack.
        let mut stack: Vec<XmlElement> = vec![XmlElement::new("#document")];

        loop {
            match reader.read_event() {
                Err(e) => return Err(ExportError::TemplateParse(e.to_string())),
                Ok(Event::Start(start)) => {
                    stack.push(element_from_start(&start)?);
                }
                Ok(Event::Empty(start)) => {
                    let mut element = element_from_start(&start)?;
                    element.self_closing = true;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Element(element));
                    }
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ExportError::TemplateParse("unbalanced end tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => {
                            return Err(ExportError::TemplateParse("unbalanced end tag".into()))
                        }
                    }
                }
                Ok(Event::Text(text)) => {
                    let raw = String::from_utf8_lossy(&text.into_inner()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(raw));
                    }
                }
                // Entity and character references arrive as their own
                // events; stored in raw `&...;` form like any other text.
                Ok(Event::GeneralRef(gref)) => {
                    let content = String::from_utf8_lossy(&gref.into_inner()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(format!("&{};", content)));
                    }
                }
                Ok(Event::CData(cdata)) => {
                    let content = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(XmlNode::Text(partial_escape(&content).into_owned()));
                    }
                }
                Ok(Event::Eof) => break,
                // Declaration, PIs, comments, doctype: dropped; the writer
                // re-emits the single canonical header.
                Ok(_) => {}
            }
        }

        if stack.len() != 1 {
            return Err(ExportError::TemplateParse("unclosed element".into()));
        }
        let document = stack.pop().unwrap_or_else(|| XmlElement::new("#document"));
        let root = document
            .children
            .into_iter()
            .find_map(|node| match node {
                XmlNode::Element(el) => Some(el),
                XmlNode::Text(_) => None,
            })
            .ok_or_else(|| ExportError::TemplateParse("document has no root element".into()))?;

        Ok(Self { root })
    }

    /// Worksheets in document order.
    pub fn worksheets(&self) -> Vec<&XmlElement> {
        self.root.child_elements("Worksheet").collect()
    }

    pub fn worksheet_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.root.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(el)
                if el.local_name() == "Worksheet" && el.attr("Name").as_deref() == Some(name) =>
            {
                Some(el)
            }
            _ => None,
        })
    }
}

/// Name of a worksheet (`ss:Name` attribute).
pub fn sheet_name(worksheet: &XmlElement) -> Option<String> {
    worksheet.attr("Name")
}

fn sheet_rows(worksheet: &XmlElement) -> Option<Vec<&XmlElement>> {
    let table = worksheet.find_descendant("Table")?;
    Some(table.child_elements("Row").collect())
}

fn row_cell_texts(row: &XmlElement) -> Vec<String> {
    row.child_elements("Cell")
        .map(|cell| {
            cell.find_child("Data")
                .map(|data| data.text().trim().to_uppercase())
                .unwrap_or_default()
        })
        .collect()
}

/// The technical header of a sheet: the positional list of row-5 column
/// names, uppercased, blanks kept as placeholders. `None` when the sheet
/// has no table, fewer than 5 rows, or no non-blank header cell.
pub fn technical_header(worksheet: &XmlElement) -> Option<Vec<String>> {
    let rows = sheet_rows(worksheet)?;
    if rows.len() < HEADER_ROW {
        return None;
    }
    let header = row_cell_texts(rows[HEADER_ROW - 1]);
    if header.iter().all(|h| h.is_empty()) {
        return None;
    }
    Some(header)
}

/// The row-6 type-hint tokens, positional; empty when the row is absent.
pub fn type_hints(worksheet: &XmlElement) -> Vec<String> {
    match sheet_rows(worksheet) {
        Some(rows) if rows.len() >= TYPE_HINT_ROW => row_cell_texts(rows[TYPE_HINT_ROW - 1]),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        r#"<Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet" "#,
        r#"xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">"#,
        r#"<Worksheet ss:Name="Dados Gerais"><Table>"#,
        r#"<Row><Cell><Data ss:Type="String">Layout</Data></Cell></Row>"#,
        r#"<Row/><Row/><Row/>"#,
        r#"<Row><Cell><Data ss:Type="String">Material</Data></Cell>"#,
        r#"<Cell/>"#,
        r#"<Cell><Data ss:Type="String">Descri&#231;&#227;o</Data></Cell></Row>"#,
        r#"<Row><Cell><Data ss:Type="String">ENU;13;3</Data></Cell>"#,
        r#"<Cell/><Cell><Data ss:Type="String">CHAR;40</Data></Cell></Row>"#,
        r#"</Table></Worksheet>"#,
        r#"<Worksheet ss:Name="Introdução"><Table/></Worksheet>"#,
        r#"</Workbook>"#,
    );

    #[test]
    fn test_parse_finds_worksheets_in_order() {
        let doc = TemplateDocument::parse(SAMPLE).unwrap();
        let names: Vec<_> = doc
            .worksheets()
            .iter()
            .filter_map(|ws| sheet_name(ws))
            .collect();
        assert_eq!(names, vec!["Dados Gerais", "Introdução"]);
    }

    #[test]
    fn test_technical_header_keeps_blank_placeholders() {
        let doc = TemplateDocument::parse(SAMPLE).unwrap();
        let ws = doc.worksheets()[0];
        let header = technical_header(ws).unwrap();
        assert_eq!(header, vec!["MATERIAL", "", "DESCRIÇÃO"]);
    }

    #[test]
    fn test_header_absent_when_too_few_rows() {
        let doc = TemplateDocument::parse(SAMPLE).unwrap();
        let ws = doc.worksheets()[1];
        assert!(technical_header(ws).is_none());
    }

    #[test]
    fn test_type_hints_positional() {
        let doc = TemplateDocument::parse(SAMPLE).unwrap();
        let hints = type_hints(doc.worksheets()[0]);
        assert_eq!(hints, vec!["ENU;13;3", "", "CHAR;40"]);
    }

    #[test]
    fn test_worksheet_mut_by_name() {
        let mut doc = TemplateDocument::parse(SAMPLE).unwrap();
        assert!(doc.worksheet_mut("Dados Gerais").is_some());
        assert!(doc.worksheet_mut("Inexistente").is_none());
    }

    #[test]
    fn test_attr_unescapes() {
        let doc = TemplateDocument::parse(
            r#"<Workbook><Worksheet ss:Name="A &amp; B"><Table/></Worksheet></Workbook>"#,
        )
        .unwrap();
        assert_eq!(sheet_name(doc.worksheets()[0]).unwrap(), "A & B");
    }
}
