// ==========================================
// Layout Exporter - document regenerator
// ==========================================
// Clone-and-patch per batch: always a fresh parse of the source text
// (tree mutation is destructive, never restartable). Rows 1-8 of every
// sheet are retained verbatim; only data rows below them are replaced.
// Sheets absent from the execution map pass through untouched.
// ==========================================

use crate::error::ExportResult;
use crate::materializer::{CellValue, MaterializedRow};
use crate::template::{self, TemplateDocument, XmlElement, XmlNode, BOILERPLATE_ROWS};

/// The rows to inject into one mapped sheet of one batch.
#[derive(Debug)]
pub struct SheetPayload {
    pub sheet_name: String,
    pub rows: Vec<MaterializedRow>,
}

/// Protection markers removed so the regenerated document opens
/// unprotected.
const PROTECTION_TAGS: [&str; 4] = [
    "ProtectObjects",
    "ProtectScenarios",
    "Protected",
    "ProtectWindows",
];

/// Regenerate the template for one batch: parse the source fresh, patch
/// every mapped sheet, serialize with the consumer's header conventions.
pub fn regenerate(template_source: &str, payloads: &[SheetPayload]) -> ExportResult<String> {
    let mut doc = TemplateDocument::parse(template_source)?;

    for payload in payloads {
        let Some(worksheet) = doc.worksheet_mut(&payload.sheet_name) else {
            continue;
        };
        unprotect_sheet(worksheet);
        if let Some(table) = worksheet.find_descendant_mut("Table") {
            fill_table(table, &payload.rows);
        }
    }

    Ok(template::serialize(&doc))
}

/// Remove the protection markers under `x:WorksheetOptions`.
pub fn unprotect_sheet(worksheet: &mut XmlElement) {
    if let Some(options) = worksheet.find_descendant_mut("WorksheetOptions") {
        options.children.retain(|node| match node {
            XmlNode::Element(el) => !PROTECTION_TAGS.contains(&el.local_name()),
            XmlNode::Text(_) => true,
        });
    }
}

/// Strip data rows below the boilerplate, append the materialized rows,
/// refresh the row-count metadata.
fn fill_table(table: &mut XmlElement, rows: &[MaterializedRow]) {
    let prefix = element_prefix(&table.name);

    let mut seen_rows = 0usize;
    table.children.retain(|node| match node {
        XmlNode::Element(el) if el.local_name() == "Row" => {
            seen_rows += 1;
            seen_rows <= BOILERPLATE_ROWS
        }
        _ => true,
    });

    for row in rows {
        let row_node = table.push_element(XmlElement::new(format!("{}Row", prefix)));
        for (index, value) in &row.cells {
            let cell = row_node.push_element(XmlElement::new(format!("{}Cell", prefix)));
            cell.set_attr("ss:Index", &index.to_string());
            let data = cell.push_element(XmlElement::new(format!("{}Data", prefix)));
            match value {
                CellValue::Number(literal) => {
                    data.set_attr("ss:Type", "Number");
                    data.push_text(literal);
                }
                CellValue::Text(text) => {
                    data.set_attr("ss:Type", "String");
                    data.push_text(text);
                }
            }
        }
    }

    let total = table.child_elements("Row").count();
    table.set_attr("ss:ExpandedRowCount", &total.to_string());
}

/// New elements take the same namespace prefix their table uses, so a
/// template written with `ss:`-qualified elements stays consistent.
fn element_prefix(table_name: &str) -> String {
    match table_name.rsplit_once(':') {
        Some((prefix, _)) => format!("{}:", prefix),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materializer::CellValue;

    fn template_with_rows(extra_rows: usize) -> String {
        let mut rows = String::new();
        for i in 1..=(BOILERPLATE_ROWS + extra_rows) {
            rows.push_str(&format!(
                "<Row><Cell><Data ss:Type=\"String\">r{}</Data></Cell></Row>",
                i
            ));
        }
        format!(
            concat!(
                "<Workbook xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\" ",
                "xmlns:x=\"urn:schemas-microsoft-com:office:excel\">",
                "<Worksheet ss:Name=\"Dados Gerais\"><Table ss:ExpandedRowCount=\"{}\">{}</Table>",
                "<x:WorksheetOptions><x:ProtectObjects>True</x:ProtectObjects>",
                "<x:ProtectScenarios>True</x:ProtectScenarios>",
                "<x:FitToPage/></x:WorksheetOptions></Worksheet>",
                "<Worksheet ss:Name=\"Outra\"><Table>{}</Table></Worksheet>",
                "</Workbook>",
            ),
            BOILERPLATE_ROWS + extra_rows,
            rows,
            rows,
        )
    }

    fn one_row() -> MaterializedRow {
        MaterializedRow {
            cells: vec![
                (1, CellValue::Text("10001884".to_string())),
                (3, CellValue::Number("1234.5".to_string())),
            ],
        }
    }

    #[test]
    fn test_strips_old_data_rows_and_injects_typed_cells() {
        let source = template_with_rows(4);
        let out = regenerate(
            &source,
            &[SheetPayload {
                sheet_name: "Dados Gerais".to_string(),
                rows: vec![one_row()],
            }],
        )
        .unwrap();

        let mapped = out
            .split("ss:Name=\"Dados Gerais\"")
            .nth(1)
            .unwrap()
            .split("ss:Name=\"Outra\"")
            .next()
            .unwrap();
        // old data rows r9..r12 gone from the mapped sheet, boilerplate kept
        assert!(!mapped.contains(">r9<"));
        assert!(mapped.contains(">r8<"));
        assert!(mapped.contains("<Cell ss:Index=\"1\"><Data ss:Type=\"String\">10001884</Data></Cell>"));
        assert!(mapped.contains("<Cell ss:Index=\"3\"><Data ss:Type=\"Number\">1234.5</Data></Cell>"));
        assert!(mapped.contains("ss:ExpandedRowCount=\"9\""));
    }

    #[test]
    fn test_unmapped_sheet_passes_through_untouched() {
        let source = template_with_rows(2);
        let out = regenerate(
            &source,
            &[SheetPayload {
                sheet_name: "Dados Gerais".to_string(),
                rows: vec![],
            }],
        )
        .unwrap();
        // the second sheet still has its 10 original rows
        let second = out.split("ss:Name=\"Outra\"").nth(1).unwrap();
        assert_eq!(second.matches("<Row>").count(), BOILERPLATE_ROWS + 2);
        assert!(second.contains(">r10<"));
    }

    #[test]
    fn test_protection_markers_removed_others_kept() {
        let source = template_with_rows(0);
        let out = regenerate(
            &source,
            &[SheetPayload {
                sheet_name: "Dados Gerais".to_string(),
                rows: vec![],
            }],
        )
        .unwrap();
        assert!(!out.contains("ProtectObjects"));
        assert!(!out.contains("ProtectScenarios"));
        assert!(out.contains("<x:FitToPage/>"));
    }

    #[test]
    fn test_mapped_sheet_with_no_rows_keeps_only_boilerplate() {
        let source = template_with_rows(3);
        let out = regenerate(
            &source,
            &[SheetPayload {
                sheet_name: "Dados Gerais".to_string(),
                rows: vec![],
            }],
        )
        .unwrap();
        let first = out
            .split("ss:Name=\"Dados Gerais\"")
            .nth(1)
            .unwrap()
            .split("ss:Name=\"Outra\"")
            .next()
            .unwrap();
        assert_eq!(first.matches("<Row>").count(), BOILERPLATE_ROWS);
        assert!(first.contains("ss:ExpandedRowCount=\"8\""));
    }
}
