// ==========================================
// Layout Exporter - row materializer
// ==========================================
// Per batch and mapped sheet: fetch (keyed, with one full-table
// fallback), align to the template header, coerce values to the cell
// type the row-6 hint declares. The template's column arity is
// authoritative; a missing database column yields an empty value.
// ==========================================

use crate::catalog::{RowSet, SchemaCatalog};
use crate::planner::sort_keys;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Tagged fetch result. `Degraded` keeps today's user-visible behavior
/// (full-table fallback) while making the failure path inspectable;
/// `Failed` means the sheet contributes no rows for the batch.
#[derive(Debug)]
pub enum FetchOutcome {
    Full(RowSet),
    Degraded { rows: RowSet, reason: String },
    Failed(String),
}

/// A value ready for injection, type decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Number(String),
    Text(String),
}

/// One record aligned to the sheet header: `(1-based column index, value)`
/// pairs; blank header placeholders carry no cell.
#[derive(Debug, Clone)]
pub struct MaterializedRow {
    pub cells: Vec<(usize, CellValue)>,
}

/// Fetch the rows of `table` for one batch. On any keyed-query failure,
/// retry once without the key restriction; tables lacking the key column
/// degrade instead of failing. Column names are uppercased and rows are
/// ordered by the key column when it is present.
pub fn fetch_sheet_rows(
    catalog: &dyn SchemaCatalog,
    table: &str,
    key_column: &str,
    batch_keys: &[String],
) -> FetchOutcome {
    match catalog.select_rows(table, Some((key_column, batch_keys))) {
        Ok(rows) => FetchOutcome::Full(finalize(rows, key_column)),
        Err(keyed_err) => match catalog.select_rows(table, None) {
            Ok(rows) => FetchOutcome::Degraded {
                rows: finalize(rows, key_column),
                reason: keyed_err.to_string(),
            },
            Err(fallback_err) => FetchOutcome::Failed(format!(
                "keyed query failed ({}); full-table fallback failed ({})",
                keyed_err, fallback_err
            )),
        },
    }
}

fn finalize(mut rows: RowSet, key_column: &str) -> RowSet {
    for column in &mut rows.columns {
        *column = column.to_uppercase();
    }
    if let Some(key_pos) = rows.columns.iter().position(|c| c == key_column) {
        sort_rows_by_column(&mut rows, key_pos);
    }
    rows
}

fn sort_rows_by_column(rows: &mut RowSet, pos: usize) {
    let mut order: Vec<String> = rows
        .rows
        .iter()
        .map(|r| r[pos].clone().unwrap_or_default())
        .collect();
    sort_keys(&mut order);
    order.dedup();
    let rank: HashMap<String, usize> = order
        .into_iter()
        .enumerate()
        .map(|(i, k)| (k, i))
        .collect();
    // Stable sort by rank of the key value keeps deterministic output.
    rows.rows.sort_by_key(|r| {
        let key = r[pos].clone().unwrap_or_default();
        rank.get(&key).copied().unwrap_or(usize::MAX)
    });
}

/// True when the row-6 hint token declares a numeric cell. The vocabulary
/// is only partially known; any other token renders as String.
pub fn is_numeric_hint(token: &str) -> bool {
    token.contains("NUMERO") || token.starts_with("ENU;")
}

/// Render a locale-formatted number as a markup literal: thousand `.`
/// stripped, decimal `,` to `.`, integral values without a fractional
/// part, otherwise trimmed fixed-point. `None` when the value does not
/// parse; the cell then falls back to an empty String.
pub fn to_number_literal(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }

    let plain = trimmed.replace('.', "").replace(',', ".");
    let n: f64 = plain.parse().ok()?;
    if !n.is_finite() {
        return None;
    }

    if n.fract() == 0.0 {
        Some(format!("{:.0}", n))
    } else {
        Some(
            format!("{:.10}", n)
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string(),
        )
    }
}

/// Make a value safe as markup text content: control characters outside
/// printable ASCII except tab/newline/carriage-return are stripped and the
/// result is normalized to composed form (NFC).
pub fn xml_safe_text(value: &str) -> String {
    value
        .chars()
        .filter(|&c| {
            !matches!(c,
                '\u{00}'..='\u{08}'
                | '\u{0B}'
                | '\u{0C}'
                | '\u{0E}'..='\u{1F}'
                | '\u{7F}'..='\u{84}'
                | '\u{86}'..='\u{9F}'
            )
        })
        .nfc()
        .collect()
}

/// Align fetched rows to the sheet header and coerce every cell.
///
/// `header` and `type_hints` are the positional row-5/row-6 lists; blank
/// header entries are placeholders and produce no cell, but their position
/// still counts for the 1-based cell index.
pub fn materialize_rows(
    rows: &RowSet,
    header: &[String],
    type_hints: &[String],
) -> Vec<MaterializedRow> {
    // Header names are uppercased at extraction; fetched columns are
    // uppercased in finalize. Case-insensitive match is direct equality.
    let positions: Vec<Option<usize>> = header
        .iter()
        .map(|name| {
            if name.is_empty() {
                None
            } else {
                rows.columns.iter().position(|c| c == name)
            }
        })
        .collect();

    rows.rows
        .iter()
        .map(|record| {
            let mut cells = Vec::with_capacity(header.len());
            for (idx, name) in header.iter().enumerate() {
                if name.is_empty() {
                    continue;
                }
                let raw = positions[idx]
                    .and_then(|pos| record[pos].as_deref())
                    .unwrap_or("");
                let hint = type_hints.get(idx).map(String::as_str).unwrap_or("");

                let value = if is_numeric_hint(hint) {
                    match to_number_literal(raw) {
                        Some(literal) => CellValue::Number(literal),
                        None => CellValue::Text(String::new()),
                    }
                } else {
                    CellValue::Text(xml_safe_text(raw))
                };
                cells.push((idx + 1, value));
            }
            MaterializedRow { cells }
        })
        .collect()
}

/// Non-empty hint tokens that are not recognized as numeric, one entry per
/// header column, for audit review.
pub fn unknown_hint_tokens(header: &[String], type_hints: &[String]) -> Vec<(String, String)> {
    header
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .filter_map(|(idx, name)| {
            let hint = type_hints.get(idx).map(String::as_str).unwrap_or("");
            if hint.is_empty() || is_numeric_hint(hint) {
                None
            } else {
                Some((name.clone(), hint.to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion_locale_formats() {
        assert_eq!(to_number_literal("1.234,50").as_deref(), Some("1234.5"));
        assert_eq!(to_number_literal("10,00").as_deref(), Some("10"));
        assert_eq!(to_number_literal("0,125").as_deref(), Some("0.125"));
        assert_eq!(to_number_literal("abc"), None);
        assert_eq!(to_number_literal(""), None);
        assert_eq!(to_number_literal("nan"), None);
    }

    #[test]
    fn test_numeric_hint_vocabulary() {
        assert!(is_numeric_hint("ENU;13;3"));
        assert!(is_numeric_hint("NUMERO"));
        assert!(!is_numeric_hint("CHAR;40"));
        assert!(!is_numeric_hint(""));
    }

    #[test]
    fn test_xml_safe_strips_control_chars_and_composes() {
        assert_eq!(xml_safe_text("a\u{01}b\u{9F}c"), "abc");
        assert_eq!(xml_safe_text("a\tb\nc\r"), "a\tb\nc\r");
        // decomposed e + combining acute -> composed é
        assert_eq!(xml_safe_text("cafe\u{301}"), "café");
    }

    fn rowset() -> RowSet {
        RowSet {
            columns: vec!["MATERIAL".into(), "PESO".into()],
            rows: vec![
                vec![Some("10".into()), Some("1.234,50".into())],
                vec![Some("11".into()), Some("abc".into())],
            ],
        }
    }

    #[test]
    fn test_materialize_aligns_and_types_cells() {
        let header = vec!["MATERIAL".to_string(), "".to_string(), "PESO".to_string()];
        let hints = vec!["CHAR;18".to_string(), "".to_string(), "ENU;13;3".to_string()];
        let rows = materialize_rows(&rowset(), &header, &hints);

        assert_eq!(rows.len(), 2);
        // blank placeholder produced no cell, index 3 kept for PESO
        assert_eq!(rows[0].cells.len(), 2);
        assert_eq!(rows[0].cells[0], (1, CellValue::Text("10".into())));
        assert_eq!(rows[0].cells[1], (3, CellValue::Number("1234.5".into())));
        // failed numeric parse renders as empty String cell
        assert_eq!(rows[1].cells[1], (3, CellValue::Text(String::new())));
    }

    #[test]
    fn test_missing_database_column_yields_empty_value() {
        let header = vec!["MATERIAL".to_string(), "INEXISTENTE".to_string()];
        let rows = materialize_rows(&rowset(), &header, &[]);
        assert_eq!(rows[0].cells[1], (2, CellValue::Text(String::new())));
    }

    #[test]
    fn test_unknown_hint_tokens_flagged() {
        let header = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let hints = vec!["ENU;1".to_string(), "DATS;8".to_string(), "".to_string()];
        let flagged = unknown_hint_tokens(&header, &hints);
        assert_eq!(flagged, vec![("B".to_string(), "DATS;8".to_string())]);
    }
}
