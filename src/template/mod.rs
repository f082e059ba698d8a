// ==========================================
// Layout Exporter - template layer
// ==========================================
// model  : parsed SpreadsheetML tree + sheet/header/type-hint access
// writer : serialization with the consumer's header conventions
// ==========================================

mod model;
mod writer;

pub use model::{
    sheet_name, technical_header, type_hints, TemplateDocument, XmlElement, XmlNode,
};
pub use writer::{serialize, DOCUMENT_HEADER};

/// 1-based row number of the technical header inside every data sheet.
pub const HEADER_ROW: usize = 5;

/// 1-based row number of the optional type-hint row.
pub const TYPE_HINT_ROW: usize = 6;

/// Rows 1..=BOILERPLATE_ROWS are template boilerplate and are never
/// rewritten; data rows start below them.
pub const BOILERPLATE_ROWS: usize = 8;
