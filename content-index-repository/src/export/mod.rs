//! Legacy XML export: parsing and a content source over the parsed tree.

mod parser;
mod source;

pub use parser::{parse_export, ExportDocument};
pub use source::XmlExportSource;
