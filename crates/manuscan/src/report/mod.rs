//! Spreadsheet and HTML renderings of a finished batch.

pub mod html;
pub mod xlsx;

pub use html::{render as render_html, write_html};
pub use xlsx::{workbook_bytes, write_workbook};
