use std::fmt::Write as _;
use std::path::Path;

use crate::error::ReportError;
use crate::pipeline::BatchOutcome;
use crate::results::{image_link, Cell, COLUMN_IMAGE};

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn image_src(image_base: &str, link: &str) -> String {
    let base = image_base.trim_end_matches('/');
    if base.is_empty() {
        link.to_string()
    } else {
        format!("{}/{}", base, link)
    }
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Bool(true) => "Yes".to_string(),
        Cell::Bool(false) => "No".to_string(),
        other => escape(&other.to_text()),
    }
}

/// Renders a standalone HTML page. Image cells link to
/// `<image_base>/<document-id>/<file>`.
pub fn render(outcome: &BatchOutcome, image_base: &str) -> String {
    let columns = outcome.results.columns();
    let rows = outcome.results.rows();
    let image_col = columns.iter().position(|c| c == COLUMN_IMAGE);

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Manuscript analysis</title>\n");
    html.push_str(
        "<style>\nbody { font-family: sans-serif; }\n\
         table { border-collapse: collapse; }\n\
         th, td { border: 1px solid #ccc; padding: 4px 8px; vertical-align: top; }\n\
         img { max-width: 240px; }\n</style>\n",
    );
    html.push_str("</head>\n<body>\n");

    let _ = writeln!(
        html,
        "<p>{} of {} images analyzed, {} skipped.</p>",
        outcome.succeeded(),
        outcome.total,
        outcome.failed()
    );

    html.push_str("<table class=\"results\">\n<thead>\n<tr>");
    for column in &columns {
        let _ = write!(html, "<th>{}</th>", escape(column));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in &rows {
        html.push_str("<tr>");
        for (col, cell) in row.iter().enumerate() {
            match (Some(col) == image_col, cell) {
                (true, Cell::Text(link)) => {
                    let src = escape(&image_src(image_base, link));
                    let _ = write!(
                        html,
                        "<td><a href=\"{src}\"><img src=\"{src}\" alt=\"{}\"></a></td>",
                        escape(link)
                    );
                }
                _ => {
                    let _ = write!(html, "<td>{}</td>", render_cell(cell));
                }
            }
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");

    if !outcome.failures.is_empty() {
        html.push_str("<h2>Skipped images</h2>\n<ul class=\"failures\">\n");
        for failure in &outcome.failures {
            let _ = writeln!(
                html,
                "<li><code>{}</code> ({}): {}</li>",
                escape(&image_link(&failure.asset)),
                failure.kind,
                escape(&failure.message)
            );
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

pub fn write_html(outcome: &BatchOutcome, image_base: &str, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, render(outcome, image_base)).map_err(|e| ReportError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}
