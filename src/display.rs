//! Terminal rendering of an extracted table as a GFM pipe table.

use crate::pipeline::export::Table;

/// Render `table` as Markdown. Null cells are blank; pipes are escaped.
pub fn render_markdown(table: &Table) -> String {
    if table.header.is_empty() {
        return String::from("(no rows)\n");
    }

    let mut out = String::new();
    push_line(&mut out, table.header.iter().map(String::as_str));
    out.push('|');
    for _ in &table.header {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in &table.rows {
        push_line(&mut out, row.iter().map(|c| c.as_deref().unwrap_or("")));
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&cell.replace('|', "\\|").replace('\n', " "));
        out.push_str(" |");
    }
    out.push('\n');
}
