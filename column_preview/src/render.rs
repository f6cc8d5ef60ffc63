//! Plain-text and JSON output of a preview

use crate::preview::Preview;

/// Left-aligned table with a header row and a dashed rule
pub fn table(preview: &Preview) -> String {
    let mut header = vec!["record".to_string()];
    header.extend(preview.columns.iter().map(|c| {
        if c.label.is_empty() {
            c.id.clone()
        } else {
            c.label.clone()
        }
    }));

    let body: Vec<Vec<String>> = preview
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.record.clone()];
            cells.extend(row.values.iter().cloned());
            cells
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

pub fn json(preview: &Preview) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(preview)
}
