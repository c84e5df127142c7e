//! Plain-text rendering of records for the console.

use serde_json::Value;

use crate::api::Record;

/// Widest a column may get before values are truncated.
const MAX_COLUMN_WIDTH: usize = 40;
/// Columns shown besides the id.
const MAX_EXTRA_COLUMNS: usize = 4;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Scalar cell text; nested values are summarized.
fn cell(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(Value::Array(items)) => format!("[{}]", items.len()),
    Some(Value::Object(_)) => "{..}".to_string(),
    Some(other) => other.to_string(),
  }
}

/// Columns to show: `id` first, then scalar fields in order of first
/// appearance.
fn columns(rows: &[Record]) -> Vec<String> {
  let mut columns = vec!["id".to_string()];
  for row in rows {
    for (field, value) in &row.0 {
      if columns.len() > MAX_EXTRA_COLUMNS {
        return columns;
      }
      let scalar = !matches!(value, Value::Array(_) | Value::Object(_));
      if scalar && !columns.contains(field) {
        columns.push(field.clone());
      }
    }
  }
  columns
}

/// Render rows as an aligned table with a header line.
pub fn render(rows: &[Record]) -> String {
  if rows.is_empty() {
    return "(no rows)\n".to_string();
  }

  let columns = columns(rows);
  let cells: Vec<Vec<String>> = rows
    .iter()
    .map(|row| {
      columns
        .iter()
        .map(|c| truncate(&cell(row.get(c)), MAX_COLUMN_WIDTH))
        .collect()
    })
    .collect();

  let widths: Vec<usize> = columns
    .iter()
    .enumerate()
    .map(|(i, header)| {
      cells
        .iter()
        .map(|r| r[i].chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0)
    })
    .collect();

  let line = |values: &[String]| {
    let padded: Vec<String> = values
      .iter()
      .zip(&widths)
      .map(|(v, w)| format!("{:<width$}", v, width = *w))
      .collect();
    format!("{}\n", padded.join("  ").trim_end())
  };

  let header: Vec<String> = columns.iter().map(|c| c.to_uppercase()).collect();
  let mut out = line(&header);
  for row in &cells {
    out.push_str(&line(row));
  }
  out
}
