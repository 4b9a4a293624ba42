use crate::model::TableBlock;

/// Renders a table node. Table contents are passed through as text; no
/// attempt is made to interpret them.
pub trait TableFormatter {
    fn format(&self, table: &TableBlock) -> String;
}

/// GFM pipe table with the first row as header.
pub struct PipeTableFormatter;

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

impl TableFormatter for PipeTableFormatter {
    fn format(&self, table: &TableBlock) -> String {
        let cols = table.column_count();
        if cols == 0 {
            return String::new();
        }
        let render_row = |row: &[String]| -> String {
            let mut line = String::from("|");
            for i in 0..cols {
                let cell = row.get(i).map(|c| escape_cell(c)).unwrap_or_default();
                if cell.is_empty() {
                    line.push_str("  |");
                } else {
                    line.push(' ');
                    line.push_str(&cell);
                    line.push_str(" |");
                }
            }
            line
        };

        let mut lines = Vec::with_capacity(table.rows.len() + 1);
        let mut rows = table.rows.iter();
        if let Some(header) = rows.next() {
            lines.push(render_row(header));
            lines.push(format!("|{}", " --- |".repeat(cols)));
        }
        lines.extend(rows.map(|r| render_row(r)));
        lines.join("\n")
    }
}

/// Marks where a table was without rendering it.
pub struct PlaceholderTableFormatter;

impl TableFormatter for PlaceholderTableFormatter {
    fn format(&self, table: &TableBlock) -> String {
        format!(
            "*[Table: {} rows x {} columns]*",
            table.rows.len(),
            table.column_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> TableBlock {
        TableBlock {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            ordinal: 0,
        }
    }

    #[test]
    fn pipe_table_pads_ragged_rows() {
        let t = table(&[&["Name", "Conductance", "Elevation"], &["Drain 1", "a|b"]]);
        assert_eq!(
            PipeTableFormatter.format(&t),
            "| Name | Conductance | Elevation |\n| --- | --- | --- |\n| Drain 1 | a\\|b |  |"
        );
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(PipeTableFormatter.format(&table(&[])), "");
    }

    #[test]
    fn placeholder_counts_cells() {
        let t = table(&[&["a", "b"], &["c", "d"], &["e", "f"]]);
        assert_eq!(PlaceholderTableFormatter.format(&t), "*[Table: 3 rows x 2 columns]*");
    }
}
