use serde::{Deserialize, Serialize};

use crate::core::{Column, GrantError, Result, Row};

/// Raw result of a single query: column descriptors in the order the node
/// returned them, and rows aligned positionally with those descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Checks that every row is as wide as the column list and that every
    /// value fits its column's declared type.
    pub fn validate(&self) -> Result<()> {
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(GrantError::InputError(format!(
                    "row {} has {} values for {} columns",
                    index,
                    row.len(),
                    self.columns.len()
                )));
            }
            for (column, value) in self.columns.iter().zip(row) {
                column.validate(value)?;
            }
        }
        Ok(())
    }

    /// Renders the result as an aligned text table.
    pub fn render(&self) -> String {
        if self.columns.is_empty() {
            return "Empty result set\n".to_string();
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.len()).collect();
        for row in &self.rows {
            for (i, value) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }

        let mut out = String::new();
        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", col.name, width = widths[i]))
            .collect();
        out.push_str(header.join(" | ").trim_end());
        out.push('\n');

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        out.push_str(&separator);
        out.push('\n');

        for row in &self.rows {
            let row_str: Vec<String> = row
                .iter()
                .enumerate()
                .take(widths.len())
                .map(|(i, val)| format!("{:width$}", val.to_string(), width = widths[i]))
                .collect();
            out.push_str(row_str.join(" | ").trim_end());
            out.push('\n');
        }

        out.push_str(&format!("({} row(s))\n", self.rows.len()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnType, Value};

    fn sample() -> QueryResult {
        QueryResult::new(
            vec![
                Column::new("Host", ColumnType::Char),
                Column::new("max_questions", ColumnType::Int32),
            ],
            vec![vec![Value::from("localhost"), Value::Integer(0)]],
        )
    }

    #[test]
    fn test_validate_accepts_well_formed_rows() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_rows() {
        let mut result = sample();
        result.rows.push(vec![Value::from("%")]);
        let err = result.validate().unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 values for 2 columns"));
    }

    #[test]
    fn test_render_aligns_columns() {
        let rendered = sample().render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Host      | max_questions");
        assert_eq!(lines[2], "localhost | 0");
        assert_eq!(lines[3], "(1 row(s))");
    }
}
