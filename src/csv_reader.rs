use crate::engine::point::Point;
use crate::error::{KlustError, Result};
use csv::ReaderBuilder;
use std::path::Path;

/// Represents a parsed CSV/TSV file with headers and rows
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvData {
    /// Parse a CSV or TSV file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path, is_tsv: bool) -> Result<Self> {
        let delimiter = if is_tsv { b'\t' } else { b',' };

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(ToString::to_string).collect();
            rows.push(row);
        }

        Ok(CsvData { headers, rows })
    }

    /// Get number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    /// Get column index by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get a column as a vector of strings
    #[must_use]
    pub fn column(&self, index: usize) -> Option<Vec<&str>> {
        if index >= self.headers.len() {
            return None;
        }
        Some(
            self.rows
                .iter()
                .filter_map(|row| row.get(index).map(String::as_str))
                .collect(),
        )
    }

    /// Find columns that contain numeric data
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn numeric_column_indices(&self) -> Vec<usize> {
        (0..self.col_count())
            .filter(|&i| {
                self.column(i).is_some_and(|col| {
                    // Consider numeric if at least 50% of non-empty values parse as numbers
                    let non_empty: Vec<_> = col.iter().filter(|s| !s.is_empty()).collect();
                    if non_empty.is_empty() {
                        return false;
                    }
                    let numeric_count = non_empty
                        .iter()
                        .filter(|s| s.parse::<f64>().is_ok())
                        .count();
                    numeric_count as f64 / non_empty.len() as f64 >= 0.5
                })
            })
            .collect()
    }
}

/// Points extracted from tabular data, keeping the dimension names and the
/// original row index of every point for later reporting
#[derive(Debug, Clone)]
pub struct PointSet {
    pub names: Vec<String>,
    pub points: Vec<Point>,
    pub row_indices: Vec<usize>,
}

impl PointSet {
    /// Build uniform-dimension points from the numeric columns of `csv`.
    ///
    /// If `weight_column` names a numeric column, its values become the
    /// per-point weights and the column is left out of the coordinates.
    /// Rows with missing or non-numeric entries in any used column are
    /// skipped.
    ///
    /// # Errors
    /// Returns error if no numeric feature column exists, the weight
    /// column is unknown or non-numeric, or no complete row remains.
    pub fn from_csv(csv: &CsvData, weight_column: Option<&str>) -> Result<Self> {
        let numeric_cols = csv.numeric_column_indices();

        let weight_col = match weight_column {
            Some(name) => {
                let idx = csv.column_index(name).ok_or_else(|| {
                    KlustError::Config(format!("weight column '{name}' not found"))
                })?;
                if !numeric_cols.contains(&idx) {
                    return Err(KlustError::Config(format!(
                        "weight column '{name}' is not numeric"
                    )));
                }
                Some(idx)
            }
            None => None,
        };

        let feature_cols: Vec<usize> = numeric_cols
            .into_iter()
            .filter(|&i| Some(i) != weight_col)
            .collect();
        if feature_cols.is_empty() {
            return Err(KlustError::Config("no numeric feature columns found".into()));
        }

        let names: Vec<String> = feature_cols
            .iter()
            .filter_map(|&i| csv.headers.get(i).cloned())
            .collect();

        let mut points = Vec::new();
        let mut row_indices = Vec::new();

        for (row_idx, row) in csv.rows.iter().enumerate() {
            let Some(values) = parse_row(row, &feature_cols) else {
                continue;
            };
            let point = match weight_col {
                Some(wi) => {
                    let Some(weight) = row.get(wi).and_then(|s| s.parse::<f64>().ok()) else {
                        continue;
                    };
                    Point::with_weight(values, weight)
                }
                None => Point::new(values),
            };
            points.push(point);
            row_indices.push(row_idx);
        }

        if points.is_empty() {
            return Err(KlustError::Config(
                "no complete rows with numeric data".into(),
            ));
        }

        Ok(Self {
            names,
            points,
            row_indices,
        })
    }

    /// Number of dimensions per point
    #[must_use]
    pub fn dim(&self) -> usize {
        self.names.len()
    }
}

fn parse_row(row: &[String], columns: &[usize]) -> Option<Vec<f64>> {
    let mut values = Vec::with_capacity(columns.len());
    for &col in columns {
        values.push(row.get(col)?.parse::<f64>().ok()?);
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(content.as_bytes()).expect("write content");
        file
    }

    #[test]
    fn test_parse_csv() {
        let file = create_test_csv("name,value,count\nalpha,1.5,10\nbeta,2.5,20\ngamma,3.5,30");
        let data = CsvData::from_file(file.path(), false).expect("parse csv");

        assert_eq!(data.headers, vec!["name", "value", "count"]);
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.col_count(), 3);
        assert_eq!(data.numeric_column_indices(), vec![1, 2]);
    }

    #[test]
    fn test_extract_points() {
        let file = create_test_csv("name,x,y\na,1.0,10.0\nb,2.0,20.0\nc,3.0,30.0");
        let data = CsvData::from_file(file.path(), false).expect("parse csv");
        let set = PointSet::from_csv(&data, None).expect("extract points");

        assert_eq!(set.dim(), 2);
        assert_eq!(set.names, vec!["x", "y"]);
        assert_eq!(set.points.len(), 3);
        assert_eq!(set.row_indices, vec![0, 1, 2]);
        assert!((set.points[1].value(1) - 20.0).abs() < 1e-12);
        assert!((set.points[1].weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_extract_points_with_weight_column() {
        let file = create_test_csv("x,y,w\n1.0,10.0,2.0\n2.0,20.0,0.5");
        let data = CsvData::from_file(file.path(), false).expect("parse csv");
        let set = PointSet::from_csv(&data, Some("w")).expect("extract points");

        assert_eq!(set.dim(), 2);
        assert_eq!(set.names, vec!["x", "y"]);
        assert!((set.points[0].weight() - 2.0).abs() < 1e-12);
        assert!((set.points[1].weight() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_weight_column_is_rejected() {
        let file = create_test_csv("x,y\n1.0,2.0");
        let data = CsvData::from_file(file.path(), false).expect("parse csv");

        let err = PointSet::from_csv(&data, Some("missing")).expect_err("must fail");
        assert!(matches!(err, KlustError::Config(_)));
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let file = create_test_csv("name,x,y\na,1.0,10.0\nb,oops,20.0\nc,3.0,30.0");
        let data = CsvData::from_file(file.path(), false).expect("parse csv");
        let set = PointSet::from_csv(&data, None).expect("extract points");

        assert_eq!(set.points.len(), 2);
        assert_eq!(set.row_indices, vec![0, 2]);
    }

    #[test]
    fn test_tsv_parsing() {
        let file = create_test_csv("x\ty\n1.0\t4.0\n2.0\t5.0");
        let data = CsvData::from_file(file.path(), true).expect("parse tsv");

        assert_eq!(data.headers, vec!["x", "y"]);
        assert_eq!(data.row_count(), 2);
    }
}
