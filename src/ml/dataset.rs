use crate::error::{AppError, Result};
use crate::ml::schema::{ColumnRole, FeatureSchema};
use crate::models::{FieldValue, RawRecord};
use csv::ReaderBuilder;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Map an attrition label to 0/1
pub fn parse_label(raw: &str) -> Option<u8> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "1" | "true" => Some(1),
        "no" | "0" | "false" => Some(0),
        _ => None,
    }
}

/// Historical employee rows with their attrition outcome
#[derive(Debug, Clone, Default)]
pub struct LabelledTable {
    pub records: Vec<RawRecord>,
    pub labels: Vec<u8>,
}

impl LabelledTable {
    pub fn new(records: Vec<RawRecord>, labels: Vec<u8>) -> Result<Self> {
        if records.len() != labels.len() {
            return Err(AppError::Validation(format!(
                "{} records but {} labels",
                records.len(),
                labels.len()
            )));
        }
        if let Some(bad) = labels.iter().find(|l| **l > 1) {
            return Err(AppError::Validation(format!("Label {} is not binary", bad)));
        }
        Ok(Self { records, labels })
    }

    pub fn from_csv_path<P: AsRef<Path>>(
        path: P,
        target_column: &str,
        schema: &FeatureSchema,
    ) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_csv_reader(file, target_column, schema)?;
        info!(
            path = ?path.as_ref(),
            rows = table.len(),
            positives = table.positives(),
            "Loaded training table"
        );
        Ok(table)
    }

    /// Parse a headed CSV; empty cells are left out of the record.
    ///
    /// Cells of categorical columns stay text, exactly as written, so `007` trains the
    /// same category a JSON `"007"` is scored with.
    pub fn from_csv_reader<R: Read>(
        reader: R,
        target_column: &str,
        schema: &FeatureSchema,
    ) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let categorical: Vec<bool> = headers
            .iter()
            .map(|h| schema.role(h) == Some(ColumnRole::Categorical))
            .collect();

        let target_idx = headers
            .iter()
            .position(|h| h == target_column)
            .ok_or_else(|| {
                AppError::Validation(format!("Target column '{}' not found", target_column))
            })?;

        let mut records = Vec::new();
        let mut labels = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let line = result?;

            let raw_label = line.get(target_idx).unwrap_or_default();
            let label = parse_label(raw_label).ok_or_else(|| {
                AppError::Validation(format!(
                    "Row {}: unrecognized {} value '{}'",
                    row + 1,
                    target_column,
                    raw_label
                ))
            })?;

            let record: RawRecord = headers
                .iter()
                .zip(line.iter())
                .enumerate()
                .filter(|(idx, (_, cell))| *idx != target_idx && !cell.is_empty())
                .map(|(idx, (column, cell))| {
                    let value = if categorical[idx] {
                        FieldValue::Text(cell.to_string())
                    } else {
                        FieldValue::parse(cell)
                    };
                    (column, value)
                })
                .collect();

            records.push(record);
            labels.push(label);
        }

        Self::new(records, labels)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|l| **l == 1).count()
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Stratified train/test split.
    ///
    /// Each class contributes `round(n_class * test_size)` rows to the test half, clamped
    /// so both halves keep at least one row of each class. Rows keep their table order
    /// within each half. The same seed always yields the same split.
    pub fn train_test_split(&self, test_size: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Validation(format!(
                "test_size must be in (0, 1), got {}",
                test_size
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train_idx = Vec::with_capacity(self.len());
        let mut test_idx = Vec::new();

        for class in [0u8, 1u8] {
            let mut indices: Vec<usize> = (0..self.len())
                .filter(|&i| self.labels[i] == class)
                .collect();

            if indices.len() < 2 {
                return Err(AppError::Validation(format!(
                    "Stratified split needs at least two rows of class {}, found {}",
                    class,
                    indices.len()
                )));
            }

            indices.shuffle(&mut rng);
            let n_test = ((indices.len() as f64) * test_size)
                .round()
                .clamp(1.0, (indices.len() - 1) as f64) as usize;

            test_idx.extend_from_slice(&indices[..n_test]);
            train_idx.extend_from_slice(&indices[n_test..]);
        }

        train_idx.sort_unstable();
        test_idx.sort_unstable();

        Ok((self.subset(&train_idx), self.subset(&test_idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldRef, Record};

    const CSV: &str = "\
Age,Attrition,Department,EmployeeNumber,OverTime
41,Yes,Sales,1,Yes
49,No,Research & Development,2,No
37,Yes,Research & Development,4,Yes
33,No,,5,Yes
";

    #[test]
    fn test_parse_labels() {
        assert_eq!(parse_label("Yes"), Some(1));
        assert_eq!(parse_label(" no "), Some(0));
        assert_eq!(parse_label("1"), Some(1));
        assert_eq!(parse_label("false"), Some(0));
        assert_eq!(parse_label("maybe"), None);
    }

    #[test]
    fn test_from_csv_reader() {
        let table =
            LabelledTable::from_csv_reader(CSV.as_bytes(), "Attrition", &FeatureSchema::attrition())
                .unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.labels, vec![1, 0, 1, 0]);
        assert_eq!(table.positives(), 2);
        assert!(table.records[0].field("Attrition").is_none());
        assert_eq!(table.records[0].field("Age").and_then(|v| v.as_f64()), Some(41.0));
        assert!(table.records[3].field("Department").is_none());
    }

    #[test]
    fn test_numeric_looking_categories_stay_text() {
        let csv = "Age,Attrition,Department,JobLevel\n30,Yes,007,2\n41,No,1.50,3\n";
        let table =
            LabelledTable::from_csv_reader(csv.as_bytes(), "Attrition", &FeatureSchema::attrition())
                .unwrap();

        assert_eq!(table.records[0].field("Department"), Some(FieldRef::Text("007")));
        assert_eq!(table.records[1].field("Department"), Some(FieldRef::Text("1.50")));
        assert_eq!(table.records[0].field("JobLevel"), Some(FieldRef::Int(2)));
    }

    #[test]
    fn test_missing_target_column() {
        let result =
            LabelledTable::from_csv_reader(CSV.as_bytes(), "Churn", &FeatureSchema::attrition());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_bad_label_reports_row() {
        let csv = "Age,Attrition\n30,Yes\n31,Perhaps\n";
        let schema = FeatureSchema::attrition();
        match LabelledTable::from_csv_reader(csv.as_bytes(), "Attrition", &schema) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Row 2")),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_split_sizes() {
        let records: Vec<RawRecord> = (0..100).map(|i| RawRecord::new().with("Age", i as i64)).collect();
        let labels: Vec<u8> = (0..100).map(|i| u8::from(i % 5 == 0)).collect();
        let table = LabelledTable::new(records, labels).unwrap();

        let (train, test) = table.train_test_split(0.2, 42).unwrap();

        assert_eq!(train.len() + test.len(), 100);
        assert_eq!(test.positives(), 4);
        assert_eq!(test.len(), 20);
    }

    #[test]
    fn test_split_needs_both_classes() {
        let records: Vec<RawRecord> = (0..10).map(|i| RawRecord::new().with("Age", i as i64)).collect();
        let table = LabelledTable::new(records, vec![0; 10]).unwrap();

        assert!(table.train_test_split(0.2, 42).is_err());
        assert!(table.train_test_split(1.0, 42).is_err());
    }
}
