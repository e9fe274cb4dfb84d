use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Categorical attributes of the HR attrition table
pub const CATEGORICAL_COLUMNS: &[&str] = &[
    "BusinessTravel",
    "Department",
    "EducationField",
    "Gender",
    "JobRole",
    "MaritalStatus",
    "OverTime",
];

/// Numerical attributes of the HR attrition table
pub const NUMERICAL_COLUMNS: &[&str] = &[
    "Age",
    "DailyRate",
    "DistanceFromHome",
    "Education",
    "EnvironmentSatisfaction",
    "HourlyRate",
    "JobInvolvement",
    "JobLevel",
    "JobSatisfaction",
    "MonthlyIncome",
    "MonthlyRate",
    "NumCompaniesWorked",
    "PercentSalaryHike",
    "PerformanceRating",
    "RelationshipSatisfaction",
    "StockOptionLevel",
    "TotalWorkingYears",
    "TrainingTimesLastYear",
    "WorkLifeBalance",
    "YearsAtCompany",
    "YearsInCurrentRole",
    "YearsSinceLastPromotion",
    "YearsWithCurrManager",
];

/// Identifier and constant columns present in the dataset but never used
pub const DROPPED_COLUMNS: &[&str] = &["EmployeeNumber", "EmployeeCount", "Over18", "StandardHours"];

/// Every field an `EmployeeRecord` carries, in boundary order
pub const EMPLOYEE_COLUMNS: &[&str] = &[
    "Age",
    "BusinessTravel",
    "DailyRate",
    "Department",
    "DistanceFromHome",
    "Education",
    "EducationField",
    "EnvironmentSatisfaction",
    "Gender",
    "HourlyRate",
    "JobInvolvement",
    "JobLevel",
    "JobRole",
    "JobSatisfaction",
    "MaritalStatus",
    "MonthlyIncome",
    "MonthlyRate",
    "NumCompaniesWorked",
    "OverTime",
    "PercentSalaryHike",
    "PerformanceRating",
    "RelationshipSatisfaction",
    "StockOptionLevel",
    "TotalWorkingYears",
    "TrainingTimesLastYear",
    "WorkLifeBalance",
    "YearsAtCompany",
    "YearsInCurrentRole",
    "YearsSinceLastPromotion",
    "YearsWithCurrManager",
];

/// Role a column plays in the feature pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Categorical,
    Numerical,
    Dropped,
}

/// Declaration of which input fields are categorical, numerical or dropped.
///
/// The three lists are disjoint. Order matters: numerical features are emitted
/// in `numerical` order and categorical blocks in `categorical` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    categorical: Vec<String>,
    numerical: Vec<String>,
    dropped: Vec<String>,
}

impl FeatureSchema {
    pub fn new<C, N, D>(categorical: C, numerical: N, dropped: D) -> Result<Self>
    where
        C: IntoIterator,
        C::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        let schema = Self {
            categorical: categorical.into_iter().map(Into::into).collect(),
            numerical: numerical.into_iter().map(Into::into).collect(),
            dropped: dropped.into_iter().map(Into::into).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// The employee attrition schema
    pub fn attrition() -> Self {
        Self {
            categorical: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            numerical: NUMERICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            dropped: DROPPED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Check that no column is declared twice
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in self
            .categorical
            .iter()
            .chain(&self.numerical)
            .chain(&self.dropped)
        {
            if column.is_empty() {
                return Err(AppError::Configuration(
                    "Feature schema contains an empty column name".to_string(),
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(AppError::Configuration(format!(
                    "Column '{}' is declared more than once in the feature schema",
                    column
                )));
            }
        }
        Ok(())
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    pub fn numerical(&self) -> &[String] {
        &self.numerical
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn role(&self, column: &str) -> Option<ColumnRole> {
        if self.categorical.iter().any(|c| c == column) {
            Some(ColumnRole::Categorical)
        } else if self.numerical.iter().any(|c| c == column) {
            Some(ColumnRole::Numerical)
        } else if self.dropped.iter().any(|c| c == column) {
            Some(ColumnRole::Dropped)
        } else {
            None
        }
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::attrition()
    }
}
