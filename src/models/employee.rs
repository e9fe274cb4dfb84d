use crate::ml::schema::EMPLOYEE_COLUMNS;
use crate::models::record::{FieldRef, FieldValue, RawRecord, Record};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Employee attributes accepted at the scoring boundary.
///
/// Field names serialize in the HR dataset's `PascalCase` form. Unknown fields in
/// incoming JSON are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct EmployeeRecord {
    #[validate(range(min = 18, max = 100))]
    pub age: i64,

    #[validate(length(min = 1, max = 64))]
    pub business_travel: String,

    #[validate(range(min = 0))]
    pub daily_rate: i64,

    #[validate(length(min = 1, max = 64))]
    pub department: String,

    #[validate(range(min = 0))]
    pub distance_from_home: i64,

    #[validate(range(min = 1, max = 5))]
    pub education: i64,

    #[validate(length(min = 1, max = 64))]
    pub education_field: String,

    #[validate(range(min = 1, max = 4))]
    pub environment_satisfaction: i64,

    #[validate(length(min = 1, max = 32))]
    pub gender: String,

    #[validate(range(min = 0))]
    pub hourly_rate: i64,

    #[validate(range(min = 1, max = 4))]
    pub job_involvement: i64,

    #[validate(range(min = 1, max = 5))]
    pub job_level: i64,

    #[validate(length(min = 1, max = 64))]
    pub job_role: String,

    #[validate(range(min = 1, max = 4))]
    pub job_satisfaction: i64,

    #[validate(length(min = 1, max = 32))]
    pub marital_status: String,

    #[validate(range(min = 0))]
    pub monthly_income: i64,

    #[validate(range(min = 0))]
    pub monthly_rate: i64,

    #[validate(range(min = 0))]
    pub num_companies_worked: i64,

    #[validate(length(min = 1, max = 8))]
    pub over_time: String,

    #[validate(range(min = 0))]
    pub percent_salary_hike: i64,

    #[validate(range(min = 1, max = 4))]
    pub performance_rating: i64,

    #[validate(range(min = 1, max = 4))]
    pub relationship_satisfaction: i64,

    #[validate(range(min = 0, max = 3))]
    pub stock_option_level: i64,

    #[validate(range(min = 0))]
    pub total_working_years: i64,

    #[validate(range(min = 0))]
    pub training_times_last_year: i64,

    #[validate(range(min = 1, max = 4))]
    pub work_life_balance: i64,

    #[validate(range(min = 0))]
    pub years_at_company: i64,

    #[validate(range(min = 0))]
    pub years_in_current_role: i64,

    #[validate(range(min = 0))]
    pub years_since_last_promotion: i64,

    #[validate(range(min = 0))]
    pub years_with_curr_manager: i64,
}

impl Record for EmployeeRecord {
    fn field(&self, column: &str) -> Option<FieldRef<'_>> {
        let value = match column {
            "Age" => FieldRef::Int(self.age),
            "BusinessTravel" => FieldRef::Text(&self.business_travel),
            "DailyRate" => FieldRef::Int(self.daily_rate),
            "Department" => FieldRef::Text(&self.department),
            "DistanceFromHome" => FieldRef::Int(self.distance_from_home),
            "Education" => FieldRef::Int(self.education),
            "EducationField" => FieldRef::Text(&self.education_field),
            "EnvironmentSatisfaction" => FieldRef::Int(self.environment_satisfaction),
            "Gender" => FieldRef::Text(&self.gender),
            "HourlyRate" => FieldRef::Int(self.hourly_rate),
            "JobInvolvement" => FieldRef::Int(self.job_involvement),
            "JobLevel" => FieldRef::Int(self.job_level),
            "JobRole" => FieldRef::Text(&self.job_role),
            "JobSatisfaction" => FieldRef::Int(self.job_satisfaction),
            "MaritalStatus" => FieldRef::Text(&self.marital_status),
            "MonthlyIncome" => FieldRef::Int(self.monthly_income),
            "MonthlyRate" => FieldRef::Int(self.monthly_rate),
            "NumCompaniesWorked" => FieldRef::Int(self.num_companies_worked),
            "OverTime" => FieldRef::Text(&self.over_time),
            "PercentSalaryHike" => FieldRef::Int(self.percent_salary_hike),
            "PerformanceRating" => FieldRef::Int(self.performance_rating),
            "RelationshipSatisfaction" => FieldRef::Int(self.relationship_satisfaction),
            "StockOptionLevel" => FieldRef::Int(self.stock_option_level),
            "TotalWorkingYears" => FieldRef::Int(self.total_working_years),
            "TrainingTimesLastYear" => FieldRef::Int(self.training_times_last_year),
            "WorkLifeBalance" => FieldRef::Int(self.work_life_balance),
            "YearsAtCompany" => FieldRef::Int(self.years_at_company),
            "YearsInCurrentRole" => FieldRef::Int(self.years_in_current_role),
            "YearsSinceLastPromotion" => FieldRef::Int(self.years_since_last_promotion),
            "YearsWithCurrManager" => FieldRef::Int(self.years_with_curr_manager),
            _ => return None,
        };
        Some(value)
    }
}

impl From<&EmployeeRecord> for RawRecord {
    fn from(employee: &EmployeeRecord) -> Self {
        EMPLOYEE_COLUMNS
            .iter()
            .filter_map(|column| {
                let value: FieldValue = match employee.field(column)? {
                    FieldRef::Int(v) => v.into(),
                    FieldRef::Float(v) => v.into(),
                    FieldRef::Text(s) => s.into(),
                };
                Some((*column, value))
            })
            .collect()
    }
}
