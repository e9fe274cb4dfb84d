//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use retention_ai::artifacts::{ArtifactHandle, ArtifactStore, InMemoryArtifactStore};
use retention_ai::ml::{
    ChurnModel, FeatureSchema, FittedTransform, LabelledTable, LogisticModel, ModelArtifact,
};
use retention_ai::models::{EmployeeRecord, RawRecord};
use retention_ai::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn sample_employee() -> EmployeeRecord {
    serde_json::from_value(serde_json::json!({
        "Age": 30,
        "BusinessTravel": "Travel_Rarely",
        "DailyRate": 800,
        "Department": "Research & Development",
        "DistanceFromHome": 5,
        "Education": 3,
        "EducationField": "Life Sciences",
        "EnvironmentSatisfaction": 3,
        "Gender": "Male",
        "HourlyRate": 60,
        "JobInvolvement": 3,
        "JobLevel": 2,
        "JobRole": "Laboratory Technician",
        "JobSatisfaction": 3,
        "MaritalStatus": "Married",
        "MonthlyIncome": 5000,
        "MonthlyRate": 15000,
        "NumCompaniesWorked": 2,
        "OverTime": "No",
        "PercentSalaryHike": 15,
        "PerformanceRating": 3,
        "RelationshipSatisfaction": 3,
        "StockOptionLevel": 1,
        "TotalWorkingYears": 10,
        "TrainingTimesLastYear": 2,
        "WorkLifeBalance": 3,
        "YearsAtCompany": 5,
        "YearsInCurrentRole": 2,
        "YearsSinceLastPromotion": 1,
        "YearsWithCurrManager": 3
    }))
    .unwrap()
}

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap()
}

/// Random but plausible employee
pub fn random_employee(rng: &mut StdRng) -> EmployeeRecord {
    let mut employee = sample_employee();
    let total_working_years = rng.gen_range(0..=30);
    let years_at_company = rng.gen_range(0..=total_working_years);

    employee.age = rng.gen_range(18..=60);
    employee.business_travel =
        pick(rng, &["Travel_Rarely", "Travel_Frequently", "Non-Travel"]).to_string();
    employee.daily_rate = rng.gen_range(100..=1500);
    employee.department = pick(rng, &["Sales", "Research & Development", "Human Resources"]).to_string();
    employee.distance_from_home = rng.gen_range(1..=29);
    employee.education = rng.gen_range(1..=5);
    employee.education_field =
        pick(rng, &["Life Sciences", "Medical", "Marketing", "Technical Degree", "Other"]).to_string();
    employee.environment_satisfaction = rng.gen_range(1..=4);
    employee.gender = pick(rng, &["Male", "Female"]).to_string();
    employee.hourly_rate = rng.gen_range(30..=100);
    employee.job_involvement = rng.gen_range(1..=4);
    employee.job_level = rng.gen_range(1..=5);
    employee.job_role = pick(
        rng,
        &["Sales Executive", "Research Scientist", "Laboratory Technician", "Manager"],
    )
    .to_string();
    employee.job_satisfaction = rng.gen_range(1..=4);
    employee.marital_status = pick(rng, &["Single", "Married", "Divorced"]).to_string();
    employee.monthly_income = rng.gen_range(1000..=20000);
    employee.monthly_rate = rng.gen_range(2000..=27000);
    employee.num_companies_worked = rng.gen_range(0..=9);
    employee.over_time = pick(rng, &["Yes", "No"]).to_string();
    employee.percent_salary_hike = rng.gen_range(11..=25);
    employee.performance_rating = rng.gen_range(3..=4);
    employee.relationship_satisfaction = rng.gen_range(1..=4);
    employee.stock_option_level = rng.gen_range(0..=3);
    employee.total_working_years = total_working_years;
    employee.training_times_last_year = rng.gen_range(0..=6);
    employee.work_life_balance = rng.gen_range(1..=4);
    employee.years_at_company = years_at_company;
    employee.years_in_current_role = rng.gen_range(0..=years_at_company);
    employee.years_since_last_promotion = rng.gen_range(0..=years_at_company);
    employee.years_with_curr_manager = rng.gen_range(0..=years_at_company);
    employee
}

/// Labelled table where overtime, low satisfaction and youth drive attrition
pub fn synthetic_table(n: usize, seed: u64) -> LabelledTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);

    for i in 0..n {
        let employee = random_employee(&mut rng);

        let mut score = -1.5;
        if employee.over_time == "Yes" {
            score += 1.8;
        }
        score += (3 - employee.job_satisfaction) as f64 * 0.6;
        score += (35 - employee.age) as f64 * 0.05;
        score += rng.gen_range(-0.5..0.5);

        let mut record = RawRecord::from(&employee);
        record.insert("EmployeeNumber", i as i64 + 1);
        record.insert("Over18", "Y");

        records.push(record);
        labels.push(u8::from(score > 0.0));
    }

    LabelledTable::new(records, labels).unwrap()
}

/// Age + Department schema used by the small worked examples
pub fn small_schema() -> FeatureSchema {
    FeatureSchema::new(["Department"], ["Age"], ["EmployeeNumber"]).unwrap()
}

/// Ages with mean 35 and population std 5; departments first seen as Sales, R&D, HR
pub fn small_table() -> Vec<RawRecord> {
    vec![
        RawRecord::new().with("Age", 30i64).with("Department", "Sales").with("EmployeeNumber", 1i64),
        RawRecord::new().with("Age", 40i64).with("Department", "R&D").with("EmployeeNumber", 2i64),
        RawRecord::new().with("Age", 30i64).with("Department", "HR").with("EmployeeNumber", 3i64),
        RawRecord::new().with("Age", 40i64).with("Department", "Sales").with("EmployeeNumber", 4i64),
    ]
}

/// A model over `fitted`'s layout with the given weights
pub fn logistic_artifact(
    name: &str,
    fitted: &FittedTransform,
    coefficients: Vec<f64>,
    intercept: f64,
) -> ModelArtifact {
    ModelArtifact::new(
        name,
        ChurnModel::LogisticRegression(LogisticModel::new(coefficients, intercept)),
        fitted.feature_names().to_vec(),
        fitted.n_samples(),
    )
}

/// Publish the small preprocessor and a zero-weight model (every score is exactly 0.5)
pub async fn publish_zero_model(store: &dyn ArtifactStore) -> (ArtifactHandle, ArtifactHandle) {
    let fitted = FittedTransform::fit(&small_table(), &small_schema()).unwrap();
    let model = logistic_artifact("logistic_regression", &fitted, vec![0.0; fitted.n_features()], 0.0);

    let preprocessor = fitted.save(store, "preprocessor").await.unwrap();
    let model = model.save(store).await.unwrap();
    (model, preprocessor)
}

/// In-memory store that counts reads and can slow them down
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryArtifactStore,
    reads: AtomicUsize,
    read_delay: Duration,
}

impl CountingStore {
    pub fn with_delay(read_delay: Duration) -> Self {
        Self {
            read_delay,
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for CountingStore {
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactHandle> {
        self.inner.write(name, bytes).await
    }

    async fn read(&self, handle: &ArtifactHandle) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        self.inner.read(handle).await
    }

    async fn exists(&self, handle: &ArtifactHandle) -> Result<bool> {
        self.inner.exists(handle).await
    }

    async fn versions(&self, name: &str) -> Result<Vec<u64>> {
        self.inner.versions(name).await
    }
}
