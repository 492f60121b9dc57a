use crate::config::AppConfig;
use crate::data::Table;
use crate::error::{Result, SegmentError, Stage};
use crate::model::CustomerClusterEstimator;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// One customer record as accepted by the prediction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerData {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Education")]
    pub education: i64,
    #[serde(rename = "Marital_Status")]
    pub marital_status: i64,
    #[serde(rename = "Parental_Status")]
    pub parental_status: i64,
    #[serde(rename = "Children")]
    pub children: i64,
    #[serde(rename = "Income")]
    pub income: f64,
    #[serde(rename = "Total_Spending")]
    pub total_spending: f64,
    #[serde(rename = "Days_as_Customer")]
    pub days_as_customer: i64,
    #[serde(rename = "Recency")]
    pub recency: i64,
    #[serde(rename = "Wines")]
    pub wines: i64,
    #[serde(rename = "Fruits")]
    pub fruits: i64,
    #[serde(rename = "Meat")]
    pub meat: i64,
    #[serde(rename = "Fish")]
    pub fish: i64,
    #[serde(rename = "Sweets")]
    pub sweets: i64,
    #[serde(rename = "Gold")]
    pub gold: i64,
    #[serde(rename = "Web")]
    pub web: i64,
    #[serde(rename = "Catalog")]
    pub catalog: i64,
    #[serde(rename = "Store")]
    pub store: i64,
    #[serde(rename = "Discount_Purchases")]
    pub discount_purchases: i64,
    #[serde(rename = "Total_Promo")]
    pub total_promo: i64,
    #[serde(rename = "NumWebVisitsMonth")]
    pub num_web_visits_month: i64,
}

impl CustomerData {
    /// Feature order the model is trained on.
    pub const COLUMNS: [&'static str; 21] = [
        "Age",
        "Education",
        "Marital_Status",
        "Parental_Status",
        "Children",
        "Income",
        "Total_Spending",
        "Days_as_Customer",
        "Recency",
        "Wines",
        "Fruits",
        "Meat",
        "Fish",
        "Sweets",
        "Gold",
        "Web",
        "Catalog",
        "Store",
        "Discount_Purchases",
        "Total_Promo",
        "NumWebVisitsMonth",
    ];

    pub fn to_row(&self) -> Vec<f64> {
        vec![
            self.age as f64,
            self.education as f64,
            self.marital_status as f64,
            self.parental_status as f64,
            self.children as f64,
            self.income,
            self.total_spending,
            self.days_as_customer as f64,
            self.recency as f64,
            self.wines as f64,
            self.fruits as f64,
            self.meat as f64,
            self.fish as f64,
            self.sweets as f64,
            self.gold as f64,
            self.web as f64,
            self.catalog as f64,
            self.store as f64,
            self.discount_purchases as f64,
            self.total_promo as f64,
            self.num_web_visits_month as f64,
        ]
    }

    pub fn to_table(records: &[CustomerData]) -> Table {
        Table {
            columns: Self::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: records.iter().map(Self::to_row).collect(),
        }
    }
}

/// Predicts through a fresh estimator on the canonical model path.
pub struct PredictionPipeline {
    model_path: PathBuf,
}

impl PredictionPipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            model_path: config.canonical_model_path(),
        }
    }

    pub fn run_pipeline(&self, records: &[CustomerData]) -> Result<Vec<usize>> {
        if records.is_empty() {
            return Err(SegmentError::invalid_input(
                Stage::Prediction,
                "no customer records to predict",
            ));
        }
        info!(records = records.len(), model = %self.model_path.display(), "Running prediction pipeline");
        let mut estimator = CustomerClusterEstimator::new(&self.model_path);
        estimator.predict(&CustomerData::to_table(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "Age": 45, "Education": 1, "Marital_Status": 1, "Parental_Status": 1,
            "Children": 2, "Income": 58138.0, "Total_Spending": 1617.0,
            "Days_as_Customer": 971, "Recency": 58, "Wines": 635, "Fruits": 88,
            "Meat": 546, "Fish": 172, "Sweets": 88, "Gold": 88, "Web": 8,
            "Catalog": 10, "Store": 4, "Discount_Purchases": 3, "Total_Promo": 0,
            "NumWebVisitsMonth": 7
        })
    }

    #[test]
    fn test_customer_data_field_names() {
        let data: CustomerData = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(serde_json::to_value(&data).unwrap(), sample_json());
    }

    #[test]
    fn test_row_follows_column_order() {
        let data: CustomerData = serde_json::from_value(sample_json()).unwrap();
        let row = data.to_row();
        assert_eq!(row.len(), CustomerData::COLUMNS.len());
        assert_eq!(row[0], 45.0);
        assert_eq!(row[5], 58138.0);
        assert_eq!(row[20], 7.0);
    }

    #[test]
    fn test_integer_fields_reject_fractions() {
        let mut v = sample_json();
        v["Age"] = serde_json::json!(45.5);
        assert!(serde_json::from_value::<CustomerData>(v).is_err());
    }

    #[test]
    fn test_absent_model_names_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.root = dir.path().to_path_buf();
        let data: CustomerData = serde_json::from_value(sample_json()).unwrap();
        let err = PredictionPipeline::new(&config)
            .run_pipeline(&[data])
            .unwrap_err();
        assert!(matches!(err, SegmentError::NotFound { .. }));
        assert!(err.to_string().contains("model.json"));
    }
}
