//! Data ingestion: document store export -> feature store CSV -> train/test split.

use crate::data::schema::SchemaDefinition;
use crate::data::source::{Document, DocumentStore};
use crate::data::table::{Table, json_cell};
use crate::entity::{DataIngestionArtifact, DataIngestionConfig};
use crate::error::{Result, SegmentError, Stage};
use crate::storage::ObjectStorage;
use tracing::{info, warn};

/// Document field dropped on export.
const ID_FIELD: &str = "_id";

pub struct DataIngestion<'a> {
    config: DataIngestionConfig,
    store: &'a dyn DocumentStore,
    storage: &'a ObjectStorage,
}

impl<'a> DataIngestion<'a> {
    pub fn new(
        config: DataIngestionConfig,
        store: &'a dyn DocumentStore,
        storage: &'a ObjectStorage,
    ) -> Self {
        Self {
            config,
            store,
            storage,
        }
    }

    /// Export the collection into the feature store, ordered by the schema.
    pub fn export_data_into_feature_store(&self, schema: &SchemaDefinition) -> Result<Table> {
        info!(
            store = %self.store.describe(),
            database = %self.config.database,
            collection = %self.config.collection,
            "Exporting collection into feature store"
        );
        let docs = self
            .store
            .export_collection(&self.config.database, &self.config.collection)?;
        if docs.is_empty() {
            return Err(SegmentError::rejected(
                Stage::Ingestion,
                format!(
                    "collection {}.{} is empty",
                    self.config.database, self.config.collection
                ),
            ));
        }

        let table = documents_to_table(&docs, &schema.column_names());
        if table.column_count() != schema.len() {
            warn!(
                expected = schema.len(),
                found = table.column_count(),
                "Exported fields differ from the schema"
            );
        }
        let missing = table
            .rows
            .iter()
            .flatten()
            .filter(|v| v.is_nan())
            .count();
        if missing > 0 {
            warn!(missing, "Feature store contains missing or non-numeric cells");
        }

        self.storage.upload_df_as_csv(
            &table,
            &self.config.feature_store_key,
            &self.config.artifact_bucket,
        )?;
        info!(rows = table.row_count(), columns = table.column_count(), "Feature store written");
        Ok(table)
    }

    /// Split the feature store and persist both halves.
    pub fn split_data_as_train_test(&self, table: &Table) -> Result<DataIngestionArtifact> {
        let (train, test) =
            table.train_test_split(self.config.train_test_split_ratio, self.config.seed);
        info!(
            train_rows = train.row_count(),
            test_rows = test.row_count(),
            ratio = self.config.train_test_split_ratio,
            "Split feature store into train and test"
        );

        let bucket = &self.config.artifact_bucket;
        let trained_file_path = self
            .storage
            .upload_df_as_csv(&train, &self.config.train_key, bucket)?;
        let test_file_path = self
            .storage
            .upload_df_as_csv(&test, &self.config.test_key, bucket)?;

        Ok(DataIngestionArtifact {
            feature_store_file_path: self
                .storage
                .object_path(bucket, &self.config.feature_store_key),
            trained_file_path,
            test_file_path,
        })
    }

    pub fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        info!("Starting data ingestion");
        let schema = SchemaDefinition::load(&self.config.schema_file)?;
        let table = self.export_data_into_feature_store(&schema)?;
        let artifact = self.split_data_as_train_test(&table)?;
        info!(?artifact, "Data ingestion completed");
        Ok(artifact)
    }
}

/// Build a table from every exported field except `_id`.
///
/// Schema columns come first in schema order, then any other field in
/// first-seen order. A schema column absent from every document is left
/// out, so the column count reflects what the collection holds.
pub fn documents_to_table(docs: &[Document], schema_columns: &[String]) -> Table {
    let present = |name: &str| docs.iter().any(|doc| doc.contains_key(name));
    let mut columns: Vec<String> = schema_columns
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| c != ID_FIELD && present(c))
        .collect();
    for doc in docs {
        for key in doc.keys() {
            if key != ID_FIELD && !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    let rows = docs
        .iter()
        .map(|doc| columns.iter().map(|c| json_cell(doc.get(c))).collect())
        .collect();
    Table { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::data::source::JsonlDocumentStore;
    use crate::entity::TrainingPipelineConfig;
    use tempfile::TempDir;

    fn write_collection(root: &std::path::Path, n: usize) {
        let store = JsonlDocumentStore::new(root);
        let path = store.collection_path("ineuron", "customer_segmentation");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut body = String::new();
        for i in 0..n {
            body.push_str(&format!(
                "{{\"_id\": \"{i}\", \"Age\": \"{}\", \"Income\": {}, \"Extra\": \"x\"}}\n",
                30 + i,
                1000 * i
            ));
        }
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_documents_to_table_orders_by_schema() {
        let docs: Vec<Document> = vec![
            serde_json::from_str(r#"{"_id": "1", "Income": "5000", "Age": 40}"#).unwrap(),
            serde_json::from_str(r#"{"Age": "na"}"#).unwrap(),
        ];
        let table = documents_to_table(&docs, &["Age".into(), "Income".into()]);
        assert_eq!(table.columns, vec!["Age", "Income"]);
        assert_eq!(table.rows[0], vec![40.0, 5000.0]);
        assert!(table.rows[1][0].is_nan());
        assert!(table.rows[1][1].is_nan());
    }

    #[test]
    fn test_documents_to_table_keeps_collection_shape() {
        let docs: Vec<Document> = vec![
            serde_json::from_str(r#"{"_id": "1", "Age": 40, "Gold": 3}"#).unwrap(),
            serde_json::from_str(r#"{"_id": "2", "Age": 50, "Gold": 4}"#).unwrap(),
        ];
        let schema = ["Age".to_string(), "Income".to_string()];
        let table = documents_to_table(&docs, &schema);
        // Income is in no document; Gold is not in the schema.
        assert_eq!(table.columns, vec!["Age", "Gold"]);
        assert_eq!(table.rows[1], vec![50.0, 4.0]);
    }

    #[test]
    fn test_initiate_data_ingestion_writes_splits() {
        let dir = TempDir::new().unwrap();
        let docs_root = dir.path().join("docs");
        write_collection(&docs_root, 10);
        let schema_path = dir.path().join("schema.yaml");
        std::fs::write(&schema_path, "columns:\n  - Age: int\n  - Income: float\n").unwrap();

        let mut app = AppConfig::default();
        app.storage.root = dir.path().join("local_storage");
        app.pipeline.schema_file = schema_path;
        let run = TrainingPipelineConfig::new(&app, chrono::Utc::now());
        let storage = ObjectStorage::new(&app.storage.root);
        let store = JsonlDocumentStore::new(&docs_root);

        let ingestion = DataIngestion::new(DataIngestionConfig::new(&app, &run), &store, &storage);
        let artifact = ingestion.initiate_data_ingestion().unwrap();

        let train = Table::read_csv(&artifact.trained_file_path).unwrap();
        let test = Table::read_csv(&artifact.test_file_path).unwrap();
        assert_eq!(train.columns, vec!["Age", "Income", "Extra"]);
        assert_eq!(train.row_count(), 8);
        assert_eq!(test.row_count(), 2);
        assert!(artifact.feature_store_file_path.exists());
    }

    #[test]
    fn test_empty_collection_is_rejected() {
        let dir = TempDir::new().unwrap();
        let docs_root = dir.path().join("docs");
        write_collection(&docs_root, 0);
        let mut app = AppConfig::default();
        app.storage.root = dir.path().join("local_storage");
        let run = TrainingPipelineConfig::new(&app, chrono::Utc::now());
        let storage = ObjectStorage::new(&app.storage.root);
        let store = JsonlDocumentStore::new(&docs_root);
        let ingestion = DataIngestion::new(DataIngestionConfig::new(&app, &run), &store, &storage);

        let schema = SchemaDefinition::from_names(["Age"]);
        let err = ingestion.export_data_into_feature_store(&schema).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::Rejected {
                stage: Stage::Ingestion,
                ..
            }
        ));
    }
}
