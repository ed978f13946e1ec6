// Metadata storage: the small structured record per document, and the
// user-profile table documents are cross-referenced from. Grounded on
// `database.py`'s split between the documents table and the user-profiles
// table, each keyed on a single partition key.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use iep_core::Record;
use serde_json::Value;

use crate::error::StorageError;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_record(&self, iep_id: &str, child_id: &str) -> Result<Option<Record>, StorageError>;
    async fn put_record(&self, record: &Record) -> Result<(), StorageError>;
    async fn get_user_profile(&self, user_id: &str) -> Result<Option<Value>, StorageError>;
    async fn put_user_profile(&self, user_id: &str, profile: Value) -> Result<(), StorageError>;
}

/// Record key: DynamoDB's documents table uses `iepId` as partition key and
/// `childId` as sort key, so a lookup needs both.
fn record_key(iep_id: &str, child_id: &str) -> String {
    format!("{}#{}", iep_id, child_id)
}

/// An in-process `MetadataStore`, used by the CLI's local-run mode and by
/// tests across the workspace.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<HashMap<String, Record>>,
    profiles: Mutex<HashMap<String, Value>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get_record(&self, iep_id: &str, child_id: &str) -> Result<Option<Record>, StorageError> {
        let records = self.records.lock().unwrap();
        Ok(records.get(&record_key(iep_id, child_id)).cloned())
    }

    async fn put_record(&self, record: &Record) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap();
        records.insert(record_key(&record.iep_id, &record.child_id), record.clone());
        Ok(())
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<Option<Value>, StorageError> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.get(user_id).cloned())
    }

    async fn put_user_profile(&self, user_id: &str, profile: Value) -> Result<(), StorageError> {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.insert(user_id.to_string(), profile);
        Ok(())
    }
}

#[cfg(feature = "dynamodb")]
mod dynamo {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;
    use aws_sdk_dynamodb::Client;

    /// A `MetadataStore` backed by two DynamoDB tables, matching the
    /// original Lambda's `IEP_DOCUMENTS_TABLE` / `USER_PROFILES_TABLE`
    /// environment-configured tables.
    pub struct DynamoMetadataStore {
        client: Client,
        documents_table: String,
        user_profiles_table: String,
    }

    impl DynamoMetadataStore {
        pub async fn new(documents_table: impl Into<String>, user_profiles_table: impl Into<String>) -> Self {
            let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Self {
                client: Client::new(&config),
                documents_table: documents_table.into(),
                user_profiles_table: user_profiles_table.into(),
            }
        }

        pub fn with_client(
            client: Client,
            documents_table: impl Into<String>,
            user_profiles_table: impl Into<String>,
        ) -> Self {
            Self {
                client,
                documents_table: documents_table.into(),
                user_profiles_table: user_profiles_table.into(),
            }
        }
    }

    #[async_trait]
    impl MetadataStore for DynamoMetadataStore {
        async fn get_record(&self, iep_id: &str, child_id: &str) -> Result<Option<Record>, StorageError> {
            let response = self
                .client
                .get_item()
                .table_name(&self.documents_table)
                .key("iepId", AttributeValue::S(iep_id.to_string()))
                .key("childId", AttributeValue::S(child_id.to_string()))
                .send()
                .await
                .map_err(|e| StorageError::Metadata(e.to_string()))?;

            let Some(item) = response.item else {
                return Ok(None);
            };
            let json = item_to_json(item)?;
            let record: Record = serde_json::from_value(json)?;
            Ok(Some(record))
        }

        async fn put_record(&self, record: &Record) -> Result<(), StorageError> {
            let json = serde_json::to_value(record)?;
            let item = json_to_item(json)?;
            self.client
                .put_item()
                .table_name(&self.documents_table)
                .set_item(Some(item))
                .send()
                .await
                .map_err(|e| StorageError::Metadata(e.to_string()))?;
            Ok(())
        }

        async fn get_user_profile(&self, user_id: &str) -> Result<Option<Value>, StorageError> {
            let response = self
                .client
                .get_item()
                .table_name(&self.user_profiles_table)
                .key("userId", AttributeValue::S(user_id.to_string()))
                .send()
                .await
                .map_err(|e| StorageError::Metadata(e.to_string()))?;

            match response.item {
                Some(item) => Ok(Some(item_to_json(item)?)),
                None => Ok(None),
            }
        }

        async fn put_user_profile(&self, user_id: &str, mut profile: Value) -> Result<(), StorageError> {
            if let Value::Object(ref mut map) = profile {
                map.insert("userId".to_string(), Value::String(user_id.to_string()));
            }
            let item = json_to_item(profile)?;
            self.client
                .put_item()
                .table_name(&self.user_profiles_table)
                .set_item(Some(item))
                .send()
                .await
                .map_err(|e| StorageError::Metadata(e.to_string()))?;
            Ok(())
        }
    }

    /// Converts a DynamoDB item map into a `serde_json::Value`, the
    /// inverse of [`json_to_item`]. Only the attribute kinds the record
    /// schema actually produces are handled.
    fn item_to_json(item: HashMap<String, AttributeValue>) -> Result<Value, StorageError> {
        let mut map = serde_json::Map::new();
        for (key, value) in item {
            map.insert(key, attribute_to_json(value)?);
        }
        Ok(Value::Object(map))
    }

    fn attribute_to_json(value: AttributeValue) -> Result<Value, StorageError> {
        match value {
            AttributeValue::S(s) => Ok(Value::String(s)),
            AttributeValue::N(n) => serde_json::from_str(&n)
                .map_err(|_| StorageError::Metadata(format!("invalid numeric attribute: {}", n))),
            AttributeValue::Bool(b) => Ok(Value::Bool(b)),
            AttributeValue::Null(_) => Ok(Value::Null),
            AttributeValue::L(list) => {
                let items: Result<Vec<Value>, StorageError> =
                    list.into_iter().map(attribute_to_json).collect();
                Ok(Value::Array(items?))
            }
            AttributeValue::M(map) => item_to_json(map),
            other => Err(StorageError::Metadata(format!(
                "unsupported DynamoDB attribute kind: {:?}",
                other
            ))),
        }
    }

    fn json_to_item(value: Value) -> Result<HashMap<String, AttributeValue>, StorageError> {
        match value {
            Value::Object(map) => {
                let mut item = HashMap::with_capacity(map.len());
                for (key, value) in map {
                    item.insert(key, json_to_attribute(value)?);
                }
                Ok(item)
            }
            other => Err(StorageError::Metadata(format!(
                "expected a JSON object for a DynamoDB item, found: {}",
                other
            ))),
        }
    }

    fn json_to_attribute(value: Value) -> Result<AttributeValue, StorageError> {
        Ok(match value {
            Value::Null => AttributeValue::Null(true),
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => AttributeValue::N(n.to_string()),
            Value::String(s) => AttributeValue::S(s),
            Value::Array(items) => {
                let converted: Result<Vec<AttributeValue>, StorageError> =
                    items.into_iter().map(json_to_attribute).collect();
                AttributeValue::L(converted?)
            }
            Value::Object(map) => {
                let mut inner = HashMap::with_capacity(map.len());
                for (key, value) in map {
                    inner.insert(key, json_to_attribute(value)?);
                }
                AttributeValue::M(inner)
            }
        })
    }
}

#[cfg(feature = "dynamodb")]
pub use dynamo::DynamoMetadataStore;
