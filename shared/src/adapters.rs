use crate::core::{Item, ItemRepository, RepositoryError};
use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client};
use std::collections::HashMap;

#[derive(Debug)]
pub struct DynamoDbItemRepository {
    table_name: String,
    dynamodb_client: Client,
}

impl DynamoDbItemRepository {
    pub fn new(table_name: String, dynamodb_client: Client) -> Self {
        Self {
            table_name,
            dynamodb_client,
        }
    }
}

#[async_trait]
impl ItemRepository for DynamoDbItemRepository {
    async fn get_item(&self, id: &str) -> Result<Option<Item>, RepositoryError> {
        let output = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::Read(format!("{:?}", e)))?;

        match output.item {
            None => Ok(None),
            Some(attributes) => Item::try_from(attributes).map(Some),
        }
    }
}

impl TryFrom<HashMap<String, AttributeValue>> for Item {
    type Error = RepositoryError;

    fn try_from(item: HashMap<String, AttributeValue>) -> Result<Self, Self::Error> {
        let id = item
            .get("id")
            .ok_or_else(|| RepositoryError::Unmarshal("id not found".to_string()))?
            .as_s()
            .map(|s| s.to_string())
            .map_err(|_| RepositoryError::Unmarshal("id is not a String".to_string()))?;
        // a missing data attribute reads as empty, a mistyped one is an error
        let data = match item.get("data") {
            None => String::new(),
            Some(value) => value
                .as_s()
                .map(|s| s.to_string())
                .map_err(|_| RepositoryError::Unmarshal("data is not a String".to_string()))?,
        };

        Ok(Item::new(id, data))
    }
}
