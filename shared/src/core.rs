use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "mocks"))]
use mockall::{automock, predicate::*};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Item {
    pub id: String,
    pub data: String,
}

impl Item {
    pub fn new(id: String, data: String) -> Self {
        Self { id, data }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("failed to get item: {0}")]
    Read(String),
    #[error("failed to unmarshal item: {0}")]
    Unmarshal(String),
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait ItemRepository {
    async fn get_item(&self, id: &str) -> Result<Option<Item>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn item_serializes_with_lowercase_keys() {
        let item = Item::new("42".to_string(), "hello".to_string());

        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json, serde_json::json!({"id": "42", "data": "hello"}));
    }

    #[tokio::test]
    async fn mock_repository_returns_configured_item() {
        let mut repo = MockItemRepository::new();
        repo.expect_get_item()
            .with(eq("42"))
            .times(1)
            .returning(|id| Ok(Some(Item::new(id.to_string(), "hello".to_string()))));

        let item = repo.get_item("42").await.unwrap();

        assert_eq!(item, Some(Item::new("42".to_string(), "hello".to_string())));
    }
}
