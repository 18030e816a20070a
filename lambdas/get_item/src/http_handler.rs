use lambda_http::RequestExt;
use lambda_http::{http::StatusCode, Error, IntoResponse, Request};
use shared::core::{ItemRepository, RepositoryError};
use shared::utils::{json_response, text_response};

pub(crate) struct HandlerDeps<R: ItemRepository> {
    pub item_repo: R,
}

#[tracing::instrument(skip(deps, event))]
pub(crate) async fn function_handler<R: ItemRepository>(
    deps: &HandlerDeps<R>,
    event: Request,
) -> Result<impl IntoResponse, Error> {
    tracing::info!("Received event: {:?}", event);

    let id = event
        .path_parameters_ref()
        .and_then(|params| params.first("id"))
        .unwrap_or("");

    if id.is_empty() {
        return text_response(&StatusCode::BAD_REQUEST, "Missing 'id' path parameter");
    }

    match deps.item_repo.get_item(id).await {
        Ok(Some(item)) => json_response(&StatusCode::OK, &item),
        Ok(None) => text_response(
            &StatusCode::NOT_FOUND,
            format!("Item with id '{}' not found", id),
        ),
        Err(RepositoryError::Unmarshal(e)) => {
            tracing::error!("failed to unmarshal item: {}", e);
            text_response(
                &StatusCode::INTERNAL_SERVER_ERROR,
                "Error unmarshalling DynamoDB data",
            )
        }
        Err(e) => {
            tracing::error!("{}", e);
            text_response(&StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{function_handler, HandlerDeps};
    use lambda_http::http::Request;
    use lambda_http::{Body, IntoResponse, RequestExt};
    use mockall::predicate::eq;
    use shared::core::{Item, MockItemRepository, RepositoryError};
    use std::collections::HashMap;

    fn request_with_id(id: &str) -> Request<Body> {
        let mut path_params = HashMap::new();
        path_params.insert("id".to_string(), id.to_string());
        Request::builder()
            .header("Content-Type", "application/json")
            .body(Body::Empty)
            .unwrap()
            .with_path_parameters(path_params)
    }

    #[tokio::test]
    async fn when_item_exists_should_return_json() {
        let mut mock_item_repo = MockItemRepository::default();
        mock_item_repo
            .expect_get_item()
            .times(1)
            .with(eq("abc")) // make sure the path parameter is propagated
            .returning(|id| Ok(Some(Item::new(id.to_string(), "payload".to_string()))));
        let deps = HandlerDeps {
            item_repo: mock_item_repo,
        };

        let result = function_handler(&deps, request_with_id("abc")).await;

        assert!(result.is_ok());
        let data = result.unwrap().into_response().await;
        assert_eq!(data.status(), 200);
        assert_eq!(
            data.headers().get("Content-Type").unwrap(),
            "application/json"
        );
        let body: Item = serde_json::from_slice(data.body().as_ref()).unwrap();
        assert_eq!(body, Item::new("abc".to_string(), "payload".to_string()));
    }

    #[tokio::test]
    async fn when_id_not_passed_should_return_400() {
        let deps = HandlerDeps {
            item_repo: MockItemRepository::default(),
        };
        let request = Request::builder()
            .header("Content-Type", "application/json")
            .body(Body::Empty)
            .unwrap();

        let result = function_handler(&deps, request).await;

        assert!(result.is_ok());
        let data = result.unwrap().into_response().await;
        assert_eq!(data.status(), 400);
        assert_eq!(data.body().as_ref(), b"Missing 'id' path parameter");
    }

    #[tokio::test]
    async fn when_item_not_found_should_return_404() {
        let mut mock_item_repo = MockItemRepository::default();
        mock_item_repo
            .expect_get_item()
            .times(1)
            .with(eq("missing"))
            .returning(|_id| Ok(None));
        let deps = HandlerDeps {
            item_repo: mock_item_repo,
        };

        let result = function_handler(&deps, request_with_id("missing")).await;

        let data = result.unwrap().into_response().await;
        assert_eq!(data.status(), 404);
        assert_eq!(data.body().as_ref(), b"Item with id 'missing' not found");
    }

    #[tokio::test]
    async fn when_database_errors_should_return_500() {
        let mut mock_item_repo = MockItemRepository::default();
        mock_item_repo
            .expect_get_item()
            .times(1)
            .returning(|_id| Err(RepositoryError::Read("throttled".to_string())));
        let deps = HandlerDeps {
            item_repo: mock_item_repo,
        };

        let result = function_handler(&deps, request_with_id("abc")).await;

        let data = result.unwrap().into_response().await;
        assert_eq!(data.status(), 500);
        assert_eq!(data.body().as_ref(), b"Internal server error");
    }

    #[tokio::test]
    async fn when_item_malformed_should_return_500() {
        let mut mock_item_repo = MockItemRepository::default();
        mock_item_repo
            .expect_get_item()
            .times(1)
            .returning(|_id| Err(RepositoryError::Unmarshal("id not found".to_string())));
        let deps = HandlerDeps {
            item_repo: mock_item_repo,
        };

        let result = function_handler(&deps, request_with_id("abc")).await;

        let data = result.unwrap().into_response().await;
        assert_eq!(data.status(), 500);
        assert_eq!(data.body().as_ref(), b"Error unmarshalling DynamoDB data");
    }
}
