use crate::config::Config;
use crate::http_handler::{function_handler, HandlerDeps};
use lambda_http::{run, service_fn, tracing, Error};
use shared::adapters::DynamoDbItemRepository;

mod config;
mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();
    let env = Config::load()?;
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let dynamodb_client = aws_sdk_dynamodb::Client::new(&config);

    let item_repo = DynamoDbItemRepository::new(env.table_name, dynamodb_client);
    let deps = HandlerDeps { item_repo };

    run(service_fn(|event| function_handler(&deps, event))).await
}
