use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::apigateway::{LambdaIntegration, Method, RestApi, RestApiProps};
use crate::dynamodb::{Attribute, AttributeType, BillingMode, Table, TableProps};
use crate::error::Result;
use crate::iam::Grant;
use crate::lambda::{Code, Function, FunctionProps, Runtime};
use crate::stack::{App, Stack, StackProps};
use crate::template::RemovalPolicy;

pub const TABLE_NAME: &str = "items";
pub const PARTITION_KEY: &str = "id";
pub const TABLE_NAME_ENV: &str = "TABLE_NAME";
pub const API_NAME: &str = "My API";

/// Archive produced by packaging the `get_item` lambda.
pub fn default_asset_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../lambdas/get_item/function.zip")
}

/// The items service: a table, a function that reads from it and a REST
/// endpoint `GET /items/{id}` in front of the function.
#[derive(Debug)]
pub struct ItemsStack {
    id: String,
    table: Table,
    function: Function,
    read_grant: Grant,
    api: RestApi,
    get_item: Method,
}

impl ItemsStack {
    pub fn new(app: &mut App, id: &str, props: Option<StackProps>) -> Result<Self> {
        Self::with_asset_path(app, id, props, default_asset_path())
    }

    pub fn with_asset_path(
        app: &mut App,
        id: &str,
        props: Option<StackProps>,
        asset_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let mut stack = Stack::new(id, props.unwrap_or_default())?;

        let table = Table::new(
            &mut stack,
            "MyTable",
            TableProps {
                table_name: Some(TABLE_NAME.to_string()),
                partition_key: Attribute::new(PARTITION_KEY, AttributeType::String),
                sort_key: None,
                billing_mode: BillingMode::PayPerRequest,
                removal_policy: RemovalPolicy::Destroy,
            },
        )?;

        let function = Function::new(
            &mut stack,
            "GetItemFunction",
            FunctionProps {
                runtime: Runtime::ProvidedAl2,
                handler: "main".to_string(),
                code: Code::from_asset(asset_path)?,
                environment: BTreeMap::from([(TABLE_NAME_ENV.to_string(), table.table_name())]),
                memory_size: None,
                timeout_seconds: None,
                description: None,
            },
        )?;

        let read_grant = table.grant_read_data(&mut stack, &function)?;

        let api = RestApi::new(
            &mut stack,
            "MyApi",
            RestApiProps {
                rest_api_name: Some(API_NAME.to_string()),
                ..Default::default()
            },
        )?;
        let items = api.root().add_resource(&mut stack, "items")?;
        let item = items.add_resource(&mut stack, "{id}")?;
        let get_item = item.add_method(&mut stack, "GET", LambdaIntegration::new(&function))?;

        tracing::info!(stack = %stack.stack_name(), "declared items stack");
        app.add_stack(stack)?;

        Ok(Self {
            id: id.to_string(),
            table,
            function,
            read_grant,
            api,
            get_item,
        })
    }

    pub fn stack<'a>(&self, app: &'a App) -> Option<&'a Stack> {
        app.stack(&self.id)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn read_grant(&self) -> &Grant {
        &self.read_grant
    }

    pub fn api(&self) -> &RestApi {
        &self.api
    }

    pub fn get_item_method(&self) -> &Method {
        &self.get_item
    }
}
