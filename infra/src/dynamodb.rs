use serde::Serialize;

use crate::construct::ConstructPath;
use crate::error::Result;
use crate::iam::{Grant, Grantable};
use crate::stack::Stack;
use crate::template::{CfnResource, RemovalPolicy};
use crate::token::Token;

/// Data-plane actions needed to read items. No writes, no deletes.
pub const READ_DATA_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttributeType {
    #[serde(rename = "S")]
    String,
    #[serde(rename = "N")]
    Number,
    #[serde(rename = "B")]
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl Attribute {
    pub fn new(name: &str, attribute_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attribute_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
    Provisioned { read_capacity: u32, write_capacity: u32 },
}

#[derive(Debug, Clone)]
pub struct TableProps {
    pub table_name: Option<String>,
    pub partition_key: Attribute,
    pub sort_key: Option<Attribute>,
    pub billing_mode: BillingMode,
    pub removal_policy: RemovalPolicy,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct KeySchemaElement<'a> {
    attribute_name: &'a str,
    key_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeDefinition<'a> {
    attribute_name: &'a str,
    attribute_type: AttributeType,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ProvisionedThroughput {
    read_capacity_units: u32,
    write_capacity_units: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CfnTableProperties<'a> {
    key_schema: Vec<KeySchemaElement<'a>>,
    attribute_definitions: Vec<AttributeDefinition<'a>>,
    billing_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    provisioned_throughput: Option<ProvisionedThroughput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    table_name: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Table {
    path: ConstructPath,
    logical_id: String,
    partition_key: Attribute,
    sort_key: Option<Attribute>,
    billing_mode: BillingMode,
    removal_policy: RemovalPolicy,
}

impl Table {
    pub fn new(stack: &mut Stack, id: &str, props: TableProps) -> Result<Self> {
        let path = stack.add_node(None, id)?;
        let logical_id = path.child("Resource")?.logical_id();

        let mut key_schema = vec![KeySchemaElement {
            attribute_name: &props.partition_key.name,
            key_type: "HASH",
        }];
        let mut attribute_definitions = vec![AttributeDefinition {
            attribute_name: &props.partition_key.name,
            attribute_type: props.partition_key.attribute_type,
        }];
        if let Some(sort_key) = &props.sort_key {
            key_schema.push(KeySchemaElement {
                attribute_name: &sort_key.name,
                key_type: "RANGE",
            });
            attribute_definitions.push(AttributeDefinition {
                attribute_name: &sort_key.name,
                attribute_type: sort_key.attribute_type,
            });
        }

        let (billing_mode, provisioned_throughput) = match props.billing_mode {
            BillingMode::PayPerRequest => ("PAY_PER_REQUEST", None),
            BillingMode::Provisioned {
                read_capacity,
                write_capacity,
            } => (
                "PROVISIONED",
                Some(ProvisionedThroughput {
                    read_capacity_units: read_capacity,
                    write_capacity_units: write_capacity,
                }),
            ),
        };

        let properties = CfnTableProperties {
            key_schema,
            attribute_definitions,
            billing_mode,
            provisioned_throughput,
            table_name: props.table_name.as_deref(),
        };
        let mut resource = CfnResource::new("AWS::DynamoDB::Table", properties)?.mark_taggable();
        resource.apply_removal_policy(props.removal_policy);
        stack.add_resource(logical_id.clone(), resource)?;

        Ok(Self {
            path,
            logical_id,
            partition_key: props.partition_key,
            sort_key: props.sort_key,
            billing_mode: props.billing_mode,
            removal_policy: props.removal_policy,
        })
    }

    pub fn node_path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Physical table name, known once the stack is deployed.
    pub fn table_name(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn table_arn(&self) -> Token {
        Token::get_att(&self.logical_id, "Arn")
    }

    pub fn partition_key(&self) -> &Attribute {
        &self.partition_key
    }

    pub fn sort_key(&self) -> Option<&Attribute> {
        self.sort_key.as_ref()
    }

    pub fn billing_mode(&self) -> BillingMode {
        self.billing_mode
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal_policy
    }

    /// Lets `grantee` read items and describe the table.
    pub fn grant_read_data(&self, stack: &mut Stack, grantee: &impl Grantable) -> Result<Grant> {
        tracing::debug!(table = %self.path, "granting read access");
        Grant::add_to_principal(
            stack,
            grantee,
            READ_DATA_ACTIONS,
            vec![self.table_arn(), Token::reference("AWS::NoValue")],
        )
    }
}
