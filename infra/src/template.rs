use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// What happens to a resource when it is removed from the stack or the
/// stack is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    #[serde(rename = "Delete")]
    Destroy,
    Retain,
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
    #[serde(skip)]
    pub(crate) taggable: bool,
    #[serde(skip)]
    pub(crate) content_hashed_id: bool,
}

impl CfnResource {
    pub fn new(resource_type: &str, properties: impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            resource_type: resource_type.to_string(),
            properties: serde_json::to_value(properties)?,
            depends_on: BTreeSet::new(),
            deletion_policy: None,
            update_replace_policy: None,
            taggable: false,
            content_hashed_id: false,
        })
    }

    pub(crate) fn mark_taggable(mut self) -> Self {
        self.taggable = true;
        self
    }

    /// The rendered logical id gets a hash of this resource and of every
    /// resource it depends on, so any change to them replaces it.
    pub(crate) fn with_content_hashed_id(mut self) -> Self {
        self.content_hashed_id = true;
        self
    }

    pub(crate) fn with_dependency(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.insert(logical_id.into());
        self
    }

    pub(crate) fn apply_removal_policy(&mut self, policy: RemovalPolicy) {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
    }

    /// Looks up a property by its top-level name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: BTreeMap<String, CfnResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a CfnResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn destroy_policy_serializes_as_delete() {
        let mut resource = CfnResource::new("AWS::DynamoDB::Table", json!({})).unwrap();
        resource.apply_removal_policy(RemovalPolicy::Destroy);

        let value = serde_json::to_value(&resource).unwrap();

        assert_eq!(value["DeletionPolicy"], "Delete");
        assert_eq!(value["UpdateReplacePolicy"], "Delete");
    }

    #[test]
    fn empty_fields_are_omitted() {
        let template = Template {
            format_version: FORMAT_VERSION.to_string(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        };

        let value = serde_json::to_value(&template).unwrap();

        assert_eq!(
            value,
            json!({"AWSTemplateFormatVersion": "2010-09-09", "Resources": {}})
        );
    }

    #[test]
    fn template_reads_back_from_json() {
        let raw = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "MyTable": {
                    "Type": "AWS::DynamoDB::Table",
                    "Properties": {"TableName": "items"},
                    "DeletionPolicy": "Retain"
                }
            }
        });

        let template: Template = serde_json::from_value(raw).unwrap();

        let (id, table) = template
            .resources_of_type("AWS::DynamoDB::Table")
            .next()
            .unwrap();
        assert_eq!(id, "MyTable");
        assert_eq!(table.deletion_policy, Some(RemovalPolicy::Retain));
        assert_eq!(table.property("TableName").unwrap(), "items");
    }
}
