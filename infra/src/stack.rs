use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::assembly::{self, CloudAssembly};
use crate::assets::FileAsset;
use crate::construct::{short_hash, ConstructPath};
use crate::error::{InfraError, Result};
use crate::template::{CfnResource, Output, Template, FORMAT_VERSION};
use crate::token::Token;

const MAX_STACK_NAME_LEN: usize = 128;

/// Target account and region. Unset fields deploy to whatever the
/// deploying credentials point at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    /// `aws://<account>/<region>` as written into the assembly manifest.
    pub fn uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackProps {
    pub env: Option<Environment>,
    /// Physical stack name, defaults to the construct id.
    pub stack_name: Option<String>,
    pub description: Option<String>,
    /// Applied to every taggable resource in the stack.
    pub tags: BTreeMap<String, String>,
    pub termination_protection: bool,
}

/// A deployable unit: the resources, outputs and file assets of one
/// CloudFormation stack.
#[derive(Debug)]
pub struct Stack {
    id: String,
    stack_name: String,
    props: StackProps,
    nodes: BTreeSet<ConstructPath>,
    resources: BTreeMap<String, CfnResource>,
    outputs: BTreeMap<String, Output>,
    assets: BTreeMap<String, FileAsset>,
}

impl Stack {
    pub fn new(id: &str, props: StackProps) -> Result<Self> {
        ConstructPath::new(id)?;
        let stack_name = props.stack_name.clone().unwrap_or_else(|| id.to_string());
        validate_stack_name(&stack_name)?;

        Ok(Self {
            id: id.to_string(),
            stack_name,
            props,
            nodes: BTreeSet::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            assets: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn environment(&self) -> Environment {
        self.props.env.clone().unwrap_or_default()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.props.tags
    }

    pub fn termination_protection(&self) -> bool {
        self.props.termination_protection
    }

    /// Registers a construct under `scope` (or the stack root) and returns
    /// its path. Ids must be unique among siblings.
    pub(crate) fn add_node(&mut self, scope: Option<&ConstructPath>, id: &str) -> Result<ConstructPath> {
        let path = match scope {
            Some(scope) => scope.child(id)?,
            None => ConstructPath::new(id)?,
        };
        if !self.nodes.insert(path.clone()) {
            return Err(InfraError::DuplicateConstruct {
                scope: scope.map_or_else(|| self.id.clone(), |s| format!("{}/{}", self.id, s)),
                id: id.to_string(),
            });
        }
        Ok(path)
    }

    pub(crate) fn has_node(&self, path: &ConstructPath) -> bool {
        self.nodes.contains(path)
    }

    /// Adds a resource under `logical_id`. Distinct construct paths can
    /// still flatten to the same logical id (`My-Api` and `MyApi`), which
    /// is rejected here.
    pub(crate) fn add_resource(&mut self, logical_id: String, resource: CfnResource) -> Result<()> {
        if self.resources.contains_key(&logical_id) {
            return Err(InfraError::DuplicateLogicalId(logical_id));
        }
        tracing::debug!(logical_id = %logical_id, resource_type = %resource.resource_type, "declared resource");
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources.get(logical_id)
    }

    pub(crate) fn resource_mut(&mut self, logical_id: &str) -> Result<&mut CfnResource> {
        self.resources
            .get_mut(logical_id)
            .ok_or_else(|| InfraError::UnknownResource(logical_id.to_string()))
    }

    pub(crate) fn add_output(&mut self, logical_id: String, value: &Token, description: Option<String>) -> Result<()> {
        if self.outputs.contains_key(&logical_id) {
            return Err(InfraError::DuplicateLogicalId(logical_id));
        }
        let value = serde_json::to_value(value)?;
        self.outputs.insert(logical_id, Output { description, value });
        Ok(())
    }

    pub(crate) fn add_asset(&mut self, asset: FileAsset) {
        self.assets.insert(asset.hash().to_string(), asset);
    }

    pub fn assets(&self) -> impl Iterator<Item = &FileAsset> {
        self.assets.values()
    }

    /// Logical ids of content-hashed resources as they appear in the
    /// template.
    fn hashed_logical_ids(&self) -> BTreeMap<String, String> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.content_hashed_id)
            .map(|(logical_id, resource)| {
                let mut content = resource.properties.to_string();
                for dependency in &resource.depends_on {
                    content.push_str(dependency);
                    if let Some(dependency) = self.resources.get(dependency) {
                        content.push_str(&dependency.properties.to_string());
                    }
                }
                (logical_id.clone(), format!("{}{}", logical_id, short_hash(&content)))
            })
            .collect()
    }

    /// Renders the stack as a CloudFormation template, applying stack tags
    /// to every taggable resource and hashing content-hashed logical ids.
    pub fn template(&self) -> Template {
        let renames = self.hashed_logical_ids();
        let tags: Vec<Value> = self
            .props
            .tags
            .iter()
            .map(|(key, value)| json!({"Key": key, "Value": value}))
            .collect();

        let resources = self
            .resources
            .iter()
            .map(|(logical_id, resource)| {
                let mut resource = resource.clone();
                if resource.taggable && !tags.is_empty() {
                    if let Value::Object(properties) = &mut resource.properties {
                        properties.insert("Tags".to_string(), Value::Array(tags.clone()));
                    }
                }
                rename_references(&mut resource.properties, &renames);
                resource.depends_on = resource
                    .depends_on
                    .into_iter()
                    .map(|id| renames.get(&id).cloned().unwrap_or(id))
                    .collect();
                let logical_id = renames.get(logical_id).unwrap_or(logical_id);
                (logical_id.clone(), resource)
            })
            .collect();

        let mut outputs = self.outputs.clone();
        for output in outputs.values_mut() {
            rename_references(&mut output.value, &renames);
        }

        Template {
            format_version: FORMAT_VERSION.to_string(),
            description: self.props.description.clone(),
            resources,
            outputs,
        }
    }
}

/// Points `Ref` and `Fn::GetAtt` at renamed logical ids.
fn rename_references(value: &mut Value, renames: &BTreeMap<String, String>) {
    if renames.is_empty() {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get_mut("Ref") {
                if let Some(renamed) = renames.get(target.as_str()) {
                    *target = renamed.clone();
                }
            }
            if let Some(Value::Array(att)) = map.get_mut("Fn::GetAtt") {
                if let Some(Value::String(target)) = att.first_mut() {
                    if let Some(renamed) = renames.get(target.as_str()) {
                        *target = renamed.clone();
                    }
                }
            }
            for nested in map.values_mut() {
                rename_references(nested, renames);
            }
        }
        Value::Array(items) => {
            for nested in items {
                rename_references(nested, renames);
            }
        }
        _ => {}
    }
}

fn validate_stack_name(name: &str) -> Result<()> {
    static STACK_NAME: OnceLock<Regex> = OnceLock::new();
    let pattern = STACK_NAME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").unwrap());
    if name.len() > MAX_STACK_NAME_LEN || !pattern.is_match(name) {
        return Err(InfraError::InvalidStackName(name.to_string()));
    }
    Ok(())
}

/// Root of the construct tree. Holds every stack that gets synthesized.
#[derive(Debug, Default)]
pub struct App {
    stacks: BTreeMap<String, Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<&Stack> {
        if self.stacks.contains_key(stack.id()) {
            return Err(InfraError::DuplicateStack(stack.id().to_string()));
        }
        let id = stack.id().to_string();
        Ok(self.stacks.entry(id).or_insert(stack))
    }

    pub fn stack(&self, id: &str) -> Option<&Stack> {
        self.stacks.get(id)
    }

    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    /// Writes templates, manifests and staged assets to `out_dir`.
    pub fn synth(&self, out_dir: &Path) -> Result<CloudAssembly> {
        assembly::write(self, out_dir)
    }
}
