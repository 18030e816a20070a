//! Cloud assembly: the directory handed to the deploy tooling.
//!
//! Layout:
//! - `manifest.json` lists one stack artifact and one asset manifest
//!   artifact per stack, the stack depending on its assets
//! - `<stack>.template.json` is the CloudFormation template
//! - `<stack>.assets.json` says where each file asset gets published
//! - `asset.<sha256>.zip` are the staged archives

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::{FileAsset, ASSET_BUCKET, BOOTSTRAP_QUALIFIER};
use crate::error::Result;
use crate::stack::{App, Environment, Stack};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "36.0.0";
pub const STACK_ARTIFACT: &str = "aws:cloudformation:stack";
pub const ASSET_MANIFEST_ARTIFACT: &str = "cdk:asset-manifest";
/// Oldest bootstrap stack that provides the asset bucket and roles used here.
pub const REQUIRED_BOOTSTRAP_VERSION: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: BTreeMap<String, Artifact>,
}

impl Manifest {
    /// Stack artifacts keyed by stack id.
    pub fn stacks(&self) -> impl Iterator<Item = (&String, &StackProperties)> {
        self.artifacts
            .iter()
            .filter_map(|(id, artifact)| artifact.stack_properties().map(|props| (id, props)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Artifact {
    pub fn stack_properties(&self) -> Option<&StackProperties> {
        match &self.properties {
            ArtifactProperties::Stack(props) => Some(props),
            ArtifactProperties::AssetManifest(_) => None,
        }
    }

    pub fn asset_manifest_properties(&self) -> Option<&AssetManifestProperties> {
        match &self.properties {
            ArtifactProperties::AssetManifest(props) => Some(props),
            ArtifactProperties::Stack(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactProperties {
    Stack(StackProperties),
    AssetManifest(AssetManifestProperties),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProperties {
    pub template_file: String,
    pub stack_name: String,
    pub termination_protection: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    pub requires_bootstrap_stack_version: u32,
    pub bootstrap_stack_version_ssm_parameter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifestProperties {
    pub file: String,
    pub requires_bootstrap_stack_version: u32,
    pub bootstrap_stack_version_ssm_parameter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub version: String,
    pub files: BTreeMap<String, FileAssetEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAssetEntry {
    pub source: AssetSource,
    pub destinations: BTreeMap<String, AssetDestination>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSource {
    pub path: String,
    pub packaging: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDestination {
    pub bucket_name: String,
    pub object_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub assume_role_arn: String,
}

#[derive(Debug)]
pub struct CloudAssembly {
    pub directory: PathBuf,
    pub manifest: Manifest,
}

impl CloudAssembly {
    pub fn template_path(&self, stack_id: &str) -> Option<PathBuf> {
        self.manifest
            .artifacts
            .get(stack_id)
            .and_then(Artifact::stack_properties)
            .map(|props| self.directory.join(&props.template_file))
    }
}

fn bootstrap_version_parameter() -> String {
    format!("/cdk-bootstrap/{}/version", BOOTSTRAP_QUALIFIER)
}

/// Role the publisher assumes to upload into the bootstrap bucket.
fn file_publishing_role_arn() -> String {
    format!(
        "arn:${{AWS::Partition}}:iam::${{AWS::AccountId}}:role/cdk-{}-file-publishing-role-${{AWS::AccountId}}-${{AWS::Region}}",
        BOOTSTRAP_QUALIFIER
    )
}

/// `<account>-<region>` of the target, with `current_account` and
/// `current_region` standing in for whatever is unknown.
fn destination_id(env: &Environment) -> String {
    format!(
        "{}-{}",
        env.account.as_deref().unwrap_or("current_account"),
        env.region.as_deref().unwrap_or("current_region")
    )
}

fn asset_manifest(stack: &Stack) -> AssetManifest {
    let env = stack.environment();
    let files = stack
        .assets()
        .map(|asset: &FileAsset| {
            let destination = AssetDestination {
                bucket_name: ASSET_BUCKET.to_string(),
                object_key: asset.object_key(),
                region: env.region.clone(),
                assume_role_arn: file_publishing_role_arn(),
            };
            let entry = FileAssetEntry {
                source: AssetSource {
                    path: asset.staged_file_name(),
                    packaging: "file".to_string(),
                },
                destinations: BTreeMap::from([(destination_id(&env), destination)]),
            };
            (asset.hash().to_string(), entry)
        })
        .collect();

    AssetManifest {
        version: MANIFEST_VERSION.to_string(),
        files,
    }
}

pub fn write(app: &App, out_dir: &Path) -> Result<CloudAssembly> {
    fs::create_dir_all(out_dir)?;

    let mut artifacts = BTreeMap::new();
    for stack in app.stacks() {
        let template_file = format!("{}.template.json", stack.id());
        let assets_file = format!("{}.assets.json", stack.id());
        let assets_artifact = format!("{}.assets", stack.id());
        let environment = stack.environment().uri();

        fs::write(out_dir.join(&template_file), stack.template().to_json_pretty()?)?;
        fs::write(
            out_dir.join(&assets_file),
            serde_json::to_string_pretty(&asset_manifest(stack))?,
        )?;
        for asset in stack.assets() {
            asset.stage(out_dir)?;
        }

        artifacts.insert(
            assets_artifact.clone(),
            Artifact {
                artifact_type: ASSET_MANIFEST_ARTIFACT.to_string(),
                environment: environment.clone(),
                properties: ArtifactProperties::AssetManifest(AssetManifestProperties {
                    file: assets_file,
                    requires_bootstrap_stack_version: REQUIRED_BOOTSTRAP_VERSION,
                    bootstrap_stack_version_ssm_parameter: bootstrap_version_parameter(),
                }),
                dependencies: vec![],
            },
        );
        artifacts.insert(
            stack.id().to_string(),
            Artifact {
                artifact_type: STACK_ARTIFACT.to_string(),
                environment,
                properties: ArtifactProperties::Stack(StackProperties {
                    template_file,
                    stack_name: stack.stack_name().to_string(),
                    termination_protection: stack.termination_protection(),
                    tags: stack.tags().clone(),
                    requires_bootstrap_stack_version: REQUIRED_BOOTSTRAP_VERSION,
                    bootstrap_stack_version_ssm_parameter: bootstrap_version_parameter(),
                }),
                dependencies: vec![assets_artifact],
            },
        );
        tracing::info!(stack = %stack.stack_name(), dir = %out_dir.display(), "synthesized stack");
    }

    let manifest = Manifest {
        version: MANIFEST_VERSION.to_string(),
        artifacts,
    };
    fs::write(out_dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;

    Ok(CloudAssembly {
        directory: out_dir.to_path_buf(),
        manifest,
    })
}
