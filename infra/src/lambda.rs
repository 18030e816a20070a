use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::assets::FileAsset;
use crate::construct::ConstructPath;
use crate::error::Result;
use crate::iam::{Grantable, Role, LAMBDA_BASIC_EXECUTION};
use crate::stack::Stack;
use crate::template::CfnResource;
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    /// Custom runtime on Amazon Linux 2.
    ProvidedAl2,
    ProvidedAl2023,
    Other(String),
}

impl Runtime {
    pub fn name(&self) -> &str {
        match self {
            Runtime::ProvidedAl2 => "provided.al2",
            Runtime::ProvidedAl2023 => "provided.al2023",
            Runtime::Other(name) => name,
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deployment package of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    asset: FileAsset,
}

impl Code {
    /// Zip archive on the local disk. Fails when the archive does not exist.
    pub fn from_asset(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            asset: FileAsset::from_path(path)?,
        })
    }

    pub fn asset(&self) -> &FileAsset {
        &self.asset
    }
}

#[derive(Debug, Clone)]
pub struct FunctionProps {
    pub runtime: Runtime,
    /// Executable inside the archive.
    pub handler: String,
    pub code: Code,
    pub environment: BTreeMap<String, Token>,
    pub memory_size: Option<u32>,
    pub timeout_seconds: Option<u32>,
    pub description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CfnCode {
    s3_bucket: Token,
    s3_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CfnEnvironment<'a> {
    variables: &'a BTreeMap<String, Token>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CfnFunctionProperties<'a> {
    code: CfnCode,
    role: Token,
    handler: &'a str,
    runtime: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<CfnEnvironment<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Function {
    path: ConstructPath,
    logical_id: String,
    role: Role,
    runtime: Runtime,
    handler: String,
    environment: BTreeMap<String, Token>,
}

impl Function {
    pub fn new(stack: &mut Stack, id: &str, props: FunctionProps) -> Result<Self> {
        let path = stack.add_node(None, id)?;
        let logical_id = path.child("Resource")?.logical_id();
        let role = Role::for_service(
            stack,
            Some(&path),
            "ServiceRole",
            "lambda.amazonaws.com",
            &[LAMBDA_BASIC_EXECUTION],
        )?;

        let asset = props.code.asset();
        let properties = CfnFunctionProperties {
            code: CfnCode {
                s3_bucket: asset.bucket_name(),
                s3_key: asset.object_key(),
            },
            role: role.role_arn(),
            handler: &props.handler,
            runtime: props.runtime.name(),
            environment: (!props.environment.is_empty()).then_some(CfnEnvironment {
                variables: &props.environment,
            }),
            memory_size: props.memory_size,
            timeout: props.timeout_seconds,
            description: props.description.as_deref(),
        };

        let resource = CfnResource::new("AWS::Lambda::Function", properties)?
            .mark_taggable()
            .with_dependency(role.logical_id());
        stack.add_resource(logical_id.clone(), resource)?;
        stack.add_asset(props.code.asset().clone());

        Ok(Self {
            path,
            logical_id,
            role,
            runtime: props.runtime,
            handler: props.handler,
            environment: props.environment,
        })
    }

    pub fn node_path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn function_name(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn function_arn(&self) -> Token {
        Token::get_att(&self.logical_id, "Arn")
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn environment(&self) -> &BTreeMap<String, Token> {
        &self.environment
    }
}

impl Grantable for Function {
    fn grant_principal(&self) -> &Role {
        &self.role
    }

    fn dependent_logical_id(&self) -> Option<&str> {
        Some(&self.logical_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackProps;
    use std::fs;

    #[test]
    fn function_points_at_staged_asset_and_role() {
        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("function.zip");
        fs::write(&zip, b"PK\x03\x04").unwrap();
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();

        let function = Function::new(
            &mut stack,
            "Fn",
            FunctionProps {
                runtime: Runtime::ProvidedAl2,
                handler: "main".to_string(),
                code: Code::from_asset(&zip).unwrap(),
                environment: BTreeMap::from([("STAGE".to_string(), Token::literal("prod"))]),
                memory_size: Some(128),
                timeout_seconds: None,
                description: None,
            },
        )
        .unwrap();

        let resource = stack.resource(function.logical_id()).unwrap();
        let asset = stack.assets().next().unwrap();
        assert_eq!(resource.properties["Runtime"], "provided.al2");
        assert_eq!(resource.properties["Handler"], "main");
        assert_eq!(resource.properties["MemorySize"], 128);
        assert_eq!(resource.properties["Code"]["S3Key"], asset.object_key());
        assert_eq!(
            resource.properties["Code"]["S3Bucket"]["Fn::Sub"],
            crate::assets::ASSET_BUCKET
        );
        assert_eq!(resource.properties["Environment"]["Variables"]["STAGE"], "prod");
        assert_eq!(
            resource.properties["Role"]["Fn::GetAtt"][0],
            function.role().logical_id()
        );
        assert!(resource.depends_on.contains(function.role().logical_id()));
        assert!(resource.property("Timeout").is_none());
    }

    #[test]
    fn missing_archive_fails_declaration() {
        let dir = tempfile::tempdir().unwrap();

        let result = Code::from_asset(dir.path().join("function.zip"));

        assert!(matches!(
            result,
            Err(crate::error::InfraError::AssetNotFound(_))
        ));
    }
}
