use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::construct::ConstructPath;
use crate::error::{InfraError, Result};
use crate::lambda::Function;
use crate::stack::Stack;
use crate::template::CfnResource;
use crate::token::{pseudo, Token};

pub const HTTP_METHODS: &[&str] = &["ANY", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];

#[derive(Debug, Clone)]
pub struct RestApiProps {
    /// Name shown in the console, defaults to the construct id.
    pub rest_api_name: Option<String>,
    pub description: Option<String>,
    pub stage_name: String,
}

impl Default for RestApiProps {
    fn default() -> Self {
        Self {
            rest_api_name: None,
            description: None,
            stage_name: "prod".to_string(),
        }
    }
}

/// Identifiers shared by every resource of one API.
#[derive(Debug, Clone)]
struct ApiRef {
    logical_id: String,
    deployment_id: String,
    stage_id: String,
}

impl ApiRef {
    fn rest_api_id(&self) -> Token {
        Token::reference(&self.logical_id)
    }
}

#[derive(Debug, Clone)]
pub struct RestApi {
    path: ConstructPath,
    api: ApiRef,
    stage_name: String,
    root: ApiResource,
}

impl RestApi {
    pub fn new(stack: &mut Stack, id: &str, props: RestApiProps) -> Result<Self> {
        let path = stack.add_node(None, id)?;
        let logical_id = path.logical_id();

        let mut properties = json!({
            "Name": props.rest_api_name.as_deref().unwrap_or(id),
        });
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }
        stack.add_resource(
            logical_id.clone(),
            CfnResource::new("AWS::ApiGateway::RestApi", properties)?.mark_taggable(),
        )?;

        let deployment_path = stack.add_node(Some(&path), "Deployment")?;
        let deployment_id = deployment_path.child("Resource")?.logical_id();
        stack.add_resource(
            deployment_id.clone(),
            CfnResource::new(
                "AWS::ApiGateway::Deployment",
                json!({
                    "RestApiId": Token::reference(&logical_id),
                    "Description": "Automatically created by the RestApi construct",
                }),
            )?
            .with_content_hashed_id(),
        )?;

        let stage_path = stack.add_node(Some(&path), "DeploymentStage")?;
        let stage_id = stage_path.child(&props.stage_name)?.logical_id();
        stack.add_resource(
            stage_id.clone(),
            CfnResource::new(
                "AWS::ApiGateway::Stage",
                json!({
                    "RestApiId": Token::reference(&logical_id),
                    "DeploymentId": Token::reference(&deployment_id),
                    "StageName": props.stage_name,
                }),
            )?
            .mark_taggable(),
        )?;

        let api = ApiRef {
            logical_id,
            deployment_id,
            stage_id,
        };
        let root = ApiResource {
            path: stack.add_node(Some(&path), "Default")?,
            logical_id: None,
            resource_path: "/".to_string(),
            api: api.clone(),
        };

        let rest_api = Self {
            path,
            api,
            stage_name: props.stage_name,
            root,
        };
        let output_id = rest_api.path.child("Endpoint")?.logical_id();
        stack.add_output(output_id, &rest_api.url(), None)?;

        Ok(rest_api)
    }

    pub fn logical_id(&self) -> &str {
        &self.api.logical_id
    }

    /// Declared id of the deployment. The template id carries a hash of
    /// the deployed methods on top of it.
    pub fn deployment_logical_id(&self) -> &str {
        &self.api.deployment_id
    }

    pub fn stage_logical_id(&self) -> &str {
        &self.api.stage_id
    }

    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// The `/` resource.
    pub fn root(&self) -> &ApiResource {
        &self.root
    }

    /// `https://<api>.execute-api.<region>.<suffix>/<stage>/`
    pub fn url(&self) -> Token {
        Token::join(
            "",
            vec![
                "https://".into(),
                self.api.rest_api_id(),
                ".execute-api.".into(),
                pseudo::region(),
                ".".into(),
                pseudo::url_suffix(),
                "/".into(),
                Token::reference(&self.api.stage_id),
                "/".into(),
            ],
        )
    }
}

/// A node of the API's resource tree.
#[derive(Debug, Clone)]
pub struct ApiResource {
    path: ConstructPath,
    logical_id: Option<String>,
    resource_path: String,
    api: ApiRef,
}

impl ApiResource {
    /// Full request path, e.g. `/items/{id}`.
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn logical_id(&self) -> Option<&str> {
        self.logical_id.as_deref()
    }

    fn resource_id(&self) -> Token {
        match &self.logical_id {
            Some(id) => Token::reference(id),
            None => Token::get_att(&self.api.logical_id, "RootResourceId"),
        }
    }

    pub fn add_resource(&self, stack: &mut Stack, path_part: &str) -> Result<ApiResource> {
        validate_path_part(path_part)?;
        let path = stack.add_node(Some(&self.path), path_part)?;
        let logical_id = path.logical_id();

        stack.add_resource(
            logical_id.clone(),
            CfnResource::new(
                "AWS::ApiGateway::Resource",
                json!({
                    "ParentId": self.resource_id(),
                    "PathPart": path_part,
                    "RestApiId": self.api.rest_api_id(),
                }),
            )?,
        )?;

        let resource_path = if self.resource_path == "/" {
            format!("/{}", path_part)
        } else {
            format!("{}/{}", self.resource_path, path_part)
        };
        Ok(ApiResource {
            path,
            logical_id: Some(logical_id),
            resource_path,
            api: self.api.clone(),
        })
    }

    /// Binds `http_method` on this resource to a Lambda proxy integration
    /// and allows API Gateway to invoke the function.
    pub fn add_method(
        &self,
        stack: &mut Stack,
        http_method: &str,
        integration: LambdaIntegration,
    ) -> Result<Method> {
        let http_method = http_method.to_ascii_uppercase();
        if !HTTP_METHODS.contains(&http_method.as_str()) {
            return Err(InfraError::InvalidHttpMethod(http_method));
        }
        if stack.has_node(&self.path.child(&http_method)?) {
            return Err(InfraError::DuplicateMethod {
                method: http_method,
                path: self.resource_path.clone(),
            });
        }

        let path = stack.add_node(Some(&self.path), &http_method)?;
        let logical_id = path.logical_id();

        stack.add_resource(
            logical_id.clone(),
            CfnResource::new(
                "AWS::ApiGateway::Method",
                json!({
                    "HttpMethod": http_method,
                    "ResourceId": self.resource_id(),
                    "RestApiId": self.api.rest_api_id(),
                    "AuthorizationType": "NONE",
                    "Integration": {
                        "IntegrationHttpMethod": "POST",
                        "Type": "AWS_PROXY",
                        "Uri": integration.uri(),
                    },
                }),
            )?,
        )?;

        let stage = Token::reference(&self.api.stage_id);
        for (id, stage) in [("ApiPermission", stage), ("ApiPermission.Test", "test-invoke-stage".into())] {
            let permission_id = stack.add_node(Some(&path), id)?.logical_id();
            stack.add_resource(
                permission_id,
                CfnResource::new(
                    "AWS::Lambda::Permission",
                    json!({
                        "Action": "lambda:InvokeFunction",
                        "FunctionName": integration.function_arn.clone(),
                        "Principal": "apigateway.amazonaws.com",
                        "SourceArn": self.execute_api_arn(stage, &http_method),
                    }),
                )?,
            )?;
        }

        stack
            .resource_mut(&self.api.deployment_id)?
            .depends_on
            .insert(logical_id.clone());

        tracing::debug!(method = %http_method, path = %self.resource_path, "added method");
        Ok(Method {
            logical_id,
            http_method,
            resource_path: self.resource_path.clone(),
            function_logical_id: integration.function_logical_id,
        })
    }

    /// `arn:<partition>:execute-api:<region>:<account>:<api>/<stage>/<METHOD>/<path>`
    /// with path parameters widened to `*`.
    fn execute_api_arn(&self, stage: Token, http_method: &str) -> Token {
        let method = if http_method == "ANY" { "*" } else { http_method };
        let path: String = self
            .resource_path
            .split('/')
            .map(|part| if part.starts_with('{') { "*" } else { part })
            .collect::<Vec<_>>()
            .join("/");
        Token::join(
            "",
            vec![
                "arn:".into(),
                pseudo::partition(),
                ":execute-api:".into(),
                pseudo::region(),
                ":".into(),
                pseudo::account_id(),
                ":".into(),
                self.api.rest_api_id(),
                "/".into(),
                stage,
                format!("/{}{}", method, path).into(),
            ],
        )
    }
}

fn validate_path_part(path_part: &str) -> Result<()> {
    static PATH_PART: OnceLock<Regex> = OnceLock::new();
    let pattern = PATH_PART.get_or_init(|| {
        Regex::new(r"^([a-zA-Z0-9._-]+|\{[a-zA-Z0-9._-]+\+?\})$").unwrap()
    });
    if !pattern.is_match(path_part) {
        return Err(InfraError::InvalidPathPart(path_part.to_string()));
    }
    Ok(())
}

/// Lambda proxy integration: the whole request is handed to the function.
#[derive(Debug, Clone)]
pub struct LambdaIntegration {
    function_logical_id: String,
    function_arn: Token,
}

impl LambdaIntegration {
    pub fn new(function: &Function) -> Self {
        Self {
            function_logical_id: function.logical_id().to_string(),
            function_arn: function.function_arn(),
        }
    }

    fn uri(&self) -> Token {
        Token::join(
            "",
            vec![
                "arn:".into(),
                pseudo::partition(),
                ":apigateway:".into(),
                pseudo::region(),
                ":lambda:path/2015-03-31/functions/".into(),
                self.function_arn.clone(),
                "/invocations".into(),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    logical_id: String,
    http_method: String,
    resource_path: String,
    function_logical_id: String,
}

impl Method {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn http_method(&self) -> &str {
        &self.http_method
    }

    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Function backing the integration.
    pub fn function_logical_id(&self) -> &str {
        &self.function_logical_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackProps;

    fn api(stack: &mut Stack) -> RestApi {
        RestApi::new(
            stack,
            "Api",
            RestApiProps {
                rest_api_name: Some("Test API".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn nested_resources_build_full_paths() {
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();
        let api = api(&mut stack);

        let items = api.root().add_resource(&mut stack, "items").unwrap();
        let item = items.add_resource(&mut stack, "{id}").unwrap();

        assert_eq!(items.resource_path(), "/items");
        assert_eq!(item.resource_path(), "/items/{id}");
        let items_resource = stack.resource(items.logical_id().unwrap()).unwrap();
        assert_eq!(
            items_resource.properties["ParentId"]["Fn::GetAtt"][1],
            "RootResourceId"
        );
        let item_resource = stack.resource(item.logical_id().unwrap()).unwrap();
        assert_eq!(item_resource.properties["ParentId"]["Ref"], items.logical_id().unwrap());
        assert_eq!(item_resource.properties["PathPart"], "{id}");
    }

    #[test]
    fn rejects_bad_path_parts_and_duplicates() {
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();
        let api = api(&mut stack);

        for part in ["", "a b", "{id", "items/{id}"] {
            assert!(api.root().add_resource(&mut stack, part).is_err(), "{}", part);
        }
        api.root().add_resource(&mut stack, "items").unwrap();
        assert!(matches!(
            api.root().add_resource(&mut stack, "items"),
            Err(InfraError::DuplicateConstruct { .. })
        ));
        assert!(api.root().add_resource(&mut stack, "{proxy+}").is_ok());
    }

    #[test]
    fn stage_and_endpoint_output_are_declared() {
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();
        let api = api(&mut stack);

        let stage = stack.resource(api.stage_logical_id()).unwrap();
        assert_eq!(stage.properties["StageName"], "prod");
        assert_eq!(stage.properties["DeploymentId"]["Ref"], api.deployment_logical_id());
        let template = stack.template();
        let (_, output) = template.outputs.iter().next().unwrap();
        assert_eq!(output.value["Fn::Join"][1][0], "https://");
        assert_eq!(template.resources[api.logical_id()].properties["Name"], "Test API");
    }

    #[test]
    fn execute_api_arn_widens_path_parameters() {
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();
        let api = api(&mut stack);
        let item = api
            .root()
            .add_resource(&mut stack, "items")
            .unwrap()
            .add_resource(&mut stack, "{id}")
            .unwrap();

        let arn = item.execute_api_arn("prod".into(), "GET");

        match arn {
            Token::Join { parts, .. } => {
                assert_eq!(parts.last(), Some(&Token::literal("/GET/items/*")))
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn apis_flattening_to_the_same_logical_id_are_rejected() {
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();
        RestApi::new(&mut stack, "My-Api", RestApiProps::default()).unwrap();

        let result = RestApi::new(&mut stack, "MyApi", RestApiProps::default());

        assert!(matches!(result, Err(InfraError::DuplicateLogicalId(id)) if id == "MyApi"));
        let names: Vec<_> = stack
            .template()
            .resources_of_type("AWS::ApiGateway::RestApi")
            .map(|(_, r)| r.properties["Name"].clone())
            .collect();
        assert_eq!(names, vec![json!("My-Api")]);
    }
}
