use serde::Serialize;
use serde_json::{json, Value};

use crate::construct::ConstructPath;
use crate::error::Result;
use crate::stack::Stack;
use crate::template::CfnResource;
use crate::token::{pseudo, Token};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const LAMBDA_BASIC_EXECUTION: &str = "service-role/AWSLambdaBasicExecutionRole";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    pub action: Vec<String>,
    pub resource: Vec<Token>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Token>) -> Self {
        Self {
            effect: Effect::Allow,
            action: actions.iter().map(|a| a.to_string()).collect(),
            resource: resources,
        }
    }
}

/// `arn:${Partition}:iam::aws:policy/<name>`
pub fn managed_policy_arn(name: &str) -> Token {
    Token::join(
        "",
        vec![
            "arn:".into(),
            pseudo::partition(),
            format!(":iam::aws:policy/{}", name).into(),
        ],
    )
}

/// Execution role assumed by a service principal.
#[derive(Debug, Clone)]
pub struct Role {
    path: ConstructPath,
    logical_id: String,
}

impl Role {
    pub fn for_service(
        stack: &mut Stack,
        scope: Option<&ConstructPath>,
        id: &str,
        service: &str,
        managed_policies: &[&str],
    ) -> Result<Self> {
        let path = stack.add_node(scope, id)?;
        let logical_id = path.child("Resource")?.logical_id();

        let properties = json!({
            "AssumeRolePolicyDocument": {
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": {"Service": service},
                }],
                "Version": POLICY_VERSION,
            },
            "ManagedPolicyArns": managed_policies
                .iter()
                .map(|p| managed_policy_arn(p))
                .collect::<Vec<_>>(),
        });
        let resource = CfnResource::new("AWS::IAM::Role", properties)?.mark_taggable();
        stack.add_resource(logical_id.clone(), resource)?;

        Ok(Self { path, logical_id })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn role_arn(&self) -> Token {
        Token::get_att(&self.logical_id, "Arn")
    }

    fn default_policy_path(&self) -> Result<ConstructPath> {
        self.path.child("DefaultPolicy")
    }

    /// Appends a statement to the role's inline default policy, creating the
    /// policy on first use. Returns the policy's logical id.
    pub fn add_to_principal_policy(&self, stack: &mut Stack, statement: PolicyStatement) -> Result<String> {
        let policy_path = self.default_policy_path()?;
        let logical_id = policy_path.child("Resource")?.logical_id();
        let statement = serde_json::to_value(&statement)?;

        if !stack.has_node(&policy_path) {
            stack.add_node(Some(&self.path), "DefaultPolicy")?;
            let properties = json!({
                "PolicyDocument": {
                    "Statement": [],
                    "Version": POLICY_VERSION,
                },
                "PolicyName": logical_id,
                "Roles": [Token::reference(&self.logical_id)],
            });
            stack.add_resource(logical_id.clone(), CfnResource::new("AWS::IAM::Policy", properties)?)?;
        }

        let policy = stack.resource_mut(&logical_id)?;
        if let Some(Value::Array(statements)) = policy.properties.pointer_mut("/PolicyDocument/Statement") {
            statements.push(statement);
        }
        Ok(logical_id)
    }
}

/// Something that can receive permissions, such as a function.
pub trait Grantable {
    fn grant_principal(&self) -> &Role;

    /// Resource that must wait for granted permissions before it is created.
    fn dependent_logical_id(&self) -> Option<&str> {
        None
    }
}

impl Grantable for Role {
    fn grant_principal(&self) -> &Role {
        self
    }
}

/// A permission that was added to a principal's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    principal: String,
    policy: String,
    statement: PolicyStatement,
}

impl Grant {
    pub fn add_to_principal(
        stack: &mut Stack,
        grantee: &impl Grantable,
        actions: &[&str],
        resources: Vec<Token>,
    ) -> Result<Self> {
        let role = grantee.grant_principal();
        let statement = PolicyStatement::allow(actions, resources);
        let policy = role.add_to_principal_policy(stack, statement.clone())?;

        if let Some(dependent) = grantee.dependent_logical_id() {
            stack.resource_mut(dependent)?.depends_on.insert(policy.clone());
        }

        Ok(Self {
            principal: role.logical_id().to_string(),
            policy,
            statement,
        })
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    pub fn actions(&self) -> &[String] {
        &self.statement.action
    }

    pub fn resources(&self) -> &[Token] {
        &self.statement.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackProps;

    #[test]
    fn role_trusts_the_service_principal() {
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();

        let role = Role::for_service(
            &mut stack,
            None,
            "ServiceRole",
            "lambda.amazonaws.com",
            &[LAMBDA_BASIC_EXECUTION],
        )
        .unwrap();

        let resource = stack.resource(role.logical_id()).unwrap();
        assert_eq!(resource.resource_type, "AWS::IAM::Role");
        assert_eq!(
            resource.properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            "lambda.amazonaws.com"
        );
        assert_eq!(
            resource.properties["ManagedPolicyArns"][0]["Fn::Join"][1][2],
            ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
        );
    }

    #[test]
    fn grants_share_one_default_policy() {
        let mut stack = Stack::new("TestStack", StackProps::default()).unwrap();
        let role = Role::for_service(&mut stack, None, "Role", "lambda.amazonaws.com", &[]).unwrap();

        let first = Grant::add_to_principal(&mut stack, &role, &["s3:GetObject"], vec!["*".into()]).unwrap();
        let second =
            Grant::add_to_principal(&mut stack, &role, &["sqs:ReceiveMessage"], vec!["*".into()]).unwrap();

        assert_eq!(first.policy(), second.policy());
        assert_eq!(first.principal(), role.logical_id());
        let policy = stack.resource(first.policy()).unwrap();
        assert_eq!(policy.resource_type, "AWS::IAM::Policy");
        let statements = policy.properties["PolicyDocument"]["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1]["Action"][0], "sqs:ReceiveMessage");
        assert_eq!(policy.properties["Roles"][0]["Ref"], role.logical_id());
    }
}
