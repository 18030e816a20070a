use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A value that is either known at synthesis or resolved by CloudFormation
/// when the stack is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Ref(String),
    GetAtt { logical_id: String, attribute: String },
    Join { delimiter: String, parts: Vec<Token> },
    Sub(String),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Token::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Token::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Token>) -> Self {
        Token::Join {
            delimiter: delimiter.into(),
            parts,
        }
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Token::Sub(template.into())
    }

    /// True when the value is only known once CloudFormation deploys the stack.
    pub fn is_unresolved(&self) -> bool {
        match self {
            Token::Literal(_) => false,
            Token::Join { parts, .. } => parts.iter().any(Token::is_unresolved),
            _ => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Token::Literal(value) | Token::Ref(value) | Token::Sub(value) => value.is_empty(),
            Token::GetAtt { logical_id, .. } => logical_id.is_empty(),
            Token::Join { parts, .. } => parts.iter().all(Token::is_empty),
        }
    }

    /// Logical ids of the stack resources this value depends on. Pseudo
    /// parameters (`AWS::Region` and friends) are not resources.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Token::Ref(id) if !id.starts_with("AWS::") => vec![id.as_str()],
            Token::GetAtt { logical_id, .. } => vec![logical_id.as_str()],
            Token::Join { parts, .. } => parts.iter().flat_map(Token::references).collect(),
            _ => vec![],
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::literal(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Token::Literal(value) => serializer.serialize_str(value),
            Token::Ref(logical_id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", logical_id)?;
                map.end()
            }
            Token::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id, attribute])?;
                map.end()
            }
            Token::Join { delimiter, parts } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(delimiter, parts))?;
                map.end()
            }
            Token::Sub(template) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Sub", template)?;
                map.end()
            }
        }
    }
}

/// CloudFormation pseudo parameters.
pub mod pseudo {
    use super::Token;

    pub fn account_id() -> Token {
        Token::reference("AWS::AccountId")
    }

    pub fn region() -> Token {
        Token::reference("AWS::Region")
    }

    pub fn partition() -> Token {
        Token::reference("AWS::Partition")
    }

    pub fn url_suffix() -> Token {
        Token::reference("AWS::URLSuffix")
    }
}
