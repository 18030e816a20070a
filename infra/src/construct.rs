use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{InfraError, Result};

const HASH_LEN: usize = 8;
const MAX_LOGICAL_ID_LEN: usize = 255;

/// Path of a construct inside its stack, e.g. `MyApi/Default/items`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    pub(crate) fn new(id: &str) -> Result<Self> {
        validate_id(id)?;
        Ok(Self(vec![id.to_string()]))
    }

    pub(crate) fn child(&self, id: &str) -> Result<Self> {
        validate_id(id)?;
        let mut components = self.0.clone();
        components.push(id.to_string());
        Ok(Self(components))
    }

    /// Id of the construct itself, the last path component.
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<ConstructPath> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// Stable CloudFormation logical id for this path.
    ///
    /// Top-level constructs keep their id. Nested ones get a readable prefix
    /// built from the alphanumeric characters of each component (`Default`
    /// and `Resource` are dropped) followed by 8 hex characters of the
    /// SHA-256 of the full path, so two paths never collide.
    pub fn logical_id(&self) -> String {
        if self.0.len() == 1 {
            return alphanumeric(&self.0[0]);
        }

        let hash = short_hash(&self.to_string());
        let human: String = self
            .0
            .iter()
            .filter(|c| c.as_str() != "Default" && c.as_str() != "Resource")
            .map(|c| alphanumeric(c))
            .collect();
        let human: String = human.chars().take(MAX_LOGICAL_ID_LEN - HASH_LEN).collect();

        format!("{}{}", human, hash)
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// First 8 upper-case hex characters of the SHA-256 of `input`.
pub(crate) fn short_hash(input: &str) -> String {
    let mut hash = hex::encode_upper(Sha256::digest(input.as_bytes()));
    hash.truncate(HASH_LEN);
    hash
}

fn alphanumeric(component: &str) -> String {
    component.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') {
        return Err(InfraError::InvalidConstructId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_construct_keeps_its_id() {
        let path = ConstructPath::new("MyTable").unwrap();

        assert_eq!(path.logical_id(), "MyTable");
    }

    #[test]
    fn nested_construct_gets_hashed_suffix() {
        let path = ConstructPath::new("MyTable")
            .unwrap()
            .child("Resource")
            .unwrap();

        let logical_id = path.logical_id();

        assert!(logical_id.starts_with("MyTable"));
        assert_eq!(logical_id.len(), "MyTable".len() + 8);
        assert!(logical_id[7..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn logical_id_is_stable_and_distinct() {
        let a = ConstructPath::new("MyApi").unwrap().child("Default").unwrap();
        let items = a.child("items").unwrap();
        let param = items.child("{id}").unwrap();

        assert_eq!(items.logical_id(), items.clone().logical_id());
        assert!(param.logical_id().starts_with("MyApiitemsid"));
        assert_ne!(items.logical_id(), param.logical_id());
    }

    #[test]
    fn rejects_ids_with_separator() {
        assert!(matches!(
            ConstructPath::new("a/b"),
            Err(InfraError::InvalidConstructId(_))
        ));
        assert!(ConstructPath::new("").is_err());
    }

    #[test]
    fn displays_as_slash_separated_path() {
        let path = ConstructPath::new("MyApi").unwrap().child("Default").unwrap();

        assert_eq!(path.to_string(), "MyApi/Default");
        assert_eq!(path.id(), "Default");
        assert_eq!(path.parent().unwrap().to_string(), "MyApi");
    }
}
