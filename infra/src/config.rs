use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::items_stack::default_asset_path;
use crate::stack::{Environment, StackProps};

pub const DEFAULT_CONFIG_FILE: &str = "infra.json";

/// Settings for synthesizing the items stack.
///
/// Sources, lowest precedence first: built-in defaults, the JSON config
/// file, `INFRA_`-prefixed environment variables. `CDK_DEFAULT_ACCOUNT` and
/// `CDK_DEFAULT_REGION` only fill in an account or region left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub stack_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "account_id")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub termination_protection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Environment values that look numeric reach us as numbers, account ids
/// are 12 digits with leading zeros preserved.
fn account_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => format!("{:012}", number),
    }))
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            stack_name: "ItemsStack".to_string(),
            account: None,
            region: None,
            description: None,
            tags: BTreeMap::new(),
            termination_protection: false,
            asset_path: None,
            output_dir: PathBuf::from("cdk.out"),
        }
    }
}

impl SynthConfig {
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(SynthConfig::default()))
            .merge(Json::file(config_file))
            .merge(Env::prefixed("INFRA_"))
            // .join only fills values that are still missing
            .join(Env::raw().only(&["CDK_DEFAULT_ACCOUNT"]).map(|_| "account".into()))
            .join(Env::raw().only(&["CDK_DEFAULT_REGION"]).map(|_| "region".into()))
    }

    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Ok(Self::figment(config_file).extract()?)
    }

    pub fn asset_path(&self) -> PathBuf {
        self.asset_path.clone().unwrap_or_else(default_asset_path)
    }

    pub fn stack_props(&self) -> StackProps {
        let env = (self.account.is_some() || self.region.is_some()).then(|| Environment {
            account: self.account.clone(),
            region: self.region.clone(),
        });

        StackProps {
            env,
            stack_name: None,
            description: self.description.clone(),
            tags: self.tags.clone(),
            termination_protection: self.termination_protection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_sources() {
        figment::Jail::expect_with(|_jail| {
            let config = SynthConfig::load(None).unwrap();

            assert_eq!(config.stack_name, "ItemsStack");
            assert_eq!(config.output_dir, PathBuf::from("cdk.out"));
            assert!(!config.termination_protection);
            assert!(config.asset_path().ends_with("lambdas/get_item/function.zip"));
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "infra.json",
                r#"{
                    "stack_name": "ItemsFromFile",
                    "region": "eu-west-1",
                    "tags": {"team": "metro"},
                    "termination_protection": true
                }"#,
            )?;
            jail.set_env("INFRA_STACK_NAME", "ItemsFromEnv");

            let config = SynthConfig::load(None).unwrap();

            assert_eq!(config.stack_name, "ItemsFromEnv");
            assert_eq!(config.region.as_deref(), Some("eu-west-1"));
            assert_eq!(config.tags["team"], "metro");
            assert!(config.stack_props().termination_protection);
            Ok(())
        });
    }

    #[test]
    fn cdk_defaults_only_fill_missing_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.json", r#"{"region": "us-east-2"}"#)?;
            jail.set_env("CDK_DEFAULT_ACCOUNT", "012345678901");
            jail.set_env("CDK_DEFAULT_REGION", "ap-south-1");

            let config = SynthConfig::load(Some(Path::new("custom.json"))).unwrap();

            let env = config.stack_props().env.unwrap();
            assert_eq!(env.account.as_deref(), Some("012345678901"));
            assert_eq!(env.region.as_deref(), Some("us-east-2"));
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("infra.json", r#"{"termination_protection": "sometimes"}"#)?;

            let result = SynthConfig::load(None);

            assert!(matches!(result, Err(crate::InfraError::Config(_))));
            Ok(())
        });
    }
}
