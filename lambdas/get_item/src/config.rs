use figment::providers::Env;
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Config {
    pub table_name: String,
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        let config: Self = Figment::new()
            .merge(Env::raw().only(&["TABLE_NAME"]))
            .extract()?;

        if config.table_name.trim().is_empty() {
            return Err(figment::Error::from(
                "TABLE_NAME environment variable not set".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn when_table_name_set_should_load() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TABLE_NAME", "items");

            let config = Config::load()?;

            assert_eq!(config.table_name, "items");
            Ok(())
        });
    }

    #[test]
    fn when_table_name_missing_should_fail() {
        figment::Jail::expect_with(|_jail| {
            std::env::remove_var("TABLE_NAME");

            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn when_table_name_empty_should_fail() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TABLE_NAME", "");

            assert!(Config::load().is_err());
            Ok(())
        });
    }
}
