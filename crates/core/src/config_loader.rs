use crate::config::EngineConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads engine configuration from defaults, `config/Config.toml` and
    /// `WAGER_`-prefixed environment variables, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be parsed.
    pub fn load() -> Result<EngineConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads engine configuration from a specific TOML file.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be parsed.
    pub fn load_from(path: &str) -> Result<EngineConfig> {
        let config: EngineConfig = Self::figment(path).extract()?;
        Ok(config)
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("WAGER_").split("__"))
    }
}
