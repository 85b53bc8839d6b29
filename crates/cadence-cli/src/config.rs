use cadence_core::models::MaterializationConfig;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Where the event database lives
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Materialization window settings passed through to the engine
    #[serde(default)]
    pub materialization: MaterializationConfig,
}

fn default_database_path() -> String {
    "cadence.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            materialization: MaterializationConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("CADENCE_"))
            .extract()
    }
}
