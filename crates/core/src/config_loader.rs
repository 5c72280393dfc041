use crate::config::GammaConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Environment prefix; nested keys are separated by `__`
/// (`GAMMA_SERVICE__REFRESH_SECONDS=30`).
pub const ENV_PREFIX: &str = "GAMMA_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Builds the layered provider: defaults, then the file, then the environment.
    ///
    /// A `.json` path is read as JSON, anything else as TOML. A missing file
    /// contributes nothing.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(GammaConfig::default()));
        if let Some(path) = path {
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            figment = if is_json {
                figment.merge(Json::file(path))
            } else {
                figment.merge(Toml::file(path))
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and normalizes configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if a value
    /// has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<GammaConfig> {
        let config: GammaConfig = Self::figment(path).extract()?;
        Ok(config.normalized())
    }
}
