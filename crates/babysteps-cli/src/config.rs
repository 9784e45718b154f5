//! Configuration: where the database lives and who is logging.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "babysteps";
const ENV_PREFIX: &str = "BABYSTEPS_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    /// Caregiver recorded as the creator of new events and timers.
    pub caregiver_id: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir().map_or_else(|| PathBuf::from("."), |p| p.join(APP_DIR));
        Self {
            database_path: data_dir.join("babysteps.db"),
            caregiver_id: "local-user".to_string(),
        }
    }
}

impl Config {
    /// Later layers win: defaults, `<config dir>/babysteps/config.toml`,
    /// `config_path`, then `BABYSTEPS_*` variables. Missing files are skipped.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let user_file = dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"));
        [user_file.as_deref(), config_path]
            .into_iter()
            .flatten()
            .fold(
                Figment::from(Serialized::defaults(Self::default())),
                |figment, path| figment.merge(Toml::file(path)),
            )
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
    }
}
