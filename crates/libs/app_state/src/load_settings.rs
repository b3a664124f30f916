use crate::AppSettings;
use color_eyre::eyre::Result;
use config::{Config, Environment, File};
use std::path::Path;

/// Env var naming the directory that holds the settings files.
pub const ENV_CONFIG_DIR: &str = "MEDIA_CONFIG_DIR";
/// Env var naming the runtime flavor ("local", "test", "prod", ...).
pub const ENV_RUNTIME: &str = "MEDIA_RUNTIME";

const DEFAULT_CONFIG_DIR: &str = "config";
const DEFAULT_RUNTIME: &str = "local";

/// Loads settings hierarchically: `settings.toml`, overridden by
/// `settings.<runtime>.toml` when present, overridden by `APP__`-prefixed
/// environment variables.
pub fn load_settings_from_dir(dir: &Path, runtime: &str) -> Result<AppSettings> {
    let base = dir.join("settings.toml");
    let overlay = dir.join(format!("settings.{runtime}.toml"));

    let mut builder = Config::builder().add_source(File::from(base));
    if overlay.exists() {
        builder = builder.add_source(File::from(overlay));
    }
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder.build()?.try_deserialize::<AppSettings>()?;
    Ok(settings)
}

/// Loads settings from the directory and runtime named by the environment.
pub fn load_app_settings() -> Result<AppSettings> {
    let dir = std::env::var(ENV_CONFIG_DIR).unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let runtime = std::env::var(ENV_RUNTIME).unwrap_or_else(|_| DEFAULT_RUNTIME.to_string());
    load_settings_from_dir(Path::new(&dir), &runtime)
}
