use std::env;
use std::path::PathBuf;

use rocket::figment::{
    providers::{Format, Toml},
    Figment, Profile,
};
use rocket::Config;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8033;
pub const DEFAULT_MAX_DIMENSION: u32 = 3048;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub address: String,
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_fallback_on_write_failure")]
    pub fallback_on_write_failure: bool,
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./build")
}

fn default_image_extension() -> String {
    "jpeg".to_string()
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_jpeg_quality() -> u8 {
    75
}

fn default_fallback_on_write_failure() -> bool {
    true
}

/// Builds the figment the server is configured from.
///
/// Precedence, lowest first: Rocket defaults, service defaults, `App.toml`,
/// environment overrides. The profile comes from `APP_PROFILE`.
pub fn figment() -> Figment {
    let mut figment = Figment::from(Config::default())
        .merge(("port", DEFAULT_PORT))
        .merge(("address", "0.0.0.0"))
        .merge(Toml::file("App.toml").nested());

    for (var, key) in [
        ("IMAGES_DIR", "images_dir"),
        ("CACHE_DIR", "cache_dir"),
        ("STATIC_DIR", "static_dir"),
    ] {
        if let Ok(value) = env::var(var) {
            figment = figment.merge((key, value));
        }
    }

    if let Some(max) = env::var("MAX_DIMENSION").ok().and_then(|v| v.trim().parse::<u32>().ok()) {
        figment = figment.merge(("max_dimension", max));
    }

    if let Some(port) = env::var("PORT").ok().and_then(|v| v.trim().parse::<u16>().ok()) {
        figment = figment.merge(("port", port));
    }

    figment.select(Profile::from_env_or("APP_PROFILE", "default"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_app_toml() {
        let figment = Figment::from(Config::default())
            .merge(("port", DEFAULT_PORT))
            .merge(("address", "0.0.0.0"));
        let config: AppConfig = figment.extract().unwrap();

        assert_eq!(config.port, 8033);
        assert_eq!(config.images_dir, PathBuf::from("./images"));
        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
        assert_eq!(config.image_extension, "jpeg");
        assert_eq!(config.max_dimension, 3048);
        assert_eq!(config.jpeg_quality, 75);
        assert!(config.fallback_on_write_failure);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let figment = Figment::from(Config::default())
            .merge(("cache_dir", "/tmp/pix"))
            .merge(("max_dimension", 512))
            .merge(("fallback_on_write_failure", false));
        let config: AppConfig = figment.extract().unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/pix"));
        assert_eq!(config.max_dimension, 512);
        assert!(!config.fallback_on_write_failure);
    }
}
