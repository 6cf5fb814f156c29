#[macro_use]
extern crate rocket;

pub mod api;
pub mod cache;
pub mod config;
pub mod cors;
pub mod images;
pub mod logging;
pub mod resolver;

use std::sync::Arc;

use log::info;
use rocket::figment::Figment;
use rocket::fs::FileServer;
use rocket::{Build, Rocket};

use cache::{CacheSettings, ResizeCache};
use config::AppConfig;
use cors::CORS;
use logging::RequestLogger;
use resolver::{DirectoryImageSource, ImageSource, IndexProvider, Resolver};

/// Assembles the server: resolver and cache over `config.images_dir`, the
/// resize and health routes, and the static frontend when present.
pub fn build(figment: Figment, config: AppConfig, indices: Arc<dyn IndexProvider>) -> Rocket<Build> {
    let source: Arc<dyn ImageSource> = Arc::new(DirectoryImageSource::new(
        &config.images_dir,
        config.image_extension.as_str(),
    ));

    let resolver = Resolver::new(Arc::clone(&source), indices, config.max_dimension);
    let cache = ResizeCache::new(
        &config.cache_dir,
        source,
        CacheSettings {
            extension: config.image_extension.clone(),
            jpeg_quality: config.jpeg_quality,
            fallback_on_write_failure: config.fallback_on_write_failure,
        },
    );

    let mut rocket = rocket::custom(figment)
        .attach(CORS)
        .attach(RequestLogger)
        .manage(resolver)
        .manage(cache)
        .mount("/", routes![api::resize::resize_image, api::resize::health])
        .register("/", catchers![api::not_found, api::internal_error]);

    // Ranked ahead of the resize route; forwards when no file matches.
    if config.static_dir.is_dir() {
        info!("Serving static files from {}", config.static_dir.display());
        rocket = rocket.mount("/", FileServer::from(&config.static_dir).rank(api::resize::STATIC_RANK));
    } else {
        info!(
            "Static directory {} not found, frontend disabled",
            config.static_dir.display()
        );
    }

    rocket.manage(config)
}
