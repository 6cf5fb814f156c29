#[macro_use]
extern crate rocket;

use std::sync::Arc;

use dotenv::dotenv;
use log::{error, info, warn};
use pixcache::config::{self, AppConfig};
use pixcache::resolver::{DirectoryImageSource, ImageSource, RandomIndex};

#[launch]
async fn rocket() -> _ {
    dotenv().ok();

    pixcache::logging::init();

    // Load config
    let figment = config::figment();
    let config = match figment.extract::<AppConfig>() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully");

    if let Err(e) = tokio::fs::create_dir_all(&config.cache_dir).await {
        warn!(
            "Failed to create cache directory {}: {}",
            config.cache_dir.display(),
            e
        );
    }

    // The set is re-listed per request, this count is informational only.
    let source = DirectoryImageSource::new(&config.images_dir, config.image_extension.as_str());
    match source.list_images() {
        Ok(images) => info!(
            "Found {} images in {}",
            images.len(),
            config.images_dir.display()
        ),
        Err(e) => warn!(
            "Cannot list images directory {}: {}",
            config.images_dir.display(),
            e
        ),
    }

    info!(
        "Starting image server on {}:{} (cache: {}, max dimension: {})",
        config.address,
        config.port,
        config.cache_dir.display(),
        config.max_dimension
    );

    pixcache::build(figment, config, Arc::new(RandomIndex))
}
