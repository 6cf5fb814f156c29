use std::io::Cursor;
use std::time::Instant;

use rocket::http::{ContentType, Header, Status};
use rocket::response::{self, Responder, Response};
use rocket::serde::json::{json, Json, Value};
use rocket::{Request, State};

use crate::api::ApiError;
use crate::cache::{Artifact, ResizeCache};
use crate::resolver::Resolver;

// Entries are never invalidated, so clients may keep them too.
const CACHE_CONTROL: &str = "public, max-age=86400";

/// Rank of the static frontend. Lower than [`resize_image`]'s, so an existing
/// file wins for two-segment paths and missing files forward to the resize.
pub const STATIC_RANK: isize = 10;

pub struct ImageResponse {
    pub data: Vec<u8>,
    /// Value of the `X-Cache` header.
    pub cache: String,
}

impl<'r> Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let etag = format!("\"{:x}\"", md5::compute(&self.data));

        if let Some(if_none_match) = req.headers().get_one("If-None-Match") {
            if if_none_match == etag {
                return Response::build()
                    .status(Status::NotModified)
                    .header(Header::new("ETag", etag))
                    .header(Header::new("Cache-Control", CACHE_CONTROL))
                    .header(Header::new("X-Cache", self.cache))
                    .ok();
            }
        }

        Response::build()
            .header(ContentType::JPEG)
            .header(Header::new("Cache-Control", CACHE_CONTROL))
            .header(Header::new("ETag", etag))
            .header(Header::new("X-Cache", self.cache))
            .sized_body(self.data.len(), Cursor::new(self.data))
            .ok()
    }
}

#[get("/<width>/<height>", rank = 20)]
pub async fn resize_image(
    width: &str,
    height: &str,
    resolver: &State<Resolver>,
    cache: &State<ResizeCache>,
) -> Result<ImageResponse, ApiError> {
    let started = Instant::now();
    log::debug!("New request for image {}x{}", width, height);

    let key = resolver.resolve_raw(width, height).map_err(|err| {
        log::info!("Rejected request {}x{}: {}", width, height, err);
        ApiError::from(err)
    })?;

    let response = match cache.get_or_create(&key).await? {
        Artifact::Stored { path, status } => {
            let data = tokio::fs::read(&path).await.map_err(|e| {
                log::error!("Failed to read cache file {}: {}", path.display(), e);
                ApiError::Io(format!("failed to read {}: {}", path.display(), e))
            })?;
            ImageResponse {
                data,
                cache: status.to_string(),
            }
        }
        Artifact::Transient { bytes, .. } => ImageResponse {
            data: bytes.as_ref().clone(),
            cache: "BYPASS".to_string(),
        },
    };

    log::debug!(
        "Served {} [{}] in {:.2}ms",
        key,
        response.cache,
        started.elapsed().as_secs_f64() * 1000.0
    );

    Ok(response)
}

#[get("/health")]
pub fn health() -> Json<Value> {
    Json(json!({ "message": "OK" }))
}
