use rocket::http::{ContentType, Status};
use serde_json::json;

use crate::cache::CacheError;
use crate::resolver::ResolveError;

#[derive(Debug)]
pub enum ApiError {
    ResolveError(ResolveError),
    CacheError(CacheError),
    Io(String),
}

impl From<ResolveError> for ApiError {
    fn from(error: ResolveError) -> Self {
        ApiError::ResolveError(error)
    }
}

impl From<CacheError> for ApiError {
    fn from(error: CacheError) -> Self {
        ApiError::CacheError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::ResolveError(ResolveError::InvalidDimension { .. }) => Status::BadRequest,
            _ => Status::InternalServerError,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::ResolveError(error @ ResolveError::InvalidDimension { parameter, max }) => json!({
                "error": error.to_string(),
                "parameter": parameter,
                "max": max
            }),
            ApiError::ResolveError(error @ ResolveError::NoImagesAvailable(_)) => json!({
                "error": "No images available",
                "message": error.to_string()
            }),
            ApiError::CacheError(error @ CacheError::SourceImageUnreadable { .. }) => json!({
                "error": "Source image unreadable",
                "message": error.to_string()
            }),
            ApiError::CacheError(error @ CacheError::CacheWriteFailed { .. }) => json!({
                "error": "Cache write failed",
                "message": error.to_string()
            }),
            ApiError::CacheError(error @ CacheError::ResizeFailed(_)) => json!({
                "error": "Image processing error",
                "message": error.to_string()
            }),
            ApiError::Io(message) => json!({
                "error": "I/O error",
                "message": message
            }),
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let body = self.body().to_string();

        rocket::Response::build()
            .status(self.status())
            .header(ContentType::JSON)
            .sized_body(body.len(), std::io::Cursor::new(body))
            .ok()
    }
}
