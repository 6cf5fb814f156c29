pub mod error;
pub mod resize;

pub use error::ApiError;

use rocket::serde::json::{json, Json, Value};
use rocket::Request;

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<Value> {
    Json(json!({
        "error": "Not found",
        "message": format!("No route for {}", req.uri())
    }))
}

#[catch(500)]
pub fn internal_error() -> Json<Value> {
    Json(json!({
        "error": "Internal server error",
        "message": "The server failed to process the request"
    }))
}
