use std::fmt::Display;
use std::time::Instant;

use env_logger::Env;
use log::info;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Method;
use rocket::{Data, Request, Response};

/// Initializes `env_logger` from `RUST_LOG`, defaulting to `info`.
pub fn init() {
    let _ = env_logger::try_init_from_env(Env::default().default_filter_or("info"));
}

#[derive(Clone, Copy)]
struct RequestStart(Option<Instant>);

/// Logs `METHOD STATUS URI (N bytes) T ms` for every response.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Some(Instant::now())));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started = request.local_cache(|| RequestStart(None));
        let elapsed = started
            .0
            .map(|s| s.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or_default();
        let line = access_line(
            request.method(),
            response.status().code,
            &request.uri(),
            response.body().preset_size(),
            elapsed,
        );
        info!("{}", line);
    }
}

fn access_line(method: Method, status: u16, uri: &dyn Display, length: Option<usize>, elapsed_ms: f64) -> String {
    let length = length.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    format!("{} {} {} ({} bytes) {:.2} ms", method, status, uri, length, elapsed_ms)
}
