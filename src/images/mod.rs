pub mod tools;

pub use tools::{render, RenderError};
