// Request-scoped context shared by every handler

pub mod request_context;

pub use request_context::*;
