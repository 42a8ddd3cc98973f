mod cors;

pub use cors::cors_headers;
