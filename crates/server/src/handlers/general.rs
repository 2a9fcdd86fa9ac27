/// The handler for the root (`/`) endpoint.
pub async fn root() -> &'static str {
    "aichart server is running."
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}
