//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the trivia REST API, for client code
//! generation. Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let document = ApiDoc::openapi();
    let route_count = document.paths.paths.len();
    std::fs::write(&path, document.to_pretty_json()?)?;

    println!("Wrote {} REST routes to {}", route_count, path);
    Ok(())
}
