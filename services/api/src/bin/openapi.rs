//! services/api/src/bin/openapi.rs
//!
//! Dumps the OpenAPI document for the learning API. Pass a path to choose the
//! output file, or `-` to print to stdout. Defaults to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let document = ApiDoc::openapi().to_pretty_json()?;

    if target == "-" {
        println!("{}", document);
    } else {
        std::fs::write(&target, document)?;
        eprintln!("OpenAPI document written to {}", target);
    }
    Ok(())
}
