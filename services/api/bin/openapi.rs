//! Writes the OpenAPI document for the HTTP endpoints.
//!
//! Usage: `openapi [OUTPUT]`, defaulting to `openapi.json`.

use rev_voice_api::router::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn write_spec(api_doc: utoipa::openapi::OpenApi, path: &str) -> anyhow::Result<()> {
    let json = api_doc.to_pretty_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    write_spec(ApiDoc::openapi(), &output)?;
    println!("OpenAPI document written to {}", output);
    Ok(())
}
