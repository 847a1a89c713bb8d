//! Writes the proxy's OpenAPI document to disk.
//!
//! Usage: `openapi [OUTPUT]`, defaulting to `openapi.json`.

use anyhow::Context;
use persona_api::router::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let document = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize OpenAPI document")?;
    std::fs::write(&output, document).with_context(|| format!("Failed to write {output}"))?;
    println!("Wrote {output}");
    Ok(())
}
