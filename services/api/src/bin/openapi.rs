//! services/api/src/bin/openapi.rs
//!
//! This binary generates the OpenAPI 3.0 specification for the Idea Farm REST API
//! and saves it to a file (default `openapi.json`).

use api_lib::web::rest::ApiDoc;
use clap::Parser;
use std::path::PathBuf;
use utoipa::OpenApi;

#[derive(Parser, Debug)]
#[command(name = "openapi", about = "Write the OpenAPI document to disk")]
struct Args {
    #[arg(default_value = "openapi.json")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&args.output, spec_json)?;
    println!("✅ OpenAPI specification generated at {}", args.output.display());
    Ok(())
}
