//! services/api/src/bin/tune.rs
//!
//! Runs the configured summarizer once against a local prompt and input file,
//! for iterating on the prompt without a database or server.

use api_lib::{adapters::summarizer_from_config, config::SummarizerConfig, error::ApiError};
use clap::Parser;
use idea_farm_core::domain::{Analysis, AnalysisOutcome};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

const SAMPLE_TEXT: &str =
    "Idea Farm is a personal knowledge capture tool that uses AI to summarize content.";

#[derive(Parser, Debug)]
#[command(name = "tune", about = "Try a summary prompt against sample content")]
struct Args {
    /// Prompt template; `{content}` is replaced with the input text.
    #[arg(long, default_value = "prompt.md")]
    prompt: PathBuf,

    /// Input text file. Falls back to a built-in sample when missing.
    #[arg(default_value = "sample.txt")]
    input: PathBuf,
}

fn analysis_json(analysis: &Analysis) -> Value {
    json!({
        "overview": analysis.overview,
        "detailedAnalysis": analysis.detailed_analysis,
        "topic": analysis.topic,
        "suggestedLinks": analysis.suggested_links.iter().map(|l| json!({
            "title": l.title,
            "url": l.url,
            "description": l.description,
        })).collect::<Vec<_>>(),
    })
}

fn outcome_json(outcome: &AnalysisOutcome) -> Value {
    match outcome {
        AnalysisOutcome::Analyzed(analysis) => analysis_json(analysis),
        AnalysisOutcome::Failed(failure) => {
            let mut value = analysis_json(&Analysis::placeholder());
            value["error"] = json!(failure.message);
            value["failureKind"] = json!(format!("{:?}", failure.kind));
            value
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();
    let args = Args::parse();

    let config = SummarizerConfig::from_env()?;
    let summarizer = summarizer_from_config(&config)?;
    info!(provider = ?config.provider, model = %config.model, "Summarizer initialized");

    let prompt_template = tokio::fs::read_to_string(&args.prompt).await.map_err(|e| {
        ApiError::Internal(format!("Could not read {}: {}", args.prompt.display(), e))
    })?;
    info!(
        path = %args.prompt.display(),
        chars = prompt_template.chars().count(),
        "Loaded prompt template"
    );

    let content = match tokio::fs::read_to_string(&args.input).await {
        Ok(content) => {
            info!(path = %args.input.display(), chars = content.chars().count(), "Loaded input");
            content
        }
        Err(_) => {
            info!("Using the built-in sample text (pass a filename to use your own)");
            SAMPLE_TEXT.to_string()
        }
    };

    info!("Generating summary...");
    let outcome = summarizer.summarize(&content, Some(&prompt_template)).await;
    let rendered = serde_json::to_string_pretty(&outcome_json(&outcome))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
