//! services/api/src/web/idea_task.rs
//!
//! The asynchronous worker that runs one idea through the pipeline:
//! extraction, persistence of the raw text, summarization, optional archival,
//! and the final status update.

use crate::web::state::AppState;
use futures::FutureExt;
use idea_farm_core::{
    content::resolve_extracted_text,
    domain::{Analysis, Completion, Idea, IdeaAnalysisUpdate, InputType},
    ports::PortResult,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Entry point for the idea-created event.
///
/// Never returns an error: anything escaping the run, including a panic, leaves
/// the idea `failed` with the error text.
pub async fn process_new_idea(app_state: Arc<AppState>, idea: Idea) {
    let idea_id = idea.id;
    info!(%idea_id, user_id = %idea.user_id, "Processing new idea");

    let run = AssertUnwindSafe(run_pipeline(&app_state, &idea))
        .catch_unwind()
        .await;

    let failure = match run {
        Ok(Ok(completion)) => {
            info!(%idea_id, status = completion.status().as_str(), "Pipeline complete");
            return;
        }
        Ok(Err(e)) => e.to_string(),
        Err(panic) => panic_message(panic),
    };

    error!(%idea_id, "Critical failure: {}", failure);
    if let Err(e) = app_state.ideas.mark_failed(idea_id, &failure).await {
        error!(%idea_id, "Could not record the failure: {}", e);
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline task panicked".to_string()
    }
}

async fn run_pipeline(app_state: &AppState, idea: &Idea) -> PortResult<Completion> {
    let ideas = &app_state.ideas;

    // --- 1. Start the run ---
    ideas.mark_processing(idea.id).await?;
    let previous_file_id = stored_archive_reference(app_state, idea).await;

    // --- 2. Resolve and persist the text to analyze ---
    let extraction = match idea.input_type {
        InputType::Url => Some(app_state.extractor.extract(&idea.original_content).await),
        InputType::Text => None,
    };
    let text = resolve_extracted_text(idea, extraction);
    ideas.save_extracted_text(idea.id, &text).await?;
    info!(idea_id = %idea.id, chars = text.chars().count(), "Extracted text saved");

    // --- 3. Summarize ---
    let outcome = app_state
        .summarizer
        .summarize(&text, app_state.prompt_template.as_deref())
        .await;
    let completion = outcome.completion();
    let analysis = outcome.into_analysis();

    // --- 4. Archive the long-form analysis when there is one ---
    // Runs without a new file keep the existing reference so deletion can still clean it up.
    let drive_file_id = match analysis.detailed_analysis.as_deref() {
        Some(detailed) => {
            archive_analysis(app_state, idea, &analysis, detailed, previous_file_id).await
        }
        None => previous_file_id,
    };

    // --- 5. Persist every derived field at once ---
    let Analysis {
        overview,
        detailed_analysis,
        topic,
        suggested_links,
    } = analysis;
    let update = IdeaAnalysisUpdate {
        summary: overview,
        detailed_analysis,
        topic,
        suggested_links,
        drive_file_id,
        completion: completion.clone(),
    };
    ideas.complete_idea(idea.id, &update).await?;
    Ok(completion)
}

/// The archive reference left by an earlier run, read from the stored record.
async fn stored_archive_reference(app_state: &AppState, idea: &Idea) -> Option<String> {
    match app_state.ideas.get_idea(idea.id).await {
        Ok(stored) => stored.drive_file_id,
        Err(e) => {
            warn!(idea_id = %idea.id, "Could not read the previous archive reference: {}", e);
            idea.drive_file_id.clone()
        }
    }
}

/// Uploads the analysis and returns the reference to store on the idea.
///
/// A re-run replaces the file from the previous run; a failed upload keeps it.
async fn archive_analysis(
    app_state: &AppState,
    idea: &Idea,
    analysis: &Analysis,
    detailed: &str,
    previous: Option<String>,
) -> Option<String> {
    let (idea_id, user_id) = (idea.id, idea.user_id);

    let Some(credential) = app_state.credentials.get_credentials(user_id).await else {
        info!(%idea_id, %user_id, "No offline credentials found. Skipping background upload.");
        return previous;
    };

    let filename = format!("Idea Farm: {}.md", analysis.topic);
    let Some(file_id) = app_state
        .archive
        .upload_markdown(&credential, &filename, detailed, &app_state.archive_folder)
        .await
    else {
        warn!(%idea_id, "Background upload failed");
        return previous;
    };
    info!(%idea_id, drive_file_id = %file_id, "Background upload succeeded");

    if let Some(old_id) = previous.filter(|old| *old != file_id) {
        if app_state.archive.delete_file(&credential, &old_id).await {
            info!(%idea_id, drive_file_id = %old_id, "Replaced previous archive file");
        } else {
            warn!(%idea_id, drive_file_id = %old_id, "Could not remove previous archive file");
        }
    }
    Some(file_id)
}
