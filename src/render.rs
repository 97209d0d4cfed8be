//! Terminal rendering of session state
//!
//! Pure functions from state to text; nothing here talks to the network or
//! mutates the session.

use crate::analysis::AnalysisResult;
use crate::session::{Phase, SessionState};
use std::fmt::Write;

/// Progress line for phases that take a while
pub(crate) fn phase_status(phase: Phase) -> Option<&'static str> {
    match phase {
        Phase::Uploading => Some("Uploading video..."),
        Phase::Analyzing => Some("Analyzing content with Gemini..."),
        Phase::GeneratingThumbnail => Some("Generating thumbnail..."),
        Phase::Idle | Phase::Completed | Phase::Error => None,
    }
}

/// Render an analysis as Markdown
pub(crate) fn render_analysis(analysis: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "## Titles\n");
    for title in analysis.titles_by_rank() {
        let _ = writeln!(out, "{}. {}", title.rank, title.text);
        if !title.reasoning.trim().is_empty() {
            let _ = writeln!(out, "   _{}_", title.reasoning.trim());
        }
    }

    let _ = writeln!(out, "\n## Trending Keywords\n");
    let keywords: Vec<String> = analysis
        .trending_keywords
        .iter()
        .map(|k| format!("`{}`", k))
        .collect();
    let _ = writeln!(out, "{}", keywords.join(" "));

    if !analysis.sources.is_empty() {
        let _ = writeln!(out, "\n### Sources\n");
        for source in &analysis.sources {
            let _ = writeln!(out, "- [{}]({})", source.title, source.uri);
        }
    }

    let _ = writeln!(out, "\n## YouTube Description\n");
    let _ = writeln!(out, "{}", analysis.descriptions.youtube.trim());

    let _ = writeln!(out, "\n## Instagram Caption\n");
    let _ = writeln!(out, "{}", analysis.descriptions.instagram.trim());

    let _ = writeln!(out, "\n## Thumbnail Concept\n");
    let _ = writeln!(out, "{}", analysis.thumbnail_concept.idea.trim());

    let _ = writeln!(out, "\n## Transcription\n");
    let _ = writeln!(out, "{}", analysis.transcription.trim());

    out
}

/// One-screen summary of the session
pub(crate) fn render_state(state: &SessionState) -> String {
    let mut out = String::new();

    match state.phase {
        Phase::Error => {
            let message = state.error_message.as_deref().unwrap_or("Unknown error");
            let _ = writeln!(out, "Error: {}", message);
        }
        phase => {
            if let Some(status) = phase_status(phase) {
                let _ = writeln!(out, "{}", status);
            }
            // Upload rejections leave the phase alone but still need showing
            if let Some(message) = &state.error_message {
                let _ = writeln!(out, "{}", message);
            }
        }
    }

    if let Some(analysis) = &state.analysis {
        let _ = writeln!(out, "{}", render_analysis(analysis));
    }

    if state.is_regenerating_thumbnail {
        let _ = writeln!(out, "Regenerating thumbnail ({})...", state.aspect_ratio);
    } else if state.thumbnail_image.is_some() {
        let _ = writeln!(out, "Thumbnail ready ({})", state.aspect_ratio);
    }

    out
}
