//! Explanation and purport summary for a retrieved verse, via a [`Generator`].
//!
//! Generation is cosmetic: failures are logged and replaced with placeholder text.

use serde::Serialize;
use tracing::warn;

use crate::embed::Generator;
use crate::query::QueryResult;

pub const NO_EXPLANATION: &str = "No explanation available.";
pub const NO_SUMMARY: &str = "No summary available.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub explanation: String,
    pub purport_summary: String,
}

pub fn explanation_prompt(translation: &str) -> String {
    format!("Explain this Bhagavatam verse in simple words: {translation}")
}

pub fn summary_prompt(purport: &str) -> String {
    format!("Summarize the following purport in a few sentences:\n\n{purport}")
}

/// Generates an explanation of the translation and a summary of the purport.
pub async fn enrich<G: Generator>(result: &QueryResult, generator: &G) -> Enrichment {
    let record = &result.record;
    let explanation = match generator.generate(&explanation_prompt(&record.translation)).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => NO_EXPLANATION.to_string(),
        Err(e) => {
            warn!(row = result.row, error = %e, "explanation failed");
            NO_EXPLANATION.to_string()
        }
    };

    let purport_summary = match record.purport.as_deref().filter(|p| !p.trim().is_empty()) {
        None => NO_SUMMARY.to_string(),
        Some(purport) => match generator.generate(&summary_prompt(purport)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => NO_SUMMARY.to_string(),
            Err(e) => {
                warn!(row = result.row, error = %e, "purport summary failed");
                NO_SUMMARY.to_string()
            }
        },
    };

    Enrichment {
        explanation,
        purport_summary,
    }
}
