//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ReportError;

/// Map domain errors to the one line shown to the operator.
pub fn map_error(e: &ReportError) -> String {
    match e {
        ReportError::Cancelled => "Cancelled.".to_string(),
        ReportError::ProviderAuthFailed(_) => {
            format!("{}\nCheck provider.api_key or the configured API key variable.", e)
        }
        _ => e.to_string(),
    }
}
