use super::types::DiagnosisReport;
use crate::{Error, Result};

/// Decodes the model's reply. No partial recovery: anything that does not
/// match the report shape fails the whole attempt.
pub fn parse(raw: &str) -> Result<DiagnosisReport> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::EmptyResponse);
    }

    serde_json::from_str(text).map_err(|e| Error::malformed(e.to_string()))
}
