use super::{parser, prompt, types::*};
use crate::{Error, Result, llm::LlmClient};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs single diagnosis attempts against the model. No retries: each call
/// either returns a report or the error that ended the attempt.
pub struct Diagnoser {
    llm_client: Arc<dyn LlmClient>,
    temperature: f32,
}

impl Diagnoser {
    pub fn new(llm_client: Arc<dyn LlmClient>) -> Self {
        Self {
            llm_client,
            temperature: prompt::DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub async fn diagnose(&self, request: &SymptomRequest) -> Result<DiagnosisReport> {
        if !request.has_description() {
            return Err(Error::validation(
                "Please describe your plant's symptoms. A description is required.",
            ));
        }

        info!(
            "Requesting diagnosis (plant type: {}, image: {})",
            request.plant_type.as_deref().unwrap_or("unspecified"),
            request
                .image
                .as_ref()
                .map(|image| image.mime_type.as_str())
                .unwrap_or("none")
        );

        let envelope = prompt::build_for(request, self.temperature);

        match self.attempt(envelope).await {
            Ok(report) => {
                info!(
                    "Diagnosis returned {} candidate diseases",
                    report.possible_diseases.len()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Error calling model API: {}", e);
                Err(e)
            }
        }
    }

    async fn attempt(&self, envelope: crate::llm::GenerateContentRequest) -> Result<DiagnosisReport> {
        let response = self.llm_client.generate_content(envelope).await?;

        if let Some(reason) = response
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
        {
            debug!("Model finished with reason {}", reason);
        }

        parser::parse(&response.text())
    }
}
