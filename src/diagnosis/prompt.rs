//! Builds the `generateContent` envelope for a diagnosis attempt.

use super::types::{ImagePayload, SymptomRequest};
use crate::llm::{Content, GenerateContentRequest, GenerationConfig, Part};
use serde_json::{Value, json};

pub const RESPONSE_MIME_TYPE: &str = "application/json";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Response shape the model must conform to.
pub fn diagnosis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "possibleDiseases": {
                "type": "ARRAY",
                "description": "A list of potential diseases matching the symptoms. Provide 1 to 3 possibilities.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "diseaseName": {
                            "type": "STRING",
                            "description": "The common name of the plant disease."
                        },
                        "description": {
                            "type": "STRING",
                            "description": "A brief, easy-to-understand description of the disease and its typical symptoms."
                        },
                        "remedies": {
                            "type": "ARRAY",
                            "description": "A list of actionable steps or treatments to remedy the disease.",
                            "items": { "type": "STRING" }
                        },
                        "prevention": {
                            "type": "ARRAY",
                            "description": "A list of tips to prevent this disease from occurring in the future.",
                            "items": { "type": "STRING" }
                        }
                    },
                    "required": ["diseaseName", "description", "remedies", "prevention"]
                }
            },
            "summary": {
                "type": "STRING",
                "description": "A brief, encouraging summary of the diagnosis and next steps for the user."
            }
        },
        "required": ["possibleDiseases", "summary"]
    })
}

pub fn plant_context(plant_type: Option<&str>) -> String {
    match plant_type.map(str::trim).filter(|p| !p.is_empty()) {
        Some(plant_type) => format!(
            "The user has specified the plant type as: \"{plant_type}\". Take this into special consideration when diagnosing."
        ),
        None => "The user has not specified the plant type.".to_string(),
    }
}

pub fn build_prompt(description: &str, plant_type: Option<&str>) -> String {
    format!(
        "You are an expert botanist and plant pathologist AI assistant named 'Plant Pal'.\n\
         A user is describing their plant's symptoms and has optionally provided an image and plant type. \
         Your task is to analyze these inputs and provide a helpful diagnosis.\n\
         \n\
         {context}\n\
         \n\
         User's description of symptoms: \"{description}\"\n\
         \n\
         Analyze the user's text description and, if provided, the image and plant type. \
         Identify 1 to 3 potential diseases. For each disease, provide its name, a simple description, \
         a list of remedies, and a list of prevention tips. Also, include a brief, encouraging overall summary.\n\
         Format your response according to the provided JSON schema. \
         If the image is unclear or doesn't seem to show a plant, mention that in your summary \
         but still provide a diagnosis based on the text if possible.",
        context = plant_context(plant_type),
        description = description.trim(),
    )
}

/// Assembles the request: optional image part first, then the instruction.
pub fn build(
    description: &str,
    plant_type: Option<&str>,
    image: Option<&ImagePayload>,
    temperature: f32,
) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(2);

    if let Some(image) = image {
        parts.push(Part::inline_data(image.mime_type.as_str(), image.data.clone()));
    }
    parts.push(Part::text(build_prompt(description, plant_type)));

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some(RESPONSE_MIME_TYPE.to_string()),
            response_schema: Some(diagnosis_schema()),
            temperature: Some(temperature),
        }),
    }
}

pub fn build_for(request: &SymptomRequest, temperature: f32) -> GenerateContentRequest {
    build(
        &request.description,
        request.plant_type.as_deref(),
        request.image.as_ref(),
        temperature,
    )
}
