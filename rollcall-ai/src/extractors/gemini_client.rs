//! Gemini `generateContent` client
//!
//! Sends the document as inline data followed by a fixed instruction prompt
//! and asks for a JSON array constrained by a response schema.
//!
//! # API Reference
//! - Endpoint: https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent
//! - Documentation: https://ai.google.dev/api/generate-content

use super::{ExtractionError, RecordExtractor};
use crate::models::AttendanceRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Gemini API base URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Multimodal extraction is slow on dense sheets
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Instruction sent after the document part
pub const EXTRACTION_PROMPT: &str = r#"
Analyze the provided image of an attendance sheet with high accuracy.
Perform Optical Character Recognition (OCR) to identify and extract all tabular data.
Structure the extracted information into a JSON array of objects, strictly adhering to the provided schema.

The columns are:
- id: The unique identifier for the row.
- firstname: The first name of the person.
- middle: The middle name. Can be empty.
- lastname: The last name of the person.
- sex: The gender, usually 'M' or 'F'.
- do_you_have_any_disability: 'Yes' or 'No'.
- if_yes_type_of_disability: The type of disability if applicable. Can be empty.
- home_address: The full home address.
- phone_no: The phone number.
- email: The email address.
- highest_qualification: The highest academic qualification.
- employment_type: The type of employment listed in the document. Extract this value directly from the 'Employment Type' column.
- employment_status: This should be left empty.

Key Instructions:
1.  **Accuracy is critical**: Double-check extracted text for common OCR errors. Pay close attention to names, addresses, emails, and phone numbers.
2.  **Column Mapping**: Correctly map the data from the image columns to the corresponding JSON fields. The image has columns like 'Qualification' and 'Employment Type'. Map 'Qualification' to 'highest_qualification' and 'Employment Type' to 'employment_type'.
3.  **Employment Status**: Leave the 'employment_status' field as an empty string ("") for all records. The user will fill this in manually.
4.  **Empty Values**: If a value is missing for any field in a row (except for required ones), represent it as an empty string ("").
5.  **Output Format**: Ensure the final output is ONLY the raw JSON data, with no surrounding text, markdown formatting (like ```json), or explanations.
"#;

/// Fields the service must always return
pub const REQUIRED_FIELDS: [&str; 7] = [
    "id",
    "firstname",
    "lastname",
    "sex",
    "home_address",
    "phone_no",
    "email",
];

/// Response schema: array of 13 string properties
pub fn response_schema() -> Value {
    let properties: serde_json::Map<String, Value> = crate::models::Column::ALL
        .iter()
        .map(|column| (column.key().to_string(), json!({ "type": "STRING" })))
        .collect();

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": properties,
            "required": REQUIRED_FIELDS,
        }
    })
}

/// Request body: document first, then the prompt
pub fn build_request_body(payload: &str, mime_type: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "inlineData": { "mimeType": mime_type, "data": payload } },
                { "text": EXTRACTION_PROMPT },
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Strip a markdown code fence if the model added one anyway
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Parse a `generateContent` response body into records
pub fn parse_response(body: &str) -> Result<Vec<AttendanceRecord>, ExtractionError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::Parse(format!("Invalid response envelope: {}", e)))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| ExtractionError::Parse(format!("Response is not a record array: {}", e)))
}

/// Gemini extraction client
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: impl Into<String>) -> Result<Self, ExtractionError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ExtractionError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl RecordExtractor for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn extract(
        &self,
        payload: &str,
        mime_type: &str,
    ) -> Result<Vec<AttendanceRecord>, ExtractionError> {
        debug!(model = %self.model, mime_type = %mime_type, payload_len = payload.len(), "Calling Gemini");

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request_body(payload, mime_type))
            .send()
            .await
            .map_err(|e| ExtractionError::Network(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractionError::Network(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            warn!(status = %status, "Gemini returned an error status");
            return Err(ExtractionError::Api(format!("Gemini returned {}: {}", status, body)));
        }

        let records = parse_response(&body)?;
        debug!(records = records.len(), "Gemini extraction complete");
        Ok(records)
    }
}

/// Extractor used when no API key is configured
///
/// The service still starts; every extraction fails with a clear reason.
#[derive(Debug, Default)]
pub struct UnconfiguredExtractor;

#[async_trait]
impl RecordExtractor for UnconfiguredExtractor {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn extract(
        &self,
        _payload: &str,
        _mime_type: &str,
    ) -> Result<Vec<AttendanceRecord>, ExtractionError> {
        Err(ExtractionError::Api(
            "No Gemini API key configured (set ROLLCALL_GEMINI_API_KEY)".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
        })
        .to_string()
    }

    #[test]
    fn test_request_places_document_before_prompt() {
        let body = build_request_body("QUJD", "image/png");
        let parts = &body["contents"][0]["parts"];

        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert!(parts[1]["text"].as_str().unwrap().contains("attendance sheet"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_schema_lists_all_columns_and_required_subset() {
        let schema = response_schema();
        let properties = schema["items"]["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 13);
        assert!(properties.contains_key("employment_status"));

        let required: Vec<&str> = schema["items"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, REQUIRED_FIELDS.to_vec());
    }

    #[test]
    fn test_parse_records_with_missing_fields() {
        let text = r#"[{"id":"1","firstname":"Ada","lastname":"Obi","sex":"F","home_address":"1 Rd","phone_no":"080","email":"a@x.com","middle":null}]"#;
        let records = parse_response(&envelope(text)).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].firstname, "Ada");
        assert_eq!(records[0].middle, "");
        assert_eq!(records[0].employment_status, "");
    }

    #[test]
    fn test_parse_strips_code_fence() {
        let records = parse_response(&envelope("```json\n[{\"id\":\"7\"}]\n```")).unwrap();
        assert_eq!(records[0].id, "7");
    }

    #[test]
    fn test_empty_text_is_error() {
        assert_eq!(parse_response(&envelope("  ")), Err(ExtractionError::EmptyResponse));
        assert_eq!(parse_response(r#"{"candidates":[]}"#), Err(ExtractionError::EmptyResponse));
    }

    #[test]
    fn test_non_array_is_parse_error() {
        assert!(matches!(
            parse_response(&envelope(r#"{"id":"1"}"#)),
            Err(ExtractionError::Parse(_))
        ));
        assert!(matches!(parse_response("not json"), Err(ExtractionError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_extractor_always_fails() {
        let result = UnconfiguredExtractor.extract("QUJD", "image/png").await;
        assert!(matches!(result, Err(ExtractionError::Api(_))));
    }

    #[test]
    fn test_endpoint_uses_model_and_base_url() {
        let client = GeminiClient::new("key".to_string(), DEFAULT_MODEL)
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/models/gemini-2.5-flash:generateContent"
        );
    }
}
