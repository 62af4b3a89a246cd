//! JSON parsing helpers for extraction service responses
//!
//! These functions extract JSON from model responses, which often include
//! extra text before/after the JSON payload. A decode failure is a
//! `MalformedResponse`, never silently coerced.

use crate::error::{Error, Result};

use super::types::{ChatReply, ExtractionResult};

/// Parse an extraction result from a model response
pub fn parse_extraction(response: &str) -> Result<ExtractionResult> {
    let json_str = find_object(response)?;
    serde_json::from_str(json_str).map_err(|e| {
        Error::MalformedResponse(format!(
            "Invalid extraction JSON: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })
}

/// Parse a chat reply from a model response
pub fn parse_chat_reply(response: &str) -> Result<ChatReply> {
    let json_str = find_object(response)?;
    serde_json::from_str(json_str)
        .map_err(|e| Error::MalformedResponse(format!("Invalid chat reply JSON: {}", e)))
}

/// Parse an insight list (JSON array of strings) from a model response
pub fn parse_insights(response: &str) -> Result<Vec<String>> {
    let response = response.trim();
    let start = response.find('[');
    let end = response.rfind(']');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str)
                .map_err(|e| Error::MalformedResponse(format!("Invalid insight JSON: {}", e)))
        }
        _ => Err(Error::MalformedResponse(format!(
            "No JSON array found in insight response | Raw: {}",
            truncate(response)
        ))),
    }
}

/// Locate the outermost JSON object in a response
fn find_object(response: &str) -> Result<&str> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::MalformedResponse(format!(
            "No JSON found in response | Raw: {}",
            truncate(response)
        ))),
    }
}

/// Truncate long responses for error messages
///
/// Cuts on a char boundary; model output is arbitrary UTF-8 and a byte
/// slice could split a multibyte character.
fn truncate(s: &str) -> String {
    match s.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::DocumentType;

    #[test]
    fn test_parse_extraction_valid() {
        let response = r#"{
            "is_valid_document": true,
            "document_type": "receipt",
            "transactions": [
                {"date": "2025-03-14", "amount": 12.50, "category": "food",
                 "description": "Sandwich", "kind": "expense"}
            ],
            "analysis": "A lunch receipt with one item.",
            "confidence": 0.92
        }"#;

        let result = parse_extraction(response).unwrap();
        assert!(result.is_valid_document);
        assert_eq!(result.document_type, DocumentType::Receipt);
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions[0].amount, 12.50);
        assert!((result.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_extraction_with_surrounding_text() {
        let response = r#"Here is the result:
{"is_valid_document": false, "document_type": "other", "rejection_reason": "not a financial document", "analysis": ""}
Done!"#;

        let result = parse_extraction(response).unwrap();
        assert!(!result.is_valid_document);
        assert_eq!(
            result.rejection_reason.as_deref(),
            Some("not a financial document")
        );
        assert!(result.transactions.is_empty());
    }

    #[test]
    fn test_parse_extraction_not_json() {
        let err = parse_extraction("I could not read the image, sorry.").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_extraction_multibyte_garbage() {
        // A long undecodable payload with a multibyte character straddling
        // the truncation point must produce an error, not a panic
        let response = format!("{{{}€€ not valid json}}", "a".repeat(198));
        let err = parse_extraction(&response).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        let long = "é".repeat(300);
        let cut = truncate(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);

        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_parse_extraction_wrong_shape() {
        let err = parse_extraction(r#"{"valid": "yes"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_chat_reply() {
        let response = r#"{"message": "That charge is a monthly fee.", "suggestions": ["Show me the statement"]}"#;
        let reply = parse_chat_reply(response).unwrap();
        assert_eq!(reply.message, "That charge is a monthly fee.");
        assert_eq!(reply.suggestions.len(), 1);
    }

    #[test]
    fn test_parse_chat_reply_missing_suggestions() {
        let reply = parse_chat_reply(r#"{"message": "Hello"}"#).unwrap();
        assert!(reply.suggestions.is_empty());
    }

    #[test]
    fn test_parse_insights() {
        let response = r#"Observations:
["Food spending is up this month", "Two subscriptions renewed on the same day"]"#;
        let insights = parse_insights(response).unwrap();
        assert_eq!(insights.len(), 2);
    }

    #[test]
    fn test_parse_insights_not_a_list() {
        let err = parse_insights(r#"{"message": "no insights"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
