use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope every backend tool endpoint replies with. Business outcomes
/// (slot taken, outside hours) are carried as speakable text in `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse<T = Value> {
    pub result: T,
}

impl<T> ToolResponse<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

impl ToolResponse<Value> {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            result: Value::String(message.into()),
        }
    }

    /// Result rendered the way it is read back to a caller: strings verbatim,
    /// anything else as compact JSON.
    pub fn as_text(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_results_render_verbatim() {
        let response = ToolResponse::text("Appointment scheduled successfully.");
        assert_eq!(response.as_text(), "Appointment scheduled successfully.");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"result": "Appointment scheduled successfully."})
        );
    }

    #[test]
    fn test_structured_results_render_as_json() {
        let response = ToolResponse::new(json!([{"name": "Dr. Rao"}]));
        assert_eq!(response.as_text(), r#"[{"name":"Dr. Rao"}]"#);
    }
}
