use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Body of `POST /api/coach`
///
/// Every field is optional at the wire level so that missing values can be
/// reported with the coach's own error message.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoachRequest {
    /// Notes or topic to study
    #[serde(default)]
    pub prompt: Option<String>,
    /// One of quiz, flashcards, summary, explain
    #[serde(default)]
    pub mode: Option<String>,
    /// Stable identifier for per-user limits. Numbers and other non-string
    /// values are keyed by their JSON text; null, false and 0 count as absent.
    #[serde(default, deserialize_with = "user_key")]
    pub user_id: Option<String>,
}

fn user_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Successful response: the model's JSON, passed through as-is
#[derive(Debug, Serialize, ToSchema)]
pub struct CoachResponse {
    #[schema(value_type = Object)]
    pub result: serde_json::Value,
}

/// Study-aid generation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    Quiz,
    Flashcards,
    Summary,
    Explain,
}

impl PromptMode {
    pub const ALL: [PromptMode; 4] = [
        PromptMode::Quiz,
        PromptMode::Flashcards,
        PromptMode::Summary,
        PromptMode::Explain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromptMode::Quiz => "quiz",
            PromptMode::Flashcards => "flashcards",
            PromptMode::Summary => "summary",
            PromptMode::Explain => "explain",
        }
    }

    /// Output ceiling in tokens. Multi-item outputs get more room than prose.
    pub fn max_tokens(self) -> u32 {
        match self {
            PromptMode::Quiz | PromptMode::Flashcards => 1500,
            PromptMode::Summary | PromptMode::Explain => 800,
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl FromStr for PromptMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_modes() {
        for mode in PromptMode::ALL {
            assert_eq!(mode.as_str().parse::<PromptMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Quiz".parse::<PromptMode>().is_err());
        assert!("essay".parse::<PromptMode>().is_err());
        assert!("".parse::<PromptMode>().is_err());
    }

    #[test]
    fn test_max_tokens() {
        assert_eq!(PromptMode::Quiz.max_tokens(), 1500);
        assert_eq!(PromptMode::Flashcards.max_tokens(), 1500);
        assert_eq!(PromptMode::Summary.max_tokens(), 800);
        assert_eq!(PromptMode::Explain.max_tokens(), 800);
    }

    #[test]
    fn test_request_accepts_camel_case_user_id() {
        let request: CoachRequest =
            serde_json::from_str(r#"{"prompt":"cells","mode":"quiz","userId":"u-1"}"#).unwrap();
        assert_eq!(request.prompt.as_deref(), Some("cells"));
        assert_eq!(request.mode.as_deref(), Some("quiz"));
        assert_eq!(request.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_request_accepts_non_string_user_id() {
        let request: CoachRequest =
            serde_json::from_str(r#"{"prompt":"cells","mode":"quiz","userId":42}"#).unwrap();
        assert_eq!(request.prompt.as_deref(), Some("cells"));
        assert_eq!(request.user_id.as_deref(), Some("42"));

        for falsy in ["null", "false", "0"] {
            let body = format!(r#"{{"prompt":"cells","mode":"quiz","userId":{falsy}}}"#);
            let request: CoachRequest = serde_json::from_str(&body).unwrap();
            assert_eq!(request.mode.as_deref(), Some("quiz"));
            assert!(request.user_id.is_none(), "{falsy}");
        }
    }

    #[test]
    fn test_request_fields_are_optional() {
        let request: CoachRequest = serde_json::from_str("{}").unwrap();
        assert!(request.prompt.is_none());
        assert!(request.mode.is_none());
        assert!(request.user_id.is_none());
    }
}
