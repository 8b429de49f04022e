//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{EvaluationResult, GuidelineSection, QualityLevel, ShopItem};
use crate::quiz::{AnswerOutcome, SessionSnapshot};

/// Messages the client can send over WebSocket.
/// Quiz messages act on the session owned by the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Guidelines,
    Shop,
    Evaluate {
        code: String,
    },
    StartQuiz {
        /// Random sample of this many questions; the whole bank when absent.
        #[serde(default)]
        questions: Option<usize>,
    },
    QuizState,
    SubmitAnswer {
        choice: usize,
    },
    Advance,
    Purchase {
        #[serde(rename = "itemId")]
        item_id: String,
    },
    SelectCosmetic {
        #[serde(rename = "itemId")]
        item_id: String,
    },
    UseFiftyFifty,
    UseHint,
    Skip,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Guidelines {
        sections: Vec<GuidelineSection>,
    },
    Shop {
        items: Vec<ShopItem>,
    },
    Evaluation {
        result: EvaluationOut,
    },
    Quiz {
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<AnswerOutcome>,
        session: SessionSnapshot,
    },
    Error {
        code: String,
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct EvaluateIn {
    pub code: String,
}

/// Code checker reply: the parsed result plus its quality band.
#[derive(Debug, Serialize)]
pub struct EvaluationOut {
    #[serde(flatten)]
    pub result: EvaluationResult,
    pub quality: QualityOut,
}

#[derive(Debug, Serialize)]
pub struct QualityOut {
    pub level: QualityLevel,
    pub label: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

impl From<EvaluationResult> for EvaluationOut {
    fn from(result: EvaluationResult) -> Self {
        let level = result.quality();
        let quality = QualityOut {
            level,
            label: level.label(),
            description: level.description(),
            color: level.color(),
        };
        Self { result, quality }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartIn {
    #[serde(default)]
    pub questions: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub choice: usize,
}

/// Body of both purchase and cosmetic selection.
#[derive(Debug, Deserialize)]
pub struct PurchaseIn {
    #[serde(rename = "itemId")]
    pub item_id: String,
}

/// Reply for every quiz endpoint: the session after the operation,
/// plus the answer feedback when one was submitted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOut {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerOutcome>,
    pub session: SessionSnapshot,
}

#[derive(Serialize)]
pub struct GuidelinesOut {
    pub sections: Vec<GuidelineSection>,
}

#[derive(Serialize)]
pub struct ShopOut {
    pub items: Vec<ShopItem>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: &'static str,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub evaluator_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_reply_carries_the_quality_band() {
        let out = EvaluationOut::from(EvaluationResult {
            score: 55,
            observations: vec![],
            issues: vec!["long lines".into()],
            recommendations: vec![],
        });
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["score"], 55);
        assert_eq!(json["issues"][0], "long lines");
        assert_eq!(json["quality"]["level"], "below_average");
        assert_eq!(json["quality"]["label"], "Below average");
        assert_eq!(json["quality"]["color"], "#e67e22");
    }

    #[test]
    fn start_message_accepts_an_optional_count() {
        let plain: ClientWsMessage = serde_json::from_str(r#"{"type":"start_quiz"}"#).unwrap();
        assert!(matches!(plain, ClientWsMessage::StartQuiz { questions: None }));
        let sampled: ClientWsMessage = serde_json::from_str(r#"{"type":"start_quiz","questions":5}"#).unwrap();
        assert!(matches!(sampled, ClientWsMessage::StartQuiz { questions: Some(5) }));
    }
}
