//! Client for the externally hosted inference endpoints (MARBERT
//! sentiment, mT5 summarization).
//!
//! The client is constructed once in `main` and shared through `AppState`.
//! Response bodies are validated at this boundary into typed results; the
//! hosted endpoints are not consistent about their output shape, so the
//! parser accepts every shape they are known to emit and rejects the rest
//! with a typed error.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference endpoint returned status {0}")]
    Status(u16),

    #[error("unrecognized inference response shape: {0}")]
    Shape(String),
}

/// Sentiment label attached to every analysis result. `Neutral` only
/// appears on the fallback path when the upstream body could not be
/// interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Validated sentiment scores. Probabilities are clamped to [0, 1] and
/// rounded to 4 decimals; `confidence` is always the larger of the two.
/// The two probabilities come from independent model outputs and need not
/// sum to 1.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SentimentScores {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub positive_prob: f64,
    pub negative_prob: f64,
}

impl SentimentScores {
    /// The 0.5/0.5 neutral result used when the upstream body could not be
    /// interpreted.
    pub fn neutral_fallback() -> Self {
        SentimentScores {
            sentiment: Sentiment::Neutral,
            confidence: 0.5,
            positive_prob: 0.5,
            negative_prob: 0.5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

// Every response shape the hosted sentiment endpoints are known to emit.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SentimentResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Wrapped { scores: Vec<LabelScore> },
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryResponse {
    List(Vec<SummaryItem>),
    Single(SummaryItem),
}

const POSITIVE_LABELS: &[&str] = &["positive", "pos", "label_1", "1"];
const NEGATIVE_LABELS: &[&str] = &["negative", "neg", "label_0", "0"];

/// Round to 4 decimal places, matching the precision of stored rows.
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn sanitize_prob(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn find_score(entries: &[LabelScore], labels: &[&str]) -> Option<f64> {
    entries
        .iter()
        .find(|e| labels.contains(&e.label.to_lowercase().as_str()))
        .map(|e| e.score)
}

/// Pull (positive, negative) raw scores out of a label/score list. When the
/// labels are unrecognized, fall back to positional order: index 0 is
/// negative, index 1 is positive.
fn extract_probs(entries: &[LabelScore]) -> Result<(f64, f64), InferenceError> {
    let pos = find_score(entries, POSITIVE_LABELS);
    let neg = find_score(entries, NEGATIVE_LABELS);

    match (pos, neg) {
        (Some(p), Some(n)) => Ok((p, n)),
        _ if entries.len() >= 2 => Ok((entries[1].score, entries[0].score)),
        _ => Err(InferenceError::Shape(format!(
            "fewer than two usable scores ({} entries)",
            entries.len()
        ))),
    }
}

/// Parse a sentiment endpoint body into validated scores.
pub fn parse_sentiment_body(body: &str) -> Result<SentimentScores, InferenceError> {
    let parsed: SentimentResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::Shape(e.to_string()))?;

    let entries = match parsed {
        SentimentResponse::Nested(mut rows) => {
            if rows.is_empty() {
                return Err(InferenceError::Shape("empty outer array".to_string()));
            }
            rows.remove(0)
        }
        SentimentResponse::Flat(entries) => entries,
        SentimentResponse::Wrapped { scores } => scores,
    };

    let (raw_pos, raw_neg) = extract_probs(&entries)?;
    let positive_prob = round4(sanitize_prob(raw_pos));
    let negative_prob = round4(sanitize_prob(raw_neg));

    let sentiment = if positive_prob > negative_prob {
        Sentiment::Positive
    } else {
        Sentiment::Negative
    };

    Ok(SentimentScores {
        sentiment,
        confidence: positive_prob.max(negative_prob),
        positive_prob,
        negative_prob,
    })
}

fn parse_summary_body(body: &str) -> Result<String, InferenceError> {
    let parsed: SummaryResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::Shape(e.to_string()))?;

    match parsed {
        SummaryResponse::List(items) => items
            .into_iter()
            .next()
            .map(|i| i.summary_text)
            .ok_or_else(|| InferenceError::Shape("empty summary array".to_string())),
        SummaryResponse::Single(item) => Ok(item.summary_text),
    }
}

/// Handle to the remote inference endpoints.
pub struct InferenceClient {
    http: Client,
    sentiment_endpoint: String,
    summarize_endpoint: String,
    token: String,
    model_source: String,
    summarize_source: String,
}

impl InferenceClient {
    pub fn new(config: &Config) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(InferenceClient {
            http,
            model_source: model_source_from(&config.sentiment_endpoint),
            summarize_source: model_source_from(&config.summarize_endpoint),
            sentiment_endpoint: config.sentiment_endpoint.clone(),
            summarize_endpoint: config.summarize_endpoint.clone(),
            token: config.hf_api_token.clone(),
        })
    }

    /// Which model served the sentiment requests, as stored with each row.
    pub fn model_source(&self) -> &str {
        &self.model_source
    }

    /// Which model serves summarization requests.
    pub fn summarize_source(&self) -> &str {
        &self.summarize_source
    }

    async fn post_inputs(
        &self,
        endpoint: &str,
        payload: serde_json::Value,
    ) -> Result<String, InferenceError> {
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Classify `text` with the remote MARBERT endpoint. Single attempt;
    /// retry policy is left to the caller.
    pub async fn classify_sentiment(&self, text: &str) -> Result<SentimentScores, InferenceError> {
        let body = self
            .post_inputs(
                &self.sentiment_endpoint,
                json!({ "inputs": text, "parameters": {} }),
            )
            .await?;
        parse_sentiment_body(&body)
    }

    /// Summarize `text` with the remote mT5 endpoint.
    pub async fn summarize(&self, text: &str) -> Result<String, InferenceError> {
        let body = self
            .post_inputs(
                &self.summarize_endpoint,
                json!({ "inputs": text, "parameters": { "max_length": 128 } }),
            )
            .await?;
        parse_summary_body(&body)
    }
}

fn model_source_from(endpoint: &str) -> String {
    match endpoint.split_once("/models/") {
        Some((_, model)) => model.trim_end_matches('/').to_string(),
        None => endpoint.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_array_shape_parses() {
        let body = r#"[[{"label":"positive","score":0.91},{"label":"negative","score":0.09}]]"#;
        let scores = parse_sentiment_body(body).unwrap();
        assert_eq!(scores.sentiment, Sentiment::Positive);
        assert_eq!(scores.positive_prob, 0.91);
        assert_eq!(scores.negative_prob, 0.09);
        assert_eq!(scores.confidence, 0.91);
    }

    #[test]
    fn flat_array_shape_parses() {
        let body = r#"[{"label":"NEGATIVE","score":0.8},{"label":"POSITIVE","score":0.2}]"#;
        let scores = parse_sentiment_body(body).unwrap();
        assert_eq!(scores.sentiment, Sentiment::Negative);
        assert_eq!(scores.confidence, 0.8);
    }

    #[test]
    fn wrapped_scores_shape_parses() {
        let body = r#"{"scores":[{"label":"label_0","score":0.3},{"label":"label_1","score":0.7}]}"#;
        let scores = parse_sentiment_body(body).unwrap();
        assert_eq!(scores.sentiment, Sentiment::Positive);
        assert_eq!(scores.positive_prob, 0.7);
        assert_eq!(scores.negative_prob, 0.3);
    }

    #[test]
    fn unrecognized_labels_fall_back_to_index_order() {
        // index 0 = negative, index 1 = positive
        let body = r#"[{"label":"stars_1","score":0.15},{"label":"stars_5","score":0.85}]"#;
        let scores = parse_sentiment_body(body).unwrap();
        assert_eq!(scores.sentiment, Sentiment::Positive);
        assert_eq!(scores.positive_prob, 0.85);
        assert_eq!(scores.negative_prob, 0.15);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let body = r#"[{"label":"negative","score":-0.2},{"label":"positive","score":1.7}]"#;
        let scores = parse_sentiment_body(body).unwrap();
        assert_eq!(scores.positive_prob, 1.0);
        assert_eq!(scores.negative_prob, 0.0);
        assert_eq!(scores.confidence, 1.0);
    }

    #[test]
    fn scores_round_to_four_decimals() {
        let body = r#"[{"label":"negative","score":0.123456},{"label":"positive","score":0.876544}]"#;
        let scores = parse_sentiment_body(body).unwrap();
        assert_eq!(scores.negative_prob, 0.1235);
        assert_eq!(scores.positive_prob, 0.8765);
        assert_eq!(scores.confidence, 0.8765);
    }

    #[test]
    fn confidence_always_max_of_probs() {
        for body in [
            r#"[[{"label":"positive","score":0.6},{"label":"negative","score":0.4}]]"#,
            r#"[{"label":"negative","score":0.55},{"label":"positive","score":0.45}]"#,
        ] {
            let scores = parse_sentiment_body(body).unwrap();
            assert_eq!(
                scores.confidence,
                scores.positive_prob.max(scores.negative_prob)
            );
        }
    }

    #[test]
    fn malformed_bodies_are_typed_errors() {
        for body in ["{}", "[]", "null", "\"ok\"", r#"{"foo":1}"#] {
            assert!(
                matches!(parse_sentiment_body(body), Err(InferenceError::Shape(_))),
                "body {:?} should be a shape error",
                body
            );
        }
    }

    #[test]
    fn single_unrecognized_entry_is_an_error() {
        let body = r#"[{"label":"mystery","score":0.9}]"#;
        assert!(matches!(
            parse_sentiment_body(body),
            Err(InferenceError::Shape(_))
        ));
    }

    #[test]
    fn non_finite_sanitized_to_half() {
        assert_eq!(sanitize_prob(f64::NAN), 0.5);
        assert_eq!(sanitize_prob(f64::INFINITY), 0.5);
        assert_eq!(sanitize_prob(0.25), 0.25);
    }

    #[test]
    fn summary_shapes_parse() {
        assert_eq!(
            parse_summary_body(r#"[{"summary_text":"ملخص"}]"#).unwrap(),
            "ملخص"
        );
        assert_eq!(
            parse_summary_body(r#"{"summary_text":"ملخص"}"#).unwrap(),
            "ملخص"
        );
        assert!(parse_summary_body("[]").is_err());
    }

    #[test]
    fn model_source_derived_from_endpoint() {
        assert_eq!(
            model_source_from("https://api-inference.huggingface.co/models/UBC-NLP/MARBERTv2"),
            "UBC-NLP/MARBERTv2"
        );
        assert_eq!(
            model_source_from("http://localhost:9000/sentiment"),
            "http://localhost:9000/sentiment"
        );
    }
}
