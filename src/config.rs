//! Runtime configuration loaded from the environment.

use anyhow::{Context, Result};
use std::env;

/// Default Hugging Face endpoint serving the MARBERT sentiment model.
const DEFAULT_SENTIMENT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/UBC-NLP/MARBERTv2";

/// Default endpoint serving the mT5 summarization model.
const DEFAULT_SUMMARIZE_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/csebuetnlp/mT5_multilingual_XLSum";

/// All configuration the service needs, collected once at startup and
/// passed through `AppState` instead of read ad hoc from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub sentiment_endpoint: String,
    pub summarize_endpoint: String,
    pub hf_api_token: String,
    pub jwt_secret: String,
    pub batch_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let sentiment_endpoint = env::var("SENTIMENT_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_SENTIMENT_ENDPOINT.to_string());
        let summarize_endpoint = env::var("SUMMARIZE_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_SUMMARIZE_ENDPOINT.to_string());

        // The hosted inference API rejects anonymous requests, but an empty
        // token still lets local stubs run without one.
        let hf_api_token = env::var("HF_API_TOKEN").unwrap_or_default();

        let jwt_secret =
            env::var("AUTH_JWT_SECRET").unwrap_or_else(|_| "demo-secret".to_string());

        let batch_concurrency: usize = env::var("BATCH_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(4);

        Ok(Config {
            database_url,
            bind_addr,
            sentiment_endpoint,
            summarize_endpoint,
            hf_api_token,
            jwt_secret,
            batch_concurrency,
        })
    }
}
