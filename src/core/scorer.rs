//! Relevance scoring of a (profile, job description) pair.
//!
//! The model behind [`MatchModel`] is opaque: it receives the student
//! profile and the job description and answers with a JSON object. The
//! scorer owns the fixed instruction, the response schema, and the mapping of
//! every failure into a zero-score result; callers never see an error.

use crate::models::{MatchOrigin, MatchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub const LOGIN_PROMPT: &str = "Log in and complete your profile to see your AI match score.";
pub const FEATURE_UNAVAILABLE: &str =
    "The AI matching feature is not available at the moment. Please try again later.";
pub const SCORING_FAILED: &str = "Could not determine match score due to an error.";

const INSTRUCTION: &str = "You are an AI job matching expert. Given a student profile and a job \
description, determine how well the job matches the student. Provide a matchScore from 0 to 100 \
and a justification for the score. The justification should reference specific skills and \
experiences from the student profile that align with the job requirements. Be concise.";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Access denied (status {status}): {message}")]
    PermissionDenied { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Malformed model response: {0}")]
    Malformed(String),
}

/// Request sent to the scoring model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInput {
    #[serde(rename = "studentProfile")]
    pub student_profile: String,
    #[serde(rename = "jobDescription")]
    pub job_description: String,
}

/// Remote scoring function. Returns the model's raw JSON answer.
#[async_trait]
pub trait MatchModel: Send + Sync {
    async fn evaluate(&self, input: &MatchInput) -> Result<Value, ModelError>;
}

/// Full prompt text for a match request
pub fn render_prompt(input: &MatchInput) -> String {
    format!(
        "{}\n\nStudent Profile:\n{}\n\nJob Description:\n{}",
        INSTRUCTION, input.student_profile, input.job_description
    )
}

/// Schema-checked model answer
#[derive(Debug, Clone, PartialEq)]
pub struct MatchVerdict {
    pub score: u8,
    pub justification: String,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(rename = "matchScore")]
    match_score: Option<f64>,
    justification: Option<String>,
}

impl MatchVerdict {
    /// Validate a raw model answer: both fields required, score finite and
    /// within 0..=100. Fractional scores are rounded.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let raw: RawVerdict = serde_json::from_value(value)
            .map_err(|e| ModelError::Malformed(e.to_string()))?;

        let score = raw
            .match_score
            .ok_or_else(|| ModelError::Malformed("missing matchScore".into()))?;
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(ModelError::Malformed(format!("matchScore out of range: {}", score)));
        }

        let justification = raw
            .justification
            .map(|j| j.trim().to_string())
            .filter(|j| !j.is_empty())
            .ok_or_else(|| ModelError::Malformed("missing justification".into()))?;

        Ok(Self {
            score: score.round() as u8,
            justification,
        })
    }
}

/// Scores job relevance for a profile, degrading every failure to a zero score
#[derive(Clone)]
pub struct RelevanceScorer {
    model: Arc<dyn MatchModel>,
}

impl RelevanceScorer {
    pub fn new(model: Arc<dyn MatchModel>) -> Self {
        Self { model }
    }

    /// Score `job_description` against `profile`.
    ///
    /// An empty profile short-circuits without calling the model.
    pub async fn score(&self, profile: &str, job_description: &str) -> MatchResult {
        if profile.trim().is_empty() {
            return MatchResult::new(0, LOGIN_PROMPT, MatchOrigin::EmptyProfile);
        }

        let input = MatchInput {
            student_profile: profile.to_string(),
            job_description: job_description.to_string(),
        };

        let verdict = match self.model.evaluate(&input).await {
            Ok(value) => MatchVerdict::from_value(value),
            Err(e) => Err(e),
        };

        match verdict {
            Ok(verdict) => {
                tracing::debug!("Model scored match at {}", verdict.score);
                MatchResult::new(verdict.score, verdict.justification, MatchOrigin::Model)
            }
            Err(ModelError::PermissionDenied { status, message }) => {
                tracing::warn!("Scoring model refused access ({}): {}", status, message);
                MatchResult::new(0, FEATURE_UNAVAILABLE, MatchOrigin::Unavailable)
            }
            Err(e) => {
                tracing::error!("Error in AI job matching: {}", e);
                MatchResult::new(0, SCORING_FAILED, MatchOrigin::Failed)
            }
        }
    }
}
