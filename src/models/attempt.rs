// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// One stored answer, in the shape the API returns it:
/// `{ "id": .., "question": .., "selected_choice": .. }`.
#[derive(Debug, Serialize, FromRow)]
pub struct AnswerResponse {
    pub id: i64,
    pub question: i64,
    pub selected_choice: i64,
}

/// A graded attempt together with its recorded answers.
#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub id: i64,
    /// Id of the quiz this attempt was for.
    pub quiz: i64,
    pub submitted_at: DateTime<Utc>,
    pub score: i64,
    pub answers: Vec<AnswerResponse>,
}

/// DTO for submitting an attempt. An empty answer list is a valid
/// submission and scores zero.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub quiz: i64,
    pub answers: Vec<SubmittedAnswer>,
}

/// One (question, selected choice) pair inside a submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question: i64,
    pub selected_choice: i64,
}
