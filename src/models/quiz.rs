// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Quiz as exposed by the API.
/// The stored row also carries `created_by` and `created_at`, which are
/// bookkeeping only and never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Intended number of questions per sitting. Stored for authors;
    /// question retrieval currently returns the full set.
    pub question_count: i64,
    pub shuffle_questions: bool,
    pub shuffle_choices: bool,
}

/// DTO for creating a quiz. Missing optional fields take the
/// catalog defaults (question_count 10, both shuffle flags on).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255, message = "Title must not be empty."))]
    pub title: String,
    pub description: Option<String>,
    pub question_count: Option<i64>,
    pub shuffle_questions: Option<bool>,
    pub shuffle_choices: Option<bool>,
}

/// DTO for updating a quiz. Title is required; omitted fields are
/// left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255, message = "Title must not be empty."))]
    pub title: String,
    pub description: Option<String>,
    pub question_count: Option<i64>,
    pub shuffle_questions: Option<bool>,
    pub shuffle_choices: Option<bool>,
}
