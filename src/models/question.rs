// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Choice as shown to quiz takers.
/// There is deliberately no correctness field here, so the flag cannot
/// leak into quiz-taking responses.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicChoice {
    pub id: i64,
    pub text: String,
}

/// Question with its choices, as shown to quiz takers.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub choices: Vec<PublicChoice>,
}

/// Full choice view for content authors, including the answer key.
#[derive(Debug, Serialize, FromRow)]
pub struct ChoiceDetail {
    pub id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Question with its choices, as returned to content authors.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    pub id: i64,
    /// Id of the owning quiz.
    pub quiz: i64,
    pub text: String,
    pub choices: Vec<ChoiceDetail>,
}

/// DTO for creating a question together with its choices.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    /// Id of the quiz this question belongs to.
    pub quiz: i64,
    #[validate(length(min = 1, max = 2000, message = "Question text must not be empty."))]
    pub text: String,
    #[validate(length(min = 1, message = "At least one choice is required."), nested)]
    pub choices: Vec<CreateChoiceRequest>,
}

/// One choice inside a create or update payload.
/// Also serializable: a failed `length` check on a choice list embeds
/// the rejected list in the validation error's params.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateChoiceRequest {
    #[validate(length(min = 1, max = 500, message = "Choice text must not be empty."))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for updating a question. Omitted fields are left untouched;
/// a present `choices` list replaces the whole choice set.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000, message = "Question text must not be empty."))]
    pub text: Option<String>,
    #[validate(length(min = 1, message = "At least one choice is required."), nested)]
    pub choices: Option<Vec<CreateChoiceRequest>>,
}
