use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    models::question::{PublicChoice, PublicQuestion},
};

/// Helper struct for the question listing query.
#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    text: String,
}

/// Helper struct for the choice listing query.
#[derive(sqlx::FromRow)]
struct ChoiceRow {
    id: i64,
    question_id: i64,
    text: String,
}

/// Returns a quiz's questions in a fresh random order, each with its
/// choices also randomly ordered. Correct-answer flags never appear.
///
/// A quiz with no questions and a quiz id that matches nothing are
/// indistinguishable: both answer 404.
pub async fn list_quiz_questions(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions: Vec<QuestionRow> =
        sqlx::query_as("SELECT id, text FROM questions WHERE quiz_id = ? ORDER BY RANDOM()")
            .bind(quiz_id)
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch questions for quiz {}: {:?}", quiz_id, e);
                AppError::InternalServerError(e.to_string())
            })?;

    if questions.is_empty() {
        return Err(AppError::NotFound(
            "No questions found for this quiz.".to_string(),
        ));
    }

    // One IN clause for all choices, also shuffled by the database.
    // Grouping below keeps that order within each question.
    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, text FROM choices WHERE question_id IN (",
    );

    let mut separated = query_builder.separated(",");
    for question in &questions {
        separated.push_bind(question.id);
    }
    separated.push_unseparated(") ORDER BY RANDOM()");

    let choice_rows: Vec<ChoiceRow> = query_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch choices for quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    let mut choices_by_question: HashMap<i64, Vec<PublicChoice>> = HashMap::new();
    for row in choice_rows {
        choices_by_question
            .entry(row.question_id)
            .or_default()
            .push(PublicChoice {
                id: row.id,
                text: row.text,
            });
    }

    let body: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|question| PublicQuestion {
            id: question.id,
            text: question.text,
            choices: choices_by_question
                .remove(&question.id)
                .unwrap_or_default(),
        })
        .collect();

    Ok(Json(body))
}
