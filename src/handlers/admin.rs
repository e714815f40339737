// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, field_error},
    models::question::{
        ChoiceDetail, CreateQuestionRequest, QuestionDetail, UpdateQuestionRequest,
    },
};

/// Creates a new question together with its choices.
/// Admin only. The question and all its choices land in one transaction.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let quiz: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
        .bind(payload.quiz)
        .fetch_optional(&mut *tx)
        .await?;
    if quiz.is_none() {
        return Err(field_error(
            "quiz",
            "does_not_exist",
            format!("Invalid quiz id {} - quiz does not exist.", payload.quiz),
        ));
    }

    let question_id: i64 =
        sqlx::query_scalar("INSERT INTO questions (quiz_id, text) VALUES (?, ?) RETURNING id")
            .bind(payload.quiz)
            .bind(&payload.text)
            .fetch_one(&mut *tx)
            .await?;

    let mut choices = Vec::with_capacity(payload.choices.len());
    for choice in &payload.choices {
        let choice_id: i64 = sqlx::query_scalar(
            "INSERT INTO choices (question_id, text, is_correct) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(question_id)
        .bind(&choice.text)
        .bind(choice.is_correct)
        .fetch_one(&mut *tx)
        .await?;

        choices.push(ChoiceDetail {
            id: choice_id,
            text: choice.text.clone(),
            is_correct: choice.is_correct,
        });
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(QuestionDetail {
            id: question_id,
            quiz: payload.quiz,
            text: payload.text,
            choices,
        }),
    ))
}

/// Updates a question by ID.
/// Admin only. Text is updated when present; a present choice list
/// replaces the question's whole choice set.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let quiz_id: i64 = sqlx::query_scalar("SELECT quiz_id FROM questions WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if let Some(text) = &payload.text {
        sqlx::query("UPDATE questions SET text = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(new_choices) = &payload.choices {
        sqlx::query("DELETE FROM choices WHERE question_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for choice in new_choices {
            sqlx::query("INSERT INTO choices (question_id, text, is_correct) VALUES (?, ?, ?)")
                .bind(id)
                .bind(&choice.text)
                .bind(choice.is_correct)
                .execute(&mut *tx)
                .await?;
        }
    }

    let text: String = sqlx::query_scalar("SELECT text FROM questions WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    let choices: Vec<ChoiceDetail> = sqlx::query_as(
        "SELECT id, text, is_correct FROM choices WHERE question_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(QuestionDetail {
        id,
        quiz: quiz_id,
        text,
        choices,
    }))
}

/// Deletes a question by ID.
/// Admin only. Its choices cascade away with it.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
