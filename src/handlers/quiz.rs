// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{CreateQuizRequest, QuizResponse, UpdateQuizRequest},
    utils::jwt::Claims,
};

/// Lists every quiz in the catalog.
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes: Vec<QuizResponse> = sqlx::query_as(
        "SELECT id, title, description, question_count, shuffle_questions, shuffle_choices \
         FROM quizzes ORDER BY id",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Retrieves a single quiz by ID.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz: QuizResponse = sqlx::query_as(
        "SELECT id, title, description, question_count, shuffle_questions, shuffle_choices \
         FROM quizzes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Creates a new quiz.
/// Admin only. The caller becomes the quiz's author.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let created_by = claims.user_id()?;

    let quiz: QuizResponse = sqlx::query_as(
        "INSERT INTO quizzes \
         (title, description, question_count, shuffle_questions, shuffle_choices, created_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         RETURNING id, title, description, question_count, shuffle_questions, shuffle_choices",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.question_count.unwrap_or(10))
    .bind(payload.shuffle_questions.unwrap_or(true))
    .bind(payload.shuffle_choices.unwrap_or(true))
    .bind(created_by)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates a quiz by ID.
/// Admin only. Title is required; other fields are updated when present.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    separated.push("title = ");
    separated.push_bind_unseparated(payload.title);

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(question_count) = payload.question_count {
        separated.push("question_count = ");
        separated.push_bind_unseparated(question_count);
    }

    if let Some(shuffle_questions) = payload.shuffle_questions {
        separated.push("shuffle_questions = ");
        separated.push_bind_unseparated(shuffle_questions);
    }

    if let Some(shuffle_choices) = payload.shuffle_choices {
        separated.push("shuffle_choices = ");
        separated.push_bind_unseparated(shuffle_choices);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    // The row can be deleted between the UPDATE and this read.
    let quiz: QuizResponse = sqlx::query_as(
        "SELECT id, title, description, question_count, shuffle_questions, shuffle_choices \
         FROM quizzes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Deletes a quiz by ID.
/// Admin only. Questions, choices and attempts cascade away with it.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
