use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::{
    error::{AppError, field_error},
    models::attempt::{AnswerResponse, AttemptResponse, SubmitAttemptRequest, SubmittedAnswer},
    utils::jwt::Claims,
};

/// Helper struct for fetching the answer key of the selected choices.
#[derive(sqlx::FromRow)]
struct ChoiceKey {
    id: i64,
    is_correct: bool,
}

/// Counts how many selected choices are flagged correct.
/// A selection missing from the key contributes nothing; each submitted
/// pair is tallied on its own, so duplicates count once per occurrence.
fn count_correct(answers: &[SubmittedAnswer], answer_key: &HashMap<i64, bool>) -> i64 {
    answers
        .iter()
        .filter(|a| answer_key.get(&a.selected_choice).copied().unwrap_or(false))
        .count() as i64
}

/// Fetches which of the given question ids actually exist.
async fn fetch_known_question_ids(
    tx: &mut Transaction<'_, Sqlite>,
    ids: &[i64],
) -> Result<HashSet<i64>, AppError> {
    let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT id FROM questions WHERE id IN (");

    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let existing: Vec<i64> = query_builder
        .build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(existing.into_iter().collect())
}

/// Submits a user's answers for a quiz and grades them.
///
/// All referenced ids are validated before anything is written. The
/// attempt row, its answers and the final score are then written inside
/// one transaction, so no partially recorded attempt is ever visible.
/// Returns 201 Created with the graded attempt.
pub async fn save_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let quiz: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
        .bind(req.quiz)
        .fetch_optional(&mut *tx)
        .await?;
    if quiz.is_none() {
        return Err(field_error(
            "quiz",
            "does_not_exist",
            format!("Invalid quiz id {} - quiz does not exist.", req.quiz),
        ));
    }

    // Validate every referenced id up front; an empty submission is
    // legitimate and simply scores zero.
    let answer_key: HashMap<i64, bool> = if req.answers.is_empty() {
        HashMap::new()
    } else {
        let question_ids: Vec<i64> = req.answers.iter().map(|a| a.question).collect();
        let known_questions = fetch_known_question_ids(&mut tx, &question_ids).await?;
        for answer in &req.answers {
            if !known_questions.contains(&answer.question) {
                return Err(field_error(
                    "question",
                    "does_not_exist",
                    format!(
                        "Invalid question id {} - question does not exist.",
                        answer.question
                    ),
                ));
            }
        }

        let choice_ids: Vec<i64> = req.answers.iter().map(|a| a.selected_choice).collect();

        let mut query_builder =
            QueryBuilder::<Sqlite>::new("SELECT id, is_correct FROM choices WHERE id IN (");
        let mut separated = query_builder.separated(",");
        for id in &choice_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let choice_keys: Vec<ChoiceKey> = query_builder
            .build_query_as()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        let key: HashMap<i64, bool> = choice_keys
            .into_iter()
            .map(|c| (c.id, c.is_correct))
            .collect();

        for answer in &req.answers {
            if !key.contains_key(&answer.selected_choice) {
                return Err(field_error(
                    "selected_choice",
                    "does_not_exist",
                    format!(
                        "Invalid choice id {} - choice does not exist.",
                        answer.selected_choice
                    ),
                ));
            }
        }

        key
    };

    let submitted_at = Utc::now();

    let attempt_id: i64 = sqlx::query_scalar(
        "INSERT INTO attempts (user_id, quiz_id, submitted_at, score) \
         VALUES (?, ?, ?, 0) RETURNING id",
    )
    .bind(user_id)
    .bind(req.quiz)
    .bind(submitted_at)
    .fetch_one(&mut *tx)
    .await?;

    let mut answers = Vec::with_capacity(req.answers.len());
    for answer in &req.answers {
        let answer_id: i64 = sqlx::query_scalar(
            "INSERT INTO answers (attempt_id, question_id, selected_choice_id) \
             VALUES (?, ?, ?) RETURNING id",
        )
        .bind(attempt_id)
        .bind(answer.question)
        .bind(answer.selected_choice)
        .fetch_one(&mut *tx)
        .await?;

        answers.push(AnswerResponse {
            id: answer_id,
            question: answer.question,
            selected_choice: answer.selected_choice,
        });
    }

    // The score lands in a single update once every answer is recorded.
    let score = count_correct(&req.answers, &answer_key);
    sqlx::query("UPDATE attempts SET score = ? WHERE id = ?")
        .bind(score)
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        "User {} scored {}/{} on quiz {} (attempt {})",
        user_id,
        score,
        req.answers.len(),
        req.quiz,
        attempt_id
    );

    Ok((
        StatusCode::CREATED,
        Json(AttemptResponse {
            id: attempt_id,
            quiz: req.quiz,
            submitted_at,
            score,
            answers,
        }),
    ))
}

/// Query parameters for the latest-attempt lookup.
#[derive(Debug, Deserialize)]
pub struct FetchAttemptParams {
    pub quiz: Option<i64>,
}

/// Helper struct for the latest-attempt query.
#[derive(sqlx::FromRow)]
struct AttemptRow {
    id: i64,
    quiz_id: i64,
    submitted_at: DateTime<Utc>,
    score: i64,
}

/// Returns the caller's most recent attempt for the given quiz,
/// including its recorded answers. Ties on the submission timestamp
/// go to the higher attempt id.
pub async fn fetch_latest_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<FetchAttemptParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let quiz_id = params
        .quiz
        .ok_or(AppError::BadRequest("quiz ID required".to_string()))?;

    let attempt: AttemptRow = sqlx::query_as(
        "SELECT id, quiz_id, submitted_at, score FROM attempts \
         WHERE user_id = ? AND quiz_id = ? \
         ORDER BY submitted_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("No attempt found".to_string()))?;

    let answers: Vec<AnswerResponse> = sqlx::query_as(
        "SELECT id, question_id AS question, selected_choice_id AS selected_choice \
         FROM answers WHERE attempt_id = ? ORDER BY id",
    )
    .bind(attempt.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(AttemptResponse {
        id: attempt.id,
        quiz: attempt.quiz_id,
        submitted_at: attempt.submitted_at,
        score: attempt.score,
        answers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(question: i64, selected_choice: i64) -> SubmittedAnswer {
        SubmittedAnswer {
            question,
            selected_choice,
        }
    }

    #[test]
    fn test_count_correct_all() {
        let answers = vec![answer(1, 10), answer(2, 20)];
        let key = HashMap::from([(10, true), (20, true)]);

        assert_eq!(count_correct(&answers, &key), 2);
    }

    #[test]
    fn test_count_correct_mixed() {
        let answers = vec![answer(1, 10), answer(2, 21), answer(3, 30)];
        let key = HashMap::from([(10, true), (21, false), (30, true)]);

        assert_eq!(count_correct(&answers, &key), 2);
    }

    #[test]
    fn test_count_correct_none() {
        let answers = vec![answer(1, 11), answer(2, 21)];
        let key = HashMap::from([(11, false), (21, false)]);

        assert_eq!(count_correct(&answers, &key), 0);
    }

    #[test]
    fn test_count_correct_empty_submission() {
        let key = HashMap::from([(10, true)]);

        assert_eq!(count_correct(&[], &key), 0);
    }

    #[test]
    fn test_count_correct_ignores_unknown_choice() {
        let answers = vec![answer(1, 99)];
        let key = HashMap::from([(10, true)]);

        assert_eq!(count_correct(&answers, &key), 0);
    }
}
