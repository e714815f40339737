// tests/quiz_api_tests.rs

use quiz_backend::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Each test gets its own in-memory SQLite database; the single pooled
/// connection is pinned open so the database outlives individual requests.
/// Returns the base URL and the pool for direct seeding/assertions.
async fn spawn_app() -> (String, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        jwt_refresh_expiration: 3600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_name() -> String {
    format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a user and returns an access token for them.
async fn obtain_token(client: &reqwest::Client, address: &str, username: &str) -> String {
    client
        .post(&format!("{}/api/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");

    let tokens: serde_json::Value = client
        .post(&format!("{}/api/token", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Token request failed")
        .json()
        .await
        .expect("Failed to parse token json");

    tokens["access"].as_str().expect("access token missing").to_string()
}

/// Registers a user, promotes them to admin directly in the database,
/// and only then obtains a token, so the role claim is already 'admin'.
async fn obtain_admin_token(
    client: &reqwest::Client,
    address: &str,
    pool: &SqlitePool,
) -> String {
    let username = unique_name();

    client
        .post(&format!("{}/api/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");

    sqlx::query("UPDATE users SET role = 'admin' WHERE username = ?")
        .bind(&username)
        .execute(pool)
        .await
        .expect("Failed to promote user");

    let tokens: serde_json::Value = client
        .post(&format!("{}/api/token", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Token request failed")
        .json()
        .await
        .expect("Failed to parse token json");

    tokens["access"].as_str().expect("access token missing").to_string()
}

/// Creates a quiz through the API and returns its id.
async fn create_quiz(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    title: &str,
) -> i64 {
    let response = client
        .post(&format!("{}/quiz", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "title": title }))
        .send()
        .await
        .expect("Create quiz failed");

    assert_eq!(response.status().as_u16(), 201);
    let quiz: serde_json::Value = response.json().await.unwrap();
    quiz["id"].as_i64().expect("quiz id missing")
}

/// Creates a question with one correct and one wrong choice; returns its id.
async fn create_question(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    quiz_id: i64,
    text: &str,
) -> i64 {
    let response = client
        .post(&format!("{}/api/admin/questions", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "quiz": quiz_id,
            "text": text,
            "choices": [
                { "text": "Right", "is_correct": true },
                { "text": "Wrong" }
            ]
        }))
        .send()
        .await
        .expect("Create question failed");

    assert_eq!(response.status().as_u16(), 201);
    let question: serde_json::Value = response.json().await.unwrap();
    question["id"].as_i64().expect("question id missing")
}

#[tokio::test]
async fn quiz_crud_flow() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;

    // 1. Create with defaults
    let create_resp = client
        .post(&format!("{}/quiz", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "title": "Rust basics",
            "description": "Ownership and borrowing"
        }))
        .send()
        .await
        .expect("Create failed");

    assert_eq!(create_resp.status().as_u16(), 201);
    let quiz: serde_json::Value = create_resp.json().await.unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();
    assert_eq!(quiz["title"], "Rust basics");
    assert_eq!(quiz["question_count"], 10);
    assert_eq!(quiz["shuffle_questions"], true);
    assert_eq!(quiz["shuffle_choices"], true);

    // 2. It shows up in the catalog
    let list: Vec<serde_json::Value> = client
        .get(&format!("{}/quiz", address))
        .send()
        .await
        .expect("List failed")
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"].as_i64().unwrap(), quiz_id);

    // 3. Update the title only; description must survive
    let update_resp = client
        .put(&format!("{}/quiz/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "title": "Rust fundamentals" }))
        .send()
        .await
        .expect("Update failed");

    assert_eq!(update_resp.status().as_u16(), 200);
    let updated: serde_json::Value = update_resp.json().await.unwrap();
    assert_eq!(updated["title"], "Rust fundamentals");
    assert_eq!(updated["description"], "Ownership and borrowing");

    // 4. Delete
    let delete_resp = client
        .delete(&format!("{}/quiz/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Delete failed");
    assert_eq!(delete_resp.status().as_u16(), 204);

    // 5. Gone
    let get_resp = client
        .get(&format!("{}/quiz/{}", address, quiz_id))
        .send()
        .await
        .expect("Get failed");
    assert_eq!(get_resp.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_mutations_require_admin() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let user_token = obtain_token(&client, &address, &unique_name()).await;

    // Act: plain user
    let forbidden = client
        .post(&format!("{}/quiz", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&serde_json::json!({ "title": "Nope" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Act: no token
    let unauthorized = client
        .post(&format!("{}/quiz", address))
        .json(&serde_json::json!({ "title": "Nope" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(forbidden.status().as_u16(), 403);
    assert_eq!(unauthorized.status().as_u16(), 401);
}

#[tokio::test]
async fn create_quiz_rejects_empty_title() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;

    // Act
    let response = client
        .post(&format!("{}/quiz", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "title": "" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"]["title"].is_array());
}

#[tokio::test]
async fn update_missing_quiz_returns_404() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;

    // Act
    let response = client
        .put(&format!("{}/quiz/424242", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "title": "Ghost" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn update_of_deleted_quiz_returns_404() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let quiz_id = create_quiz(&client, &address, &admin_token, "Short-lived").await;

    let delete_resp = client
        .delete(&format!("{}/quiz/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Delete failed");
    assert_eq!(delete_resp.status().as_u16(), 204);

    // Act: the row is gone; updating it must answer 404, never a 500
    let response = client
        .put(&format!("{}/quiz/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "title": "Too late" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn question_listing_has_choices_but_never_answers() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let quiz_id = create_quiz(&client, &address, &admin_token, "Leak check").await;

    let q1 = create_question(&client, &address, &admin_token, quiz_id, "First?").await;
    let q2 = create_question(&client, &address, &admin_token, quiz_id, "Second?").await;

    // Act
    let response = client
        .get(&format!("{}/quiz/questions/{}", address, quiz_id))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let raw = response.text().await.unwrap();
    assert!(
        !raw.contains("is_correct"),
        "correct-answer flag leaked into the listing: {}",
        raw
    );

    let questions: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(questions.len(), 2);

    let mut seen: Vec<i64> = questions
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    seen.sort();
    let mut expected = vec![q1, q2];
    expected.sort();
    assert_eq!(seen, expected);

    for question in &questions {
        let choices = question["choices"].as_array().unwrap();
        assert_eq!(choices.len(), 2);
        for choice in choices {
            assert!(choice["id"].as_i64().is_some());
            assert!(choice["text"].as_str().is_some());
        }
    }
}

#[tokio::test]
async fn question_listing_returns_all_questions_in_fresh_order() {
    // Arrange: more questions than the default question_count, to pin
    // down that the listing always serves the full set.
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let quiz_id = create_quiz(&client, &address, &admin_token, "Shuffle check").await;

    for i in 0..12 {
        create_question(&client, &address, &admin_token, quiz_id, &format!("Q{}", i)).await;
    }

    // Act: two consecutive listings
    let mut orders: Vec<Vec<i64>> = Vec::new();
    for _ in 0..2 {
        let questions: Vec<serde_json::Value> = client
            .get(&format!("{}/quiz/questions/{}", address, quiz_id))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .unwrap();
        orders.push(
            questions
                .iter()
                .map(|q| q["id"].as_i64().unwrap())
                .collect(),
        );
    }
    let first = orders.remove(0);
    let second = orders.remove(0);

    // Assert: same set, almost surely different order (12! permutations)
    assert_eq!(first.len(), 12);
    assert_eq!(second.len(), 12);

    let mut first_sorted = first.clone();
    let mut second_sorted = second.clone();
    first_sorted.sort();
    second_sorted.sort();
    assert_eq!(first_sorted, second_sorted);

    assert_ne!(first, second, "two listings came back in identical order");
}

#[tokio::test]
async fn question_listing_is_404_for_empty_and_unknown_quiz() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let empty_quiz = create_quiz(&client, &address, &admin_token, "No questions yet").await;

    // Act + Assert: empty quiz, twice (the answer must not flap)
    for _ in 0..2 {
        let response = client
            .get(&format!("{}/quiz/questions/{}", address, empty_quiz))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 404);
    }

    // Act + Assert: unknown quiz id looks exactly the same
    let response = client
        .get(&format!("{}/quiz/questions/424242", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn question_update_replaces_choice_set() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let quiz_id = create_quiz(&client, &address, &admin_token, "Editable").await;
    let question_id = create_question(&client, &address, &admin_token, quiz_id, "Old text").await;

    // Act
    let response = client
        .put(&format!("{}/api/admin/questions/{}", address, question_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "text": "New text",
            "choices": [
                { "text": "A", "is_correct": false },
                { "text": "B", "is_correct": true },
                { "text": "C", "is_correct": false }
            ]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let question: serde_json::Value = response.json().await.unwrap();
    assert_eq!(question["text"], "New text");
    assert_eq!(question["choices"].as_array().unwrap().len(), 3);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM choices WHERE question_id = ?")
        .bind(question_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 3);
}

#[tokio::test]
async fn question_delete_cascades_choices() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let quiz_id = create_quiz(&client, &address, &admin_token, "Shrinking").await;
    let question_id = create_question(&client, &address, &admin_token, quiz_id, "Doomed?").await;

    // Act
    let response = client
        .delete(&format!("{}/api/admin/questions/{}", address, question_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 204);

    let leftover: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM choices WHERE question_id = ?")
        .bind(question_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(leftover, 0);

    // The quiz has no questions left, so the listing 404s again
    let listing = client
        .get(&format!("{}/quiz/questions/{}", address, quiz_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(listing.status().as_u16(), 404);
}

#[tokio::test]
async fn question_authoring_requires_admin() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let user_token = obtain_token(&client, &address, &unique_name()).await;
    let quiz_id = create_quiz(&client, &address, &admin_token, "Locked").await;

    // Act
    let response = client
        .post(&format!("{}/api/admin/questions", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&serde_json::json!({
            "quiz": quiz_id,
            "text": "Sneaky?",
            "choices": [{ "text": "Yes", "is_correct": true }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn create_question_rejects_unknown_quiz() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;

    // Act
    let response = client
        .post(&format!("{}/api/admin/questions", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "quiz": 424242,
            "text": "Orphan?",
            "choices": [{ "text": "Yes", "is_correct": true }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"]["quiz"].is_array());

    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(questions, 0);
}

#[tokio::test]
async fn create_question_requires_at_least_one_choice() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = obtain_admin_token(&client, &address, &pool).await;
    let quiz_id = create_quiz(&client, &address, &admin_token, "Choiceless").await;

    // Act: an empty choice list fails the list-level length check, whose
    // error detail carries the rejected list itself
    let response = client
        .post(&format!("{}/api/admin/questions", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "quiz": quiz_id,
            "text": "No options?",
            "choices": []
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"]["choices"].is_array());

    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(questions, 0);
}
