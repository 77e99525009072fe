use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use exam_generator::{
    app::create_router,
    config::{Config, UpdateConfig},
    database::pool::create_pool,
    utils::crypto,
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;
use tower::ServiceExt;

const WIPE_PASSWORD: &str = "correct horse";

async fn test_app() -> (Router, AppState, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!("sqlite://{}/db.sqlite?mode=rwc", dir.path().display());
    let pool = create_pool(&database_url).await.expect("pool");

    let config = Config {
        server_address: "127.0.0.1:0".to_string(),
        database_url,
        images_dir: dir.path().join("images"),
        backup_dir: dir.path().join("backups"),
        test_size: 50,
        wipe_password_hash: Some(crypto::hash_password(WIPE_PASSWORD).expect("hash")),
        update: UpdateConfig {
            feed_url: None,
            current_version: "1.1.3".to_string(),
            asset_suffix: String::new(),
            check_interval_hours: 24,
            startup_delay_secs: 0,
        },
    };
    let state = AppState::new(pool, config).expect("state");
    (create_router(state.clone()), state, dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, body.to_vec())
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let (status, bytes) = send(app, request).await;
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

fn question(text: &str, category: &str, answer: &str) -> JsonValue {
    json!({
        "question": text,
        "answer": answer,
        "category": category,
        "choice_a": "Six inches",
        "choice_b": "Twelve inches",
        "choice_c": "Eighteen inches",
        "choice_d": ""
    })
}

async fn seed(app: &Router, category: &str, count: usize) {
    for i in 0..count {
        let (status, _) = send_json(
            app,
            "POST",
            "/api/questions",
            Some(question(&format!("{} question {}", category, i), category, "A")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

fn multipart(field: &str, filename: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "exam-generator-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

fn upload(uri: &str, field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let (header_value, body) = multipart(field, filename, content_type, data);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, header_value)
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn health_reports_database() {
    let (app, _state, _dir) = test_app().await;
    let (status, body) = send_json(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"]["database"], "healthy");
    assert_eq!(body["services"]["updates"], "disabled");
}

#[tokio::test]
async fn question_crud_and_search() {
    let (app, _state, _dir) = test_app().await;

    let (status, created) = send_json(
        &app,
        "POST",
        "/api/questions",
        Some(question("  Minimum burial depth for UF cable? ", "Code", " c ")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["question"], "Minimum burial depth for UF cable?");
    assert_eq!(created["answer"], "C");
    assert_eq!(created["choice_d"], JsonValue::Null);
    let id = created["id"].as_i64().unwrap();

    seed(&app, "Safety", 2).await;

    let (status, listed) = send_json(&app, "GET", "/api/questions", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[2]["id"].as_i64(), Some(id), "newest first");

    let (_, found) = send_json(&app, "GET", "/api/questions?search=uf%20cable", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, by_choice) = send_json(&app, "GET", "/api/questions?search=eighteen", None).await;
    assert_eq!(by_choice.as_array().unwrap().len(), 3);
    let (_, by_category) = send_json(&app, "GET", "/api/questions?category=Safety", None).await;
    assert_eq!(by_category.as_array().unwrap().len(), 2);

    let mut replacement = question("Minimum burial depth under a driveway?", "Code", "B");
    replacement["choice_c"] = json!(null);
    let (status, updated) =
        send_json(&app, "PUT", &format!("/api/questions/{}", id), Some(replacement)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["answer"], "B");
    assert_eq!(updated["choice_c"], JsonValue::Null);

    let (_, categories) = send_json(&app, "GET", "/api/categories", None).await;
    assert_eq!(
        categories["categories"],
        json!([
            { "category": "Code", "question_count": 1 },
            { "category": "Safety", "question_count": 2 }
        ])
    );

    let (status, _) = send_json(&app, "DELETE", &format!("/api/questions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send_json(&app, "GET", &format!("/api/questions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
    let (status, _) = send_json(&app, "DELETE", &format!("/api/questions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answer_must_name_a_filled_choice() {
    let (app, _state, _dir) = test_app().await;

    let (status, body) =
        send_json(&app, "POST", "/api/questions", Some(question("Which?", "Code", "D"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("A, B, C"));

    let mut missing_b = question("Which?", "Code", "A");
    missing_b["choice_b"] = json!("   ");
    let (status, _) = send_json(&app, "POST", "/api/questions", Some(missing_b)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn category_settings_round_trip() {
    let (app, _state, _dir) = test_app().await;
    seed(&app, "Safety", 10).await;
    seed(&app, "Code", 30).await;

    let (status, saved) = send_json(
        &app,
        "PUT",
        "/api/category-settings",
        Some(json!({ "weights": [
            { "category": "Safety", "percentage": 80 },
            { "category": "Code", "percentage": 20 },
            { "category": "Theory", "percentage": 0 }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["total_percentage"], 100);
    assert_eq!(saved["warning"], JsonValue::Null);
    assert_eq!(saved["weights"].as_array().unwrap().len(), 2);

    let (_, overview) = send_json(&app, "GET", "/api/category-settings", None).await;
    assert_eq!(overview["test_size"], 50);
    let rows = overview["categories"].as_array().unwrap();
    let safety = rows.iter().find(|r| r["category"] == "Safety").unwrap();
    assert_eq!(safety["target_count"], 40);
    assert_eq!(safety["question_count"], 10);
    let code = rows.iter().find(|r| r["category"] == "Code").unwrap();
    assert_eq!(code["target_count"], 10);
    assert!(overview["warnings"][0].as_str().unwrap().contains("backfilled"));

    let (status, partial) = send_json(
        &app,
        "PUT",
        "/api/category-settings",
        Some(json!({ "weights": [{ "category": "Code", "percentage": 60 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(partial["warning"].as_str().unwrap().contains("60%"));

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/category-settings",
        Some(json!({ "weights": [
            { "category": "Code", "percentage": 50 },
            { "category": "Code", "percentage": 50 }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/category-settings",
        Some(json!({ "weights": [{ "category": "Code", "percentage": 120 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reset) = send_json(&app, "DELETE", "/api/category-settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["removed"], 1);
}

#[tokio::test]
async fn generating_requires_positive_weights() {
    let (app, _state, _dir) = test_app().await;
    seed(&app, "Code", 5).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/tests/generate",
        Some(json!({ "name": "Jordan" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("positive weight"));

    let (status, _) = send_json(&app, "GET", "/api/tests/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generate_preview_and_download() {
    let (app, _state, _dir) = test_app().await;
    seed(&app, "Safety", 10).await;
    seed(&app, "Code", 30).await;
    send_json(
        &app,
        "PUT",
        "/api/category-settings",
        Some(json!({ "weights": [
            { "category": "Safety", "percentage": 80 },
            { "category": "Code", "percentage": 20 }
        ]})),
    )
    .await;

    let (status, generated) = send_json(
        &app,
        "POST",
        "/api/tests/generate",
        Some(json!({ "name": "Jordan Lee", "question_count": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let questions = generated["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 30);
    assert_eq!(generated["warning"], JsonValue::Null);
    let safety = questions.iter().filter(|q| q["category"] == "Safety").count();
    assert_eq!(safety, 10, "Safety is capped at its stock and the rest is backfilled");
    let mut ids: Vec<i64> = questions.iter().map(|q| q["id"].as_i64().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 30);

    let test_id = generated["id"].as_str().unwrap().to_string();
    assert_eq!(test_id.len(), 8);

    let (status, current) = send_json(&app, "GET", "/api/tests/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["id"], test_id.as_str());

    let (status, preview) = send(
        &app,
        Request::builder()
            .uri("/api/tests/current/preview")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let preview = String::from_utf8(preview).unwrap();
    assert!(preview.contains(&format!("Test ID: {}", test_id)));
    assert!(preview.starts_with("Journey-Level Proficiency Exam\n"));
    assert!(preview.contains("30. "));
    assert!(!preview.contains("Answer:"));

    for (uri, prefix) in [
        ("/api/tests/current/test.pdf", "Test_Jordan_Lee_ID"),
        ("/api/tests/current/answer-key.pdf", "AnswerKey_Jordan_Lee_ID"),
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains(&format!("{}{}_", prefix, test_id)), "{}", disposition);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"%PDF"));
    }
}

#[tokio::test]
async fn short_bank_returns_a_warning() {
    let (app, _state, _dir) = test_app().await;
    seed(&app, "Code", 12).await;
    send_json(
        &app,
        "PUT",
        "/api/category-settings",
        Some(json!({ "weights": [{ "category": "Code", "percentage": 100 }] })),
    )
    .await;

    let (status, generated) = send_json(
        &app,
        "POST",
        "/api/tests/generate",
        Some(json!({ "name": "Jordan" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(generated["questions"].as_array().unwrap().len(), 12);
    assert_eq!(generated["warning"], "Only 12 questions available. Need 50");

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/tests/generate",
        Some(json!({ "name": "Jordan", "question_count": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/tests/generate",
        Some(json!({ "name": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn excel_export_reimports_into_a_fresh_bank() {
    let (source, _state, _dir) = test_app().await;
    seed(&source, "Code", 3).await;
    seed(&source, "Safety", 2).await;

    let response = source
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/export/questions.xlsx")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let workbook = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let (target, _state2, _dir2) = test_app().await;
    let (status, body) = send(
        &target,
        upload(
            "/api/import/excel",
            "file",
            "bank.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            &workbook,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["imported"], 5);
    assert_eq!(report["skipped"], 0);
    assert!(report["log"][0].as_str().unwrap().starts_with("Row 2: Imported"));

    let (_, categories) = send_json(&target, "GET", "/api/categories", None).await;
    assert_eq!(categories["categories"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn import_rejects_non_spreadsheets() {
    let (app, _state, _dir) = test_app().await;
    let (status, _) = send(
        &app,
        upload("/api/import/excel", "file", "bank.csv", "text/csv", b"a,b,c"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        upload(
            "/api/import/excel",
            "file",
            "bank.xlsx",
            "application/octet-stream",
            b"definitely not a zip",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: JsonValue = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("spreadsheet"));
}

#[tokio::test]
async fn wipe_requires_password_and_confirmation() {
    let (app, _state, _dir) = test_app().await;
    seed(&app, "Code", 4).await;
    send_json(
        &app,
        "PUT",
        "/api/category-settings",
        Some(json!({ "weights": [{ "category": "Code", "percentage": 100 }] })),
    )
    .await;
    send_json(
        &app,
        "POST",
        "/api/tests/generate",
        Some(json!({ "name": "Jordan", "question_count": 4 })),
    )
    .await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/admin/wipe",
        Some(json!({ "password": "guess", "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/admin/wipe",
        Some(json!({ "password": WIPE_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, wiped) = send_json(
        &app,
        "POST",
        "/api/admin/wipe",
        Some(json!({ "password": WIPE_PASSWORD, "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wiped["questions_deleted"], 4);
    assert_eq!(wiped["weights_deleted"], 1);

    let (_, listed) = send_json(&app, "GET", "/api/questions", None).await;
    assert!(listed.as_array().unwrap().is_empty());
    let (status, _) = send_json(&app, "GET", "/api/tests/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, created) =
        send_json(&app, "POST", "/api/questions", Some(question("Fresh", "Code", "A"))).await;
    assert_eq!(created["id"], 1, "id sequence restarts after a wipe");
}

#[tokio::test]
async fn backup_writes_a_copy() {
    let (app, _state, dir) = test_app().await;
    seed(&app, "Code", 2).await;

    let (status, backup) = send_json(&app, "POST", "/api/admin/backup", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let path = std::path::PathBuf::from(backup["path"].as_str().unwrap());
    assert!(path.starts_with(dir.path().join("backups")));
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("test_questions_backup_"));
    assert!(backup["bytes"].as_u64().unwrap() > 0);

    let copy = create_pool(&format!("sqlite://{}", path.display())).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&copy)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn uploaded_images_are_stored_and_served() {
    let (app, _state, _dir) = test_app().await;
    let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

    let (status, body) = send(
        &app,
        upload("/api/images", "file", "panel.png", "image/png", png),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let body: JsonValue = serde_json::from_slice(&body).unwrap();
    let image_path = body["image_path"].as_str().unwrap().to_string();
    assert!(image_path.starts_with("images/") && image_path.ends_with(".png"));

    let (status, served) = send(
        &app,
        Request::builder()
            .uri(format!("/{}", image_path))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, png.to_vec());

    let (status, _) = send(
        &app,
        upload("/api/images", "file", "notes.txt", "text/plain", b"hello"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
