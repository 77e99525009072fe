use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{routes, AppState};

/// Spreadsheet and image uploads.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let images_dir = state.config.images_dir.clone();

    let question_api = Router::new()
        .route(
            "/api/questions",
            get(routes::questions::list_questions).post(routes::questions::create_question),
        )
        .route(
            "/api/questions/:id",
            get(routes::questions::get_question)
                .put(routes::questions::update_question)
                .delete(routes::questions::delete_question),
        )
        .route("/api/categories", get(routes::questions::list_categories))
        .route(
            "/api/category-settings",
            get(routes::categories::get_settings)
                .put(routes::categories::save_settings)
                .delete(routes::categories::reset_settings),
        );

    let test_api = Router::new()
        .route("/api/tests/generate", post(routes::test_routes::generate_test))
        .route("/api/tests/current", get(routes::test_routes::current_test))
        .route(
            "/api/tests/current/preview",
            get(routes::test_routes::preview_test),
        )
        .route(
            "/api/tests/current/test.pdf",
            get(routes::test_routes::download_test_pdf),
        )
        .route(
            "/api/tests/current/answer-key.pdf",
            get(routes::test_routes::download_answer_key_pdf),
        );

    let tools_api = Router::new()
        .route("/api/import/excel", post(routes::import_export::import_excel))
        .route(
            "/api/export/questions.xlsx",
            get(routes::import_export::export_questions),
        )
        .route("/api/images", post(routes::admin::upload_image))
        .route("/api/admin/backup", post(routes::admin::backup_database))
        .route("/api/admin/wipe", post(routes::admin::wipe_database))
        .route("/api/updates/status", get(routes::updates::update_status))
        .route("/api/updates/check", get(routes::updates::check_for_updates))
        .route("/api/updates/install", post(routes::updates::install_update))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(question_api)
        .merge(test_api)
        .merge(tools_api)
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
