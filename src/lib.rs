pub mod app;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    admin_service::AdminService, category_service::CategoryService,
    import_service::ImportService, pdf_service::PdfService, question_service::QuestionService,
    test_service::TestService, update_service::UpdateService,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub question_service: QuestionService,
    pub category_service: CategoryService,
    pub test_service: TestService,
    pub pdf_service: PdfService,
    pub import_service: ImportService,
    pub admin_service: AdminService,
    pub update_service: UpdateService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self> {
        let question_service = QuestionService::new(pool.clone());
        let category_service = CategoryService::new(pool.clone());
        let test_service = TestService::new(
            question_service.clone(),
            category_service.clone(),
            config.test_size,
        );
        let pdf_service = PdfService::new(config.images_dir.clone());
        let import_service = ImportService::new(question_service.clone());
        let admin_service = AdminService::new(
            pool.clone(),
            config.images_dir.clone(),
            config.backup_dir.clone(),
            config.wipe_password_hash.clone(),
        );
        let update_service = UpdateService::new(config.update.clone())?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            question_service,
            category_service,
            test_service,
            pdf_service,
            import_service,
            admin_service,
            update_service,
        })
    }
}
