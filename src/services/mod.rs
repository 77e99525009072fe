pub mod admin_service;
pub mod assembler;
pub mod category_service;
pub mod export_service;
pub mod import_service;
pub mod pdf_service;
pub mod question_service;
pub mod test_service;
pub mod update_service;
