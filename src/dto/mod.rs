pub mod admin_dto;
pub mod category_dto;
pub mod question_dto;
pub mod test_dto;
