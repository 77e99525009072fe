pub mod category_weight;
pub mod question;
