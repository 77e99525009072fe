use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Advisory share of a generated test that a category should supply. Totals are not
/// required to reach 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategoryWeight {
    pub category: String,
    pub percentage: i64,
}

impl CategoryWeight {
    pub fn new(category: impl Into<String>, percentage: i64) -> Self {
        Self {
            category: category.into(),
            percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub question_count: i64,
}
