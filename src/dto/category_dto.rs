use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::category_weight::CategoryWeight;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySettingRow {
    pub category: String,
    pub percentage: i64,
    pub question_count: i64,
    /// Questions this category would contribute to a test of `test_size`.
    pub target_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySettingsResponse {
    pub test_size: usize,
    pub total_percentage: i64,
    pub categories: Vec<CategorySettingRow>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WeightEntry {
    #[validate(length(min = 1, max = 200))]
    pub category: String,
    #[validate(range(min = 0, max = 100))]
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveCategorySettingsPayload {
    #[validate(length(max = 500))]
    pub weights: Vec<WeightEntry>,
}

impl From<&WeightEntry> for CategoryWeight {
    fn from(value: &WeightEntry) -> Self {
        CategoryWeight::new(value.category.trim(), value.percentage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveCategorySettingsResponse {
    pub weights: Vec<CategoryWeight>,
    pub total_percentage: i64,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub categories: Vec<crate::models::category_weight::CategoryCount>,
}
