use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::generated_test::GeneratedTest;
use crate::services::assembler::CategoryQuota;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateTestPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, max = 250))]
    pub question_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedTestResponse {
    #[serde(flatten)]
    pub test: GeneratedTest,
    pub quotas: Vec<CategoryQuota>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentTestResponse {
    #[serde(flatten)]
    pub test: GeneratedTest,
    pub warning: Option<String>,
}

impl From<GeneratedTest> for CurrentTestResponse {
    fn from(test: GeneratedTest) -> Self {
        let warning = test.shortfall_warning();
        Self { test, warning }
    }
}
