use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::question::{NewQuestion, QuestionFields};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
    #[validate(length(min = 1))]
    pub answer: String,
    #[validate(length(min = 1, max = 200))]
    pub category: String,
    #[validate(length(min = 1))]
    pub choice_a: String,
    #[validate(length(min = 1))]
    pub choice_b: String,
    pub choice_c: Option<String>,
    pub choice_d: Option<String>,
    pub image_path: Option<String>,
}

impl QuestionPayload {
    pub fn to_new_question(&self) -> Result<NewQuestion> {
        NewQuestion::from_fields(QuestionFields {
            question: &self.question,
            answer: &self.answer,
            category: &self.category,
            choice_a: &self.choice_a,
            choice_b: &self.choice_b,
            choice_c: self.choice_c.as_deref(),
            choice_d: self.choice_d.as_deref(),
            image_path: self.image_path.as_deref(),
        })
        .map_err(Error::BadRequest)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuestionListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}
