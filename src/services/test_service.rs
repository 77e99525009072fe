use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;

use crate::config::MAX_TEST_SIZE;
use crate::error::{Error, Result};
use crate::models::generated_test::{GeneratedTest, TestQuestion};
use crate::services::assembler::{assemble, Assembly, CategoryQuota, Selection};
use crate::services::category_service::CategoryService;
use crate::services::pdf_service::TEST_TITLE;
use crate::services::question_service::QuestionService;
use crate::utils::{time, token};

/// Generates tests and keeps the most recent one until it is replaced.
#[derive(Clone)]
pub struct TestService {
    questions: QuestionService,
    categories: CategoryService,
    default_size: usize,
    current: Arc<RwLock<Option<GeneratedTest>>>,
}

impl TestService {
    pub fn new(questions: QuestionService, categories: CategoryService, default_size: usize) -> Self {
        Self {
            questions,
            categories,
            default_size,
            current: Arc::new(RwLock::new(None)),
        }
    }

    pub fn default_size(&self) -> usize {
        self.default_size
    }

    pub async fn generate(
        &self,
        name: &str,
        question_count: Option<usize>,
    ) -> Result<(GeneratedTest, Vec<CategoryQuota>)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::BadRequest("Please enter a test name".to_string()));
        }
        let total = question_count.unwrap_or(self.default_size);
        if total == 0 || total > MAX_TEST_SIZE {
            return Err(Error::BadRequest(format!(
                "Question count must be between 1 and {}",
                MAX_TEST_SIZE
            )));
        }

        let weights = self.categories.weights().await?;
        let mut rng = StdRng::from_entropy();
        let assembly = assemble(&self.questions, &weights, total, &mut rng).await?;

        let quotas = assembly.quotas.clone();
        let test = into_generated_test(name, assembly);
        tracing::info!(
            test_id = %test.id,
            name = %test.name,
            questions = test.questions.len(),
            requested = test.requested,
            "test generated"
        );

        *self.current.write().await = Some(test.clone());
        Ok((test, quotas))
    }

    pub async fn current(&self) -> Result<GeneratedTest> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::NotFound("Please generate a test first".to_string()))
    }

    pub async fn clear(&self) {
        *self.current.write().await = None;
    }
}

pub(crate) fn into_generated_test(name: &str, assembly: Assembly) -> GeneratedTest {
    let requested = assembly.requested;
    let questions = assembly
        .questions
        .into_iter()
        .map(|selected| TestQuestion {
            drawn_for: match selected.source {
                Selection::Category(category) => Some(category),
                Selection::Backfill => None,
            },
            question: selected.question,
        })
        .collect();

    GeneratedTest {
        id: token::generate_test_id(),
        name: name.to_string(),
        generated_at: time::now(),
        requested,
        questions,
    }
}

/// Plain-text student view of a test: header, directions, then each question and its
/// filled choices. Answers and categories stay out of it.
pub fn render_preview(test: &GeneratedTest) -> String {
    let mut lines = vec![
        TEST_TITLE.to_string(),
        format!("Name: {}", test.name),
        format!(
            "Date: {}    Test ID: {}",
            time::display_date(&test.generated_at),
            test.id
        ),
        String::new(),
        "Directions: For the following questions, fill the circle next to the option".to_string(),
        "that best answers the question or completes the statement. Show all work.".to_string(),
        String::new(),
        "=".repeat(60),
        String::new(),
    ];

    for (idx, item) in test.questions.iter().enumerate() {
        let q = &item.question;
        let number = idx + 1;
        if let Some(path) = q.image_path.as_deref() {
            let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
            lines.push(format!("{}. [IMAGE: {}]", number, file));
        }
        lines.push(format!("{}. {}", number, q.question));
        lines.push(String::new());
        for (letter, text) in q.choices() {
            lines.push(format!("   {}) {}", letter, text));
        }
        lines.push(String::new());
    }

    if let Some(warning) = test.shortfall_warning() {
        lines.push(format!("Warning: {}", warning));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
