use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::dto::question_dto::QuestionListQuery;
use crate::error::{Error, Result};
use crate::models::category_weight::CategoryCount;
use crate::models::question::{NewQuestion, Question, QUESTION_COLUMNS};
use crate::services::assembler::QuestionSource;

const SEARCHABLE_COLUMNS: [&str; 7] = [
    "question", "answer", "category", "choice_a", "choice_b", "choice_c", "choice_d",
];

#[derive(Clone)]
pub struct QuestionService {
    pool: SqlitePool,
}

impl QuestionService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewQuestion) -> Result<Question> {
        let sql = format!(
            r#"
            INSERT INTO questions (
                question, answer, category, choice_a, choice_b, choice_c, choice_d, image_path
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(&new.question)
            .bind(new.answer.as_str())
            .bind(&new.category)
            .bind(&new.choice_a)
            .bind(&new.choice_b)
            .bind(&new.choice_c)
            .bind(&new.choice_d)
            .bind(&new.image_path)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(id = question.id, category = %question.category, "question added");
        Ok(question)
    }

    /// Inserts all questions in one transaction.
    pub async fn create_many(&self, questions: &[NewQuestion]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for new in questions {
            sqlx::query(
                r#"
                INSERT INTO questions (
                    question, answer, category, choice_a, choice_b, choice_c, choice_d, image_path
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&new.question)
            .bind(new.answer.as_str())
            .bind(&new.category)
            .bind(&new.choice_a)
            .bind(&new.choice_b)
            .bind(&new.choice_c)
            .bind(&new.choice_d)
            .bind(&new.image_path)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(questions.len())
    }

    pub async fn get(&self, id: i64) -> Result<Question> {
        let sql = format!("SELECT {} FROM questions WHERE id = ?", QUESTION_COLUMNS);
        sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", id)))
    }

    pub async fn update(&self, id: i64, new: &NewQuestion) -> Result<Question> {
        let sql = format!(
            r#"
            UPDATE questions
            SET
                question = ?,
                answer = ?,
                category = ?,
                choice_a = ?,
                choice_b = ?,
                choice_c = ?,
                choice_d = ?,
                image_path = ?
            WHERE id = ?
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        );
        sqlx::query_as::<_, Question>(&sql)
            .bind(&new.question)
            .bind(new.answer.as_str())
            .bind(&new.category)
            .bind(&new.choice_a)
            .bind(&new.choice_b)
            .bind(&new.choice_c)
            .bind(&new.choice_d)
            .bind(&new.image_path)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", id)))
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Question {} not found", id)));
        }
        tracing::info!(id, "question deleted");
        Ok(())
    }

    /// Newest first. `search` matches question text, answer, category and every choice.
    pub async fn list(&self, query: &QuestionListQuery) -> Result<Vec<Question>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM questions WHERE 1 = 1",
            QUESTION_COLUMNS
        ));

        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term);
            builder.push(" AND (");
            for (idx, column) in SEARCHABLE_COLUMNS.iter().enumerate() {
                if idx > 0 {
                    builder.push(" OR ");
                }
                builder.push(*column).push(" LIKE ").push_bind(pattern.clone());
            }
            builder.push(")");
        }

        if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            builder.push(" AND category = ").push_bind(category.to_string());
        }

        builder.push(" ORDER BY id DESC");

        let questions = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    pub async fn all(&self) -> Result<Vec<Question>> {
        let sql = format!("SELECT {} FROM questions ORDER BY id", QUESTION_COLUMNS);
        let questions = sqlx::query_as::<_, Question>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    pub async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let counts = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS question_count
            FROM questions
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Loads the given ids, returned in the order requested.
    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM questions WHERE id IN (",
            QUESTION_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_id: HashMap<i64, Question> = rows.into_iter().map(|q| (q.id, q)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

impl QuestionSource for QuestionService {
    async fn count_in_category(&self, category: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE category = ?")
            .bind(category)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn sample_from_category<R: Rng + Send>(
        &self,
        category: &str,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Question>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM questions WHERE category = ?")
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        let picked: Vec<i64> = ids.choose_multiple(rng, n).copied().collect();
        self.fetch_by_ids(&picked).await
    }

    async fn sample_excluding<R: Rng + Send>(
        &self,
        exclude: &HashSet<i64>,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Question>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM questions")
            .fetch_all(&self.pool)
            .await?;
        let candidates: Vec<i64> = ids.into_iter().filter(|id| !exclude.contains(id)).collect();
        let picked: Vec<i64> = candidates.choose_multiple(rng, n).copied().collect();
        self.fetch_by_ids(&picked).await
    }
}
