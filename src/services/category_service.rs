use std::collections::{HashMap, HashSet};

use sqlx::SqlitePool;

use crate::dto::category_dto::{CategorySettingRow, CategorySettingsResponse, SaveCategorySettingsResponse};
use crate::error::{Error, Result};
use crate::models::category_weight::{CategoryCount, CategoryWeight};
use crate::services::assembler::compute_quotas;

#[derive(Clone)]
pub struct CategoryService {
    pool: SqlitePool,
}

impl CategoryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Configured weights in the order they were saved.
    pub async fn weights(&self) -> Result<Vec<CategoryWeight>> {
        let weights = sqlx::query_as::<_, CategoryWeight>(
            "SELECT category, percentage FROM category_settings ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(weights)
    }

    /// Replaces every stored weight. Zero entries are dropped.
    pub async fn save(&self, entries: Vec<CategoryWeight>) -> Result<SaveCategorySettingsResponse> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.category.is_empty() {
                return Err(Error::BadRequest("Category name cannot be empty".to_string()));
            }
            if !(0..=100).contains(&entry.percentage) {
                return Err(Error::BadRequest(format!(
                    "Percentage for '{}' must be between 0 and 100",
                    entry.category
                )));
            }
            if !seen.insert(entry.category.as_str()) {
                return Err(Error::BadRequest(format!(
                    "Category '{}' appears more than once",
                    entry.category
                )));
            }
        }

        let kept: Vec<CategoryWeight> = entries.into_iter().filter(|w| w.percentage > 0).collect();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM category_settings")
            .execute(&mut *tx)
            .await?;
        for weight in &kept {
            sqlx::query("INSERT INTO category_settings (category, percentage) VALUES (?, ?)")
                .bind(&weight.category)
                .bind(weight.percentage)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        let total = total_percentage(&kept);
        tracing::info!(categories = kept.len(), total, "category settings saved");

        Ok(SaveCategorySettingsResponse {
            warning: total_warning(total),
            total_percentage: total,
            weights: kept,
        })
    }

    pub async fn reset(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM category_settings")
            .execute(&self.pool)
            .await?;
        tracing::info!(removed = result.rows_affected(), "category settings reset");
        Ok(result.rows_affected())
    }

    /// Every known category with its weight, stock and previewed target count.
    pub async fn overview(
        &self,
        counts: &[CategoryCount],
        test_size: usize,
    ) -> Result<CategorySettingsResponse> {
        let weights = self.weights().await?;
        Ok(build_overview(counts, &weights, test_size))
    }
}

fn total_percentage(weights: &[CategoryWeight]) -> i64 {
    weights.iter().map(|w| w.percentage).sum()
}

fn total_warning(total: i64) -> Option<String> {
    if total == 100 {
        None
    } else {
        Some(format!(
            "Category percentages add up to {}%, not 100%; target counts are still adjusted to the test size",
            total
        ))
    }
}

pub(crate) fn build_overview(
    counts: &[CategoryCount],
    weights: &[CategoryWeight],
    test_size: usize,
) -> CategorySettingsResponse {
    let percentages: HashMap<&str, i64> = weights
        .iter()
        .map(|w| (w.category.as_str(), w.percentage))
        .collect();
    let stock: HashMap<&str, i64> = counts
        .iter()
        .map(|c| (c.category.as_str(), c.question_count))
        .collect();

    let targets: HashMap<String, usize> = match compute_quotas(weights, test_size) {
        Ok(quotas) => quotas.into_iter().map(|q| (q.category, q.target)).collect(),
        Err(_) => HashMap::new(),
    };

    let mut names: Vec<&str> = counts.iter().map(|c| c.category.as_str()).collect();
    for weight in weights {
        if !stock.contains_key(weight.category.as_str()) {
            names.push(weight.category.as_str());
        }
    }

    let mut warnings = Vec::new();
    let total = total_percentage(weights);
    if weights.is_empty() {
        warnings.push("No category percentages configured; tests cannot be generated".to_string());
    } else if let Some(warning) = total_warning(total) {
        warnings.push(warning);
    }

    let categories: Vec<CategorySettingRow> = names
        .into_iter()
        .map(|name| {
            let question_count = stock.get(name).copied().unwrap_or(0);
            let target_count = targets.get(name).copied().unwrap_or(0);
            if target_count as i64 > question_count {
                warnings.push(format!(
                    "'{}' needs {} questions but only {} exist; the rest will be backfilled",
                    name, target_count, question_count
                ));
            }
            CategorySettingRow {
                category: name.to_string(),
                percentage: percentages.get(name).copied().unwrap_or(0),
                question_count,
                target_count,
            }
        })
        .collect();

    CategorySettingsResponse {
        test_size,
        total_percentage: total,
        categories,
        warnings,
    }
}
