//! Quota-based test assembly.
//!
//! Percentages are turned into per-category target counts, each category contributes at
//! most what it holds, and any shortfall is backfilled from the whole bank. The result is
//! shuffled so the order reveals neither selection order nor category grouping.

use std::collections::HashSet;
use std::future::Future;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::category_weight::CategoryWeight;
use crate::models::question::Question;

/// Read-only access to the question bank needed by [`assemble`].
pub trait QuestionSource {
    fn count_in_category(&self, category: &str) -> impl Future<Output = Result<usize>> + Send;

    /// Up to `n` distinct questions of `category`, chosen uniformly at random.
    fn sample_from_category<R: Rng + Send>(
        &self,
        category: &str,
        n: usize,
        rng: &mut R,
    ) -> impl Future<Output = Result<Vec<Question>>> + Send;

    /// Up to `n` distinct questions from the whole bank whose ids are not in `exclude`.
    fn sample_excluding<R: Rng + Send>(
        &self,
        exclude: &HashSet<i64>,
        n: usize,
        rng: &mut R,
    ) -> impl Future<Output = Result<Vec<Question>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryQuota {
    pub category: String,
    pub percentage: i64,
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Category(String),
    Backfill,
}

#[derive(Debug, Clone)]
pub struct SelectedQuestion {
    pub question: Question,
    pub source: Selection,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub requested: usize,
    pub quotas: Vec<CategoryQuota>,
    pub questions: Vec<SelectedQuestion>,
}

impl Assembly {
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.questions.len())
    }
}

fn round_half_up(percentage: i64, total: usize) -> usize {
    let scaled = percentage as u128 * total as u128 + 50;
    (scaled / 100) as usize
}

/// Per-category target counts for a test of `total` questions.
///
/// Entries with a non-positive percentage are ignored and a repeated category keeps its
/// first occurrence. Targets always sum to exactly `total`: the signed rounding difference
/// is applied to the largest target, first one in `weights` order on ties.
pub fn compute_quotas(weights: &[CategoryWeight], total: usize) -> Result<Vec<CategoryQuota>> {
    let mut seen = HashSet::new();
    let mut quotas: Vec<CategoryQuota> = weights
        .iter()
        .filter(|w| w.percentage > 0)
        .filter(|w| seen.insert(w.category.as_str()))
        .map(|w| CategoryQuota {
            category: w.category.clone(),
            percentage: w.percentage,
            target: round_half_up(w.percentage, total),
        })
        .collect();

    if quotas.is_empty() {
        return Err(Error::EmptyConfiguration);
    }

    let sum: usize = quotas.iter().map(|q| q.target).sum();
    if sum < total {
        let idx = largest_target(&quotas);
        quotas[idx].target += total - sum;
    } else {
        // Over-subscribed weights can ask for more than one category can give back.
        let mut excess = sum - total;
        while excess > 0 {
            let idx = largest_target(&quotas);
            let take = excess.min(quotas[idx].target);
            quotas[idx].target -= take;
            excess -= take;
        }
    }

    Ok(quotas)
}

fn largest_target(quotas: &[CategoryQuota]) -> usize {
    let mut best = 0;
    for (idx, quota) in quotas.iter().enumerate() {
        if quota.target > quotas[best].target {
            best = idx;
        }
    }
    best
}

/// Draws a shuffled test of up to `total` questions from `source`.
///
/// A result shorter than `total` means the bank ran dry; that is reported through
/// [`Assembly::shortfall`] rather than as an error.
pub async fn assemble<S, R>(
    source: &S,
    weights: &[CategoryWeight],
    total: usize,
    rng: &mut R,
) -> Result<Assembly>
where
    S: QuestionSource + Sync,
    R: Rng + Send,
{
    if total == 0 {
        return Err(Error::BadRequest(
            "Test size must be a positive number of questions".to_string(),
        ));
    }

    let quotas = compute_quotas(weights, total)?;
    let mut selected: Vec<SelectedQuestion> = Vec::with_capacity(total);
    let mut taken: HashSet<i64> = HashSet::with_capacity(total);

    for quota in quotas.iter().filter(|q| q.target > 0) {
        let available = source.count_in_category(&quota.category).await?;
        let effective = quota.target.min(available);
        if effective < quota.target {
            tracing::info!(
                category = %quota.category,
                target = quota.target,
                available,
                "category under-supplied, remainder will be backfilled"
            );
        }
        if effective == 0 {
            continue;
        }

        let drawn = source
            .sample_from_category(&quota.category, effective, rng)
            .await?;
        for question in drawn.into_iter().take(effective) {
            if taken.insert(question.id) {
                selected.push(SelectedQuestion {
                    question,
                    source: Selection::Category(quota.category.clone()),
                });
            }
        }
    }

    if selected.len() < total {
        let shortfall = total - selected.len();
        let backfill = source.sample_excluding(&taken, shortfall, rng).await?;
        for question in backfill.into_iter().take(shortfall) {
            if taken.insert(question.id) {
                selected.push(SelectedQuestion {
                    question,
                    source: Selection::Backfill,
                });
            }
        }
    }

    selected.shuffle(rng);

    let assembly = Assembly {
        requested: total,
        quotas,
        questions: selected,
    };
    if assembly.shortfall() > 0 {
        tracing::warn!(
            requested = total,
            selected = assembly.questions.len(),
            "question bank too small for the requested test size"
        );
    }
    Ok(assembly)
}
