use std::cmp::Ordering;
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;

use crate::models::{ArticleId, RatingTable, RecommendationResult, UserId};
use crate::services::scoring::{ScoreError, Scorer};

/// Error types for the recommendation engine
#[derive(Debug, Error, PartialEq)]
pub enum RecommendationError {
    #[error("failed to score article {article_id} for user {user_id}: {source}")]
    Prediction {
        user_id: UserId,
        article_id: ArticleId,
        #[source]
        source: ScoreError,
    },
}

/// Ranks articles for `user_id`
///
/// A user that is absent or has no entry in `table` gets the popularity
/// ranking. A known user gets every article of the catalog scored by `model`,
/// ordered by predicted score. Ties are always broken by ascending article id,
/// so identical inputs give identical output.
///
/// A single failed prediction fails the whole call.
pub fn recommend<S>(
    user_id: Option<UserId>,
    model: &S,
    table: &RatingTable,
    n: usize,
) -> Result<Vec<ArticleId>, RecommendationError>
where
    S: Scorer + ?Sized,
{
    if n == 0 {
        return Ok(Vec::new());
    }

    match user_id {
        Some(user_id) if table.contains_user(user_id) => {
            rank_by_score(user_id, model, table.catalog(), n)
        }
        _ => Ok(table.most_popular(n)),
    }
}

fn rank_by_score<S>(
    user_id: UserId,
    model: &S,
    catalog: &[ArticleId],
    n: usize,
) -> Result<Vec<ArticleId>, RecommendationError>
where
    S: Scorer + ?Sized,
{
    let mut scored: Vec<(ArticleId, f64)> = catalog
        .par_iter()
        .map(|&article_id| {
            model
                .predict(user_id, article_id)
                // -0.0 and 0.0 must tie so the article id decides
                .map(|score| (article_id, score + 0.0))
                .map_err(|source| RecommendationError::Prediction {
                    user_id,
                    article_id,
                    source,
                })
        })
        .collect::<Result<_, _>>()?;

    if scored.len() > n {
        scored.select_nth_unstable_by(n - 1, by_score);
        scored.truncate(n);
    }
    scored.sort_unstable_by(by_score);

    Ok(scored.into_iter().map(|(article_id, _)| article_id).collect())
}

/// Score descending, then article id ascending
fn by_score(a: &(ArticleId, f64), b: &(ArticleId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Scoring model and rating table loaded at startup, shared by every request
#[derive(Clone)]
pub struct Recommender {
    model: Arc<dyn Scorer>,
    table: Arc<RatingTable>,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl Recommender {
    pub fn new(model: Arc<dyn Scorer>, table: RatingTable) -> Self {
        Self {
            model,
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &RatingTable {
        &self.table
    }

    pub fn recommend(
        &self,
        user_id: Option<UserId>,
        n: usize,
    ) -> Result<Vec<ArticleId>, RecommendationError> {
        recommend(user_id, self.model.as_ref(), &self.table, n)
    }

    /// Popularity ranking, independent of any user
    pub fn popular(&self, n: usize) -> Vec<ArticleId> {
        self.table.most_popular(n)
    }

    /// Recommendations for an identified user, wrapped as the endpoint response
    pub fn result_for(
        &self,
        user_id: UserId,
        n: usize,
    ) -> Result<RecommendationResult, RecommendationError> {
        let known = self.table.contains_user(user_id);
        let recommendations = self.recommend(Some(user_id), n)?;

        tracing::debug!(
            user_id,
            known,
            n,
            returned = recommendations.len(),
            "Recommendations computed"
        );

        Ok(RecommendationResult::personalized(user_id, recommendations))
    }
}
