use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{ArticleId, UserId};

/// Normalized interest of one user in one article
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub user_id: UserId,
    pub article_id: ArticleId,
    /// Session count scaled into [0, 1] against the whole table
    pub rating: f64,
}

/// Immutable (user, article) rating matrix with the lookups the recommender needs
///
/// Entries are kept in key order so two tables built from the same data compare
/// equal and iterate identically. The article catalog and the popularity
/// ranking are computed once here instead of on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingTable {
    ratings: BTreeMap<(UserId, ArticleId), f64>,
    users: BTreeSet<UserId>,
    /// Distinct articles, ascending
    catalog: Vec<ArticleId>,
    /// Articles ordered by distinct-user count descending, then id ascending
    popularity: Vec<(ArticleId, usize)>,
}

impl RatingTable {
    /// Builds a table from already normalized entries; a repeated key keeps the last rating
    pub fn from_entries(entries: impl IntoIterator<Item = RatingEntry>) -> Self {
        let ratings = entries
            .into_iter()
            .map(|entry| ((entry.user_id, entry.article_id), entry.rating))
            .collect();
        Self::from_ratings(ratings)
    }

    pub(crate) fn from_ratings(ratings: BTreeMap<(UserId, ArticleId), f64>) -> Self {
        let mut users = BTreeSet::new();
        let mut readers: BTreeMap<ArticleId, usize> = BTreeMap::new();

        for &(user_id, article_id) in ratings.keys() {
            users.insert(user_id);
            *readers.entry(article_id).or_insert(0) += 1;
        }

        let catalog: Vec<ArticleId> = readers.keys().copied().collect();

        let mut popularity: Vec<(ArticleId, usize)> = readers.into_iter().collect();
        popularity.sort_by(|(a_id, a_count), (b_id, b_count)| {
            b_count.cmp(a_count).then_with(|| a_id.cmp(b_id))
        });

        Self {
            ratings,
            users,
            catalog,
            popularity,
        }
    }

    /// Number of (user, article) entries
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn get(&self, user_id: UserId, article_id: ArticleId) -> Option<f64> {
        self.ratings.get(&(user_id, article_id)).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = RatingEntry> + '_ {
        self.ratings
            .iter()
            .map(|(&(user_id, article_id), &rating)| RatingEntry {
                user_id,
                article_id,
                rating,
            })
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.users.contains(&user_id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Every article that appears anywhere in the table, ascending
    pub fn catalog(&self) -> &[ArticleId] {
        &self.catalog
    }

    /// Number of distinct users with an entry for `article_id`
    pub fn readers(&self, article_id: ArticleId) -> usize {
        self.popularity
            .iter()
            .find(|(id, _)| *id == article_id)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// The `n` articles read by the most distinct users, ties by ascending id
    pub fn most_popular(&self, n: usize) -> Vec<ArticleId> {
        self.popularity.iter().take(n).map(|(id, _)| *id).collect()
    }
}
