//! Latent-factor scoring model
//!
//! The trained model is a biased matrix factorization: every known user and
//! article carries a bias and a factor vector, and the estimated affinity is
//!
//! ```text
//! est = global_mean + b_user + b_article + <p_user, q_article>
//! ```
//!
//! clipped into the rating scale the model was trained on. Terms for an
//! unknown user or article are left out, so a pair where neither side is known
//! scores the global mean.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{ArticleId, UserId};

/// Errors raised while validating a model or scoring a pair
#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("{entity} {id} has {found} latent factors, expected {expected}")]
    DimensionMismatch {
        entity: &'static str,
        id: i64,
        expected: usize,
        found: usize,
    },

    #[error("non-finite {what}")]
    NonFinite { what: String },

    #[error("invalid rating scale [{lower}, {upper}]")]
    InvalidScale { lower: f64, upper: f64 },
}

/// Anything that can estimate how much a user will like an article
#[cfg_attr(test, mockall::automock)]
pub trait Scorer: Send + Sync {
    fn predict(&self, user_id: UserId, article_id: ArticleId) -> Result<f64, ScoreError>;
}

/// Bias and latent factors learned for one user or article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentVector {
    pub bias: f64,
    pub factors: Vec<f64>,
}

/// Serialized form of a trained matrix factorization model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvdModel {
    pub global_mean: f64,
    /// Lower and upper bound of the ratings the model was trained on
    pub rating_scale: (f64, f64),
    pub n_factors: usize,
    #[serde(default)]
    pub users: HashMap<UserId, LatentVector>,
    #[serde(default)]
    pub items: HashMap<ArticleId, LatentVector>,
}

impl SvdModel {
    pub fn new(global_mean: f64, rating_scale: (f64, f64), n_factors: usize) -> Self {
        Self {
            global_mean,
            rating_scale,
            n_factors,
            users: HashMap::new(),
            items: HashMap::new(),
        }
    }

    pub fn with_user(mut self, user_id: UserId, bias: f64, factors: Vec<f64>) -> Self {
        self.users.insert(user_id, LatentVector { bias, factors });
        self
    }

    pub fn with_item(mut self, article_id: ArticleId, bias: f64, factors: Vec<f64>) -> Self {
        self.items.insert(article_id, LatentVector { bias, factors });
        self
    }

    /// Checks the invariants `predict` relies on; run once after deserializing
    pub fn validate(&self) -> Result<(), ScoreError> {
        let (lower, upper) = self.rating_scale;
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(ScoreError::InvalidScale { lower, upper });
        }
        if !self.global_mean.is_finite() {
            return Err(ScoreError::NonFinite {
                what: "global mean".to_string(),
            });
        }

        for (&id, vector) in &self.users {
            self.check_vector("user", id, vector)?;
        }
        for (&id, vector) in &self.items {
            self.check_vector("article", id, vector)?;
        }
        Ok(())
    }

    fn check_vector(
        &self,
        entity: &'static str,
        id: i64,
        vector: &LatentVector,
    ) -> Result<(), ScoreError> {
        if vector.factors.len() != self.n_factors {
            return Err(ScoreError::DimensionMismatch {
                entity,
                id,
                expected: self.n_factors,
                found: vector.factors.len(),
            });
        }
        if !vector.bias.is_finite() || vector.factors.iter().any(|f| !f.is_finite()) {
            return Err(ScoreError::NonFinite {
                what: format!("parameters for {} {}", entity, id),
            });
        }
        Ok(())
    }
}

impl Scorer for SvdModel {
    fn predict(&self, user_id: UserId, article_id: ArticleId) -> Result<f64, ScoreError> {
        let user = self.users.get(&user_id);
        let item = self.items.get(&article_id);

        let mut estimate = self.global_mean;
        if let Some(user) = user {
            estimate += user.bias;
        }
        if let Some(item) = item {
            estimate += item.bias;
        }
        if let (Some(user), Some(item)) = (user, item) {
            if user.factors.len() != item.factors.len() {
                return Err(ScoreError::DimensionMismatch {
                    entity: "article",
                    id: article_id,
                    expected: user.factors.len(),
                    found: item.factors.len(),
                });
            }
            estimate += user
                .factors
                .iter()
                .zip(&item.factors)
                .map(|(p, q)| p * q)
                .sum::<f64>();
        }

        if !estimate.is_finite() {
            return Err(ScoreError::NonFinite {
                what: format!("estimate for user {} and article {}", user_id, article_id),
            });
        }

        let (lower, upper) = self.rating_scale;
        Ok(estimate.clamp(lower, upper))
    }
}
