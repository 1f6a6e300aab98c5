use serde::{Deserialize, Serialize};

pub mod ratings;

pub use ratings::{RatingEntry, RatingTable};

/// Identifier of a reader in the interaction dataset
pub type UserId = i64;

/// Identifier of an article in the interaction dataset
pub type ArticleId = i64;

/// Number of recommendations returned when the caller does not ask for a count
pub const DEFAULT_RECOMMENDATIONS: usize = 5;

pub const PERSONALIZED_MESSAGE: &str =
    "Thanks for visiting! Here are your personalized recommendations.";
pub const WELCOME_MESSAGE: &str =
    "Welcome! Sign up now and get access to our exclusive content!";
pub const POPULAR_MESSAGE: &str = "Welcome! Here are our most popular articles.";

/// Identifier of a viewing session
///
/// Dataset exports carry session ids either as integers or as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionId {
    Numeric(i64),
    Text(String),
}

/// One raw row of the interaction dataset: a user viewed an article during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub article_id: ArticleId,
    /// Null session ids keep the (user, article) pair but are not counted
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl InteractionRecord {
    pub fn new(user_id: UserId, article_id: ArticleId, session_id: i64) -> Self {
        Self {
            user_id,
            article_id,
            session_id: Some(SessionId::Numeric(session_id)),
        }
    }
}

/// Response body of the recommendation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub user_id: Option<UserId>,
    pub recommendations: Vec<ArticleId>,
    pub message: String,
}

impl RecommendationResult {
    /// Recommendations computed for an identified user
    pub fn personalized(user_id: UserId, recommendations: Vec<ArticleId>) -> Self {
        Self {
            user_id: Some(user_id),
            recommendations,
            message: PERSONALIZED_MESSAGE.to_string(),
        }
    }

    /// Popularity ranking served to an anonymous visitor
    pub fn popular(recommendations: Vec<ArticleId>) -> Self {
        Self {
            user_id: None,
            recommendations,
            message: POPULAR_MESSAGE.to_string(),
        }
    }

    /// Sign-up invitation with no recommendations
    pub fn welcome() -> Self {
        Self {
            user_id: None,
            recommendations: Vec::new(),
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}
