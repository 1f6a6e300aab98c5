use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{ArticleId, InteractionRecord, RatingTable, UserId};

/// Error types for the interaction matrix builder
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("interaction dataset is empty")]
    Empty,
    #[error("degenerate rating range: every (user, article) pair has {count} sessions")]
    DegenerateRatingRange { count: u64 },
}

/// Derives the normalized rating table from raw interaction records
///
/// Records are grouped by (user, article) and each group is rated by its
/// session count, min-max scaled over the whole table:
/// `rating = (count - min) / (max - min)`.
///
/// Counts are integers until the final division, so the output does not
/// depend on the order of `records`.
pub fn build_rating_table(records: &[InteractionRecord]) -> Result<RatingTable, BuildError> {
    let mut counts: BTreeMap<(UserId, ArticleId), u64> = BTreeMap::new();

    for record in records {
        let count = counts.entry((record.user_id, record.article_id)).or_insert(0);
        if record.session_id.is_some() {
            *count += 1;
        }
    }

    let min = counts.values().copied().min().ok_or(BuildError::Empty)?;
    let max = counts.values().copied().max().ok_or(BuildError::Empty)?;

    if max == min {
        return Err(BuildError::DegenerateRatingRange { count: max });
    }

    let range = (max - min) as f64;
    let ratings = counts
        .into_iter()
        .map(|(key, count)| (key, (count - min) as f64 / range))
        .collect();

    let table = RatingTable::from_ratings(ratings);

    tracing::info!(
        records = records.len(),
        entries = table.len(),
        users = table.user_count(),
        articles = table.catalog().len(),
        min_sessions = min,
        max_sessions = max,
        "Rating table built"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions(user_id: UserId, article_id: ArticleId, count: i64) -> Vec<InteractionRecord> {
        (0..count)
            .map(|session| InteractionRecord::new(user_id, article_id, session))
            .collect()
    }

    #[test]
    fn test_counts_are_min_max_normalized() {
        let records: Vec<InteractionRecord> = [
            sessions(1, 10, 3),
            sessions(1, 20, 1),
            sessions(2, 10, 2),
        ]
        .concat();

        let table = build_rating_table(&records).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1, 10), Some(1.0));
        assert_eq!(table.get(1, 20), Some(0.0));
        assert_eq!(table.get(2, 10), Some(0.5));
    }

    #[test]
    fn test_record_order_does_not_change_table() {
        let mut records: Vec<InteractionRecord> = [
            sessions(1, 10, 4),
            sessions(2, 20, 1),
            sessions(3, 10, 2),
            sessions(3, 30, 7),
        ]
        .concat();

        let forward = build_rating_table(&records).unwrap();
        records.reverse();
        let backward = build_rating_table(&records).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_single_pair_is_degenerate() {
        let records = sessions(1, 10, 3);
        assert_eq!(
            build_rating_table(&records),
            Err(BuildError::DegenerateRatingRange { count: 3 })
        );
    }

    #[test]
    fn test_equal_counts_are_degenerate() {
        let records: Vec<InteractionRecord> =
            [sessions(1, 10, 2), sessions(2, 20, 2), sessions(3, 10, 2)].concat();

        assert_eq!(
            build_rating_table(&records),
            Err(BuildError::DegenerateRatingRange { count: 2 })
        );
    }

    #[test]
    fn test_empty_dataset() {
        assert_eq!(build_rating_table(&[]), Err(BuildError::Empty));
    }

    #[test]
    fn test_records_without_session_keep_pair_at_zero_count() {
        let mut records = sessions(1, 10, 2);
        records.push(InteractionRecord {
            user_id: 2,
            article_id: 20,
            session_id: None,
        });

        let table = build_rating_table(&records).unwrap();

        assert_eq!(table.get(2, 20), Some(0.0));
        assert_eq!(table.get(1, 10), Some(1.0));
        assert!(table.contains_user(2));
    }
}
