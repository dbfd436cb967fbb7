//! Weighted term scoring over record fields
//!
//! Each whitespace-delimited query term is matched case-insensitively as a
//! substring of the `name`, `username` and `bio` fields. A hit adds that
//! field's weight to the record score:
//!
//! | Field      | Weight |
//! |------------|--------|
//! | `name`     | 5      |
//! | `username` | 3      |
//! | `bio`      | 1      |
//!
//! Records scoring zero are dropped. Ranking is by descending score and keeps
//! input order among equal scores.

use crate::record::{Record, SearchResult};

/// A field that participates in search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Name,
    Username,
    Bio,
}

impl SearchField {
    pub fn weight(&self) -> u32 {
        match self {
            SearchField::Name => 5,
            SearchField::Username => 3,
            SearchField::Bio => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::Username => "username",
            SearchField::Bio => "bio",
        }
    }

    fn value<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            SearchField::Name => &record.name,
            SearchField::Username => &record.username,
            SearchField::Bio => &record.bio,
        }
    }
}

/// Searchable fields paired with their weights
pub const FIELD_WEIGHTS: [(SearchField, u32); 3] =
    [(SearchField::Name, 5), (SearchField::Username, 3), (SearchField::Bio, 1)];

/// Split a query into lowercase terms
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Score one record against already-tokenized terms
///
/// Repeated terms count once per occurrence.
pub fn score_record(record: &Record, terms: &[String]) -> u32 {
    if terms.is_empty() {
        return 0;
    }

    let haystacks: Vec<(SearchField, String)> = FIELD_WEIGHTS
        .iter()
        .map(|(field, _)| (*field, field.value(record).to_lowercase()))
        .collect();

    terms
        .iter()
        .map(|term| {
            haystacks
                .iter()
                .filter(|(_, text)| text.contains(term.as_str()))
                .map(|(field, _)| field.weight())
                .sum::<u32>()
        })
        .sum()
}

/// Rank records against a query
///
/// `records` must be in insertion order; that order breaks score ties.
pub fn rank<'a, I>(records: I, query: &str) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a Record>,
{
    let terms = tokenize(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<SearchResult> = records
        .into_iter()
        .filter_map(|record| {
            let score = score_record(record, &terms);
            (score > 0).then(|| SearchResult { record: record.clone(), score })
        })
        .collect();

    // stable: equal scores keep insertion order
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results
}
