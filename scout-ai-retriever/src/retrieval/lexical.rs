//! Word-overlap scoring
//!
//! A fragment's score is the number of distinct lower-cased,
//! whitespace-separated words it shares with the query. Fragments scoring zero
//! are never returned. Equal scores keep store order.

use super::{RetrievalContext, ScoredFragment, ScoringStrategy};
use crate::error::Result;
use crate::storage::FragmentStore;
use async_trait::async_trait;
use std::collections::HashSet;

/// Distinct lower-cased words of `text`.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Number of words in `query_tokens` that also occur in `text`.
pub fn score(query_tokens: &HashSet<String>, text: &str) -> usize {
    tokenize(text).intersection(query_tokens).count()
}

/// Ranks every fragment of `store` by word overlap with `query`.
pub fn rank_lexical(query: &str, store: &FragmentStore, top_k: usize) -> Vec<ScoredFragment> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, usize)> = store
        .iter()
        .enumerate()
        .map(|(index, fragment)| (index, score(&query_tokens, fragment.text())))
        .filter(|(_, score)| *score > 0)
        .collect();

    // stable: ties stay in store order
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(index, score)| ScoredFragment {
            index,
            score: score as f32,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalStrategy;

#[async_trait]
impl ScoringStrategy for LexicalStrategy {
    async fn rank(
        &self,
        query: &str,
        context: &RetrievalContext,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>> {
        let ranked = rank_lexical(query, context.store(), top_k);
        tracing::debug!(
            "Lexical ranking matched {} of {} fragments",
            ranked.len(),
            context.store().len()
        );
        Ok(ranked)
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_ai_context::Fragment;

    fn store(texts: &[&str]) -> FragmentStore {
        FragmentStore::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Fragment::new(*t, None, i))
                .collect(),
        )
    }

    fn indexes(ranked: &[ScoredFragment]) -> Vec<usize> {
        ranked.iter().map(|s| s.index).collect()
    }

    #[test]
    fn test_tokenize_lowercases_and_dedups() {
        let tokens = tokenize("The  the\tTHE cat\n");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains("the"));
        assert!(tokens.contains("cat"));
        assert!(tokenize(" \n\t").is_empty());
    }

    #[test]
    fn test_repeated_words_count_once() {
        let query = tokenize("cat cat cat");
        assert_eq!(score(&query, "cat cat dog"), 1);
    }

    #[test]
    fn test_punctuation_is_part_of_the_word() {
        let query = tokenize("cat");
        assert_eq!(score(&query, "cat. dog"), 0);
    }

    #[test]
    fn test_ties_keep_store_order() {
        let s = store(&["cat one", "cat two", "cat three", "dog"]);
        assert_eq!(indexes(&rank_lexical("cat", &s, 10)), vec![0, 1, 2]);
    }

    #[test]
    fn test_higher_score_wins() {
        let s = store(&["the cat sat", "a dog ran", "the cat ran"]);
        let ranked = rank_lexical("Cat RAN", &s, 3);
        assert_eq!(indexes(&ranked), vec![2, 0, 1]);
        assert_eq!(ranked[0].score, 2.0);
    }

    #[test]
    fn test_never_more_than_top_k_and_never_zero() {
        let s = store(&["a b", "b c", "c d", "x y"]);
        for top_k in 0..6 {
            let ranked = rank_lexical("a b c d", &s, top_k);
            assert!(ranked.len() <= top_k);
            assert!(ranked.iter().all(|r| r.score > 0.0));
            assert!(!indexes(&ranked).contains(&3));
        }
    }

    #[test]
    fn test_adding_a_query_word_never_lowers_score() {
        let query = tokenize("red fox jumps");
        let before = score(&query, "a brown fox");
        let after = score(&query, "a brown fox jumps");
        assert!(after >= before);
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_deterministic() {
        let s = store(&["one two", "two three", "three one", "two"]);
        let first = rank_lexical("two one", &s, 3);
        for _ in 0..10 {
            assert_eq!(rank_lexical("two one", &s, 3), first);
        }
    }

    #[test]
    fn test_empty_store() {
        assert!(rank_lexical("anything", &FragmentStore::default(), 5).is_empty());
    }
}
