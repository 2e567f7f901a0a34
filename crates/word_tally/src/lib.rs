//! Word-frequency tallies built on persistent trie maps.
//!
//! Each text is tallied inside one transaction (no intermediate map
//! versions), and tallies from many texts combine with a summing merge.
//! Because the maps are persistent, a combined tally shares structure with
//! its inputs and every intermediate result stays valid.

use sharetrie_rs::TrieMap;

/// A word → count tally backed by a persistent map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    counts: TrieMap<String, u64>,
}

impl Tally {
    pub fn new() -> Self {
        Tally { counts: TrieMap::new() }
    }

    /// Tallies the whitespace-delimited tokens of `text` in one transaction.
    pub fn of_text(text: &str) -> Self {
        let counts = TrieMap::new().transaction(|tx| {
            for token in text.split_whitespace() {
                let count = tx.get(token).expect("open commit").copied().unwrap_or(0);
                tx.insert(token.to_string(), count + 1).expect("open commit");
            }
        });
        Tally { counts }
    }

    /// Combines two tallies with a summing merge.
    pub fn merge(&self, other: &Tally) -> Self {
        Tally { counts: self.counts.merge_with(&other.counts, |_, ours, theirs| ours + theirs) }
    }

    /// Count for a single word.
    pub fn count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Total number of tokens tallied.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct words.
    pub fn distinct(&self) -> usize {
        self.counts.size()
    }

    /// The most frequent word and its count, if any.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.counts.iter().max_by_key(|(_, &count)| count).map(|(word, &count)| (word.as_str(), count))
    }

    /// Words occurring at least `threshold` times.
    pub fn at_least(&self, threshold: u64) -> TrieMap<String, u64> {
        self.counts.filter(|_, &count| count >= threshold)
    }

    /// The underlying persistent map.
    pub fn counts(&self) -> &TrieMap<String, u64> {
        &self.counts
    }
}

impl FromIterator<Tally> for Tally {
    fn from_iter<I: IntoIterator<Item = Tally>>(iter: I) -> Self {
        iter.into_iter().fold(Tally::new(), |acc, next| acc.merge(&next))
    }
}
