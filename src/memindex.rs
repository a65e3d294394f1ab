//! The in-memory inverted index: word → (document → positions).

use log::debug;

use crate::doctable::DocId;
use crate::hashtable::{fnv_hash_64, HashTable};

const INDEX_BUCKETS: usize = 128;
const DOCID_TABLE_BUCKETS: usize = 64;

/// All the documents containing one word, with the positions at which
/// the word appears in each.
pub struct WordDocSet {
    pub(crate) word: String,
    /// docid → positions, in increasing order of appearance.
    pub(crate) doc_ids: HashTable<Vec<u32>>,
}

impl WordDocSet {
    /// The word this set is about.
    pub fn word(&self) -> &str {
        &self.word
    }
}

/// One query hit: a document and its accumulated rank.
///
/// The rank of a document is the summed occurrence count of every query
/// word within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The matching document.
    pub docid: DocId,
    /// Summed occurrence count across the query words.
    pub rank: u32,
}

/// An inverted index held entirely in memory, keyed by the FNV hash of
/// each word.
pub struct MemIndex {
    table: HashTable<WordDocSet>,
}

impl MemIndex {
    /// Create an empty index.
    pub fn new() -> MemIndex {
        MemIndex {
            table: HashTable::new(INDEX_BUCKETS),
        }
    }

    /// The number of distinct words in the index.
    pub fn num_words(&self) -> usize {
        self.table.num_elements()
    }

    /// True if no postings have been added yet.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub(crate) fn table(&self) -> &HashTable<WordDocSet> {
        &self.table
    }

    /// Record that `word` occurs in `docid` at the given positions.
    ///
    /// Positions must be in increasing order of appearance; the crawler
    /// produces them that way by scanning each document once, and they
    /// are never re-sorted here.
    ///
    /// Panics if the same (word, docid) pair is added twice. The crawler
    /// hands over each document's postings exactly once, so a duplicate
    /// is an internal contract violation, not a runtime condition.
    pub fn add_posting_list(&mut self, word: &str, docid: DocId, positions: Vec<u32>) {
        let word_key = fnv_hash_64(word.as_bytes());

        if self.table.lookup(word_key).is_none() {
            debug!("first posting for word {word:?}");
            let set = WordDocSet {
                word: word.to_string(),
                doc_ids: HashTable::new(DOCID_TABLE_BUCKETS),
            };
            self.table.insert(word_key, set);
        }
        let Some(set) = self.table.lookup_mut(word_key) else {
            unreachable!("word {word:?} vanished between insert and lookup");
        };

        assert!(
            set.doc_ids.lookup(docid).is_none(),
            "duplicate posting list for word {word:?} in doc {docid}"
        );
        set.doc_ids.insert(docid, positions);
    }

    /// Run a multi-word query against the index.
    ///
    /// The first word seeds the result set with every matching document,
    /// ranked by occurrence count. Each further word intersects the set
    /// by docid, adding its own occurrence count to the survivors' ranks.
    /// A word with no matches empties the whole result. Results come back
    /// sorted ascending by rank.
    ///
    /// An empty query yields an empty result, not an error.
    pub fn process_query(&self, query: &[&str]) -> Vec<SearchResult> {
        let Some((first, rest)) = query.split_first() else {
            return Vec::new();
        };

        let Some(set) = self.lookup_word(first) else {
            return Vec::new();
        };
        let mut results: Vec<SearchResult> = set
            .doc_ids
            .entries()
            .map(|(docid, positions)| SearchResult {
                docid,
                rank: positions.len() as u32,
            })
            .collect();

        for word in rest {
            let Some(set) = self.lookup_word(word) else {
                return Vec::new();
            };
            results.retain_mut(|result| match set.doc_ids.lookup(result.docid) {
                Some(positions) => {
                    result.rank += positions.len() as u32;
                    true
                }
                None => false,
            });
            if results.is_empty() {
                return Vec::new();
            }
        }

        results.sort_by_key(|result| result.rank);
        results
    }

    fn lookup_word(&self, word: &str) -> Option<&WordDocSet> {
        self.table.lookup(fnv_hash_64(word.as_bytes()))
    }
}

impl Default for MemIndex {
    fn default() -> Self {
        MemIndex::new()
    }
}
