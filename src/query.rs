//! Multi-word queries across one or more on-disk index files.

use std::path::Path;

use log::debug;

use crate::error::FingerpostResult;
use crate::read::{DocIdElement, DocTableReader, FileIndexReader, IndexTableReader};

/// One ranked hit: a document name and its summed occurrence count for
/// the query words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// The matching document's registered name.
    pub document_name: String,
    /// Summed occurrence count across the query words.
    pub rank: u32,
}

/// Runs queries against a set of open index files.
///
/// Each file contributes a pair of region readers with their own file
/// handles; queries never share a cursor between files.
pub struct QueryProcessor {
    readers: Vec<(DocTableReader, IndexTableReader)>,
}

impl QueryProcessor {
    /// Open every index file in `index_paths`.
    ///
    /// Panics if the list is empty: a processor with nothing to search
    /// is a caller bug, not a runtime condition.
    pub fn open<P: AsRef<Path>>(index_paths: &[P]) -> FingerpostResult<QueryProcessor> {
        assert!(
            !index_paths.is_empty(),
            "query processor needs at least one index file"
        );
        let mut readers = Vec::with_capacity(index_paths.len());
        for path in index_paths {
            let file_reader = FileIndexReader::open(path.as_ref())?;
            readers.push((
                file_reader.doctable_reader()?,
                file_reader.index_table_reader()?,
            ));
        }
        Ok(QueryProcessor { readers })
    }

    /// Process a query, returning results from all files, sorted
    /// ascending by rank.
    ///
    /// Each index file is processed independently: the first word's
    /// posting list seeds that file's result set, every further word
    /// intersects it by docid while accumulating occurrence counts, and
    /// a word missing from the file clears only that file's partial
    /// result. A word missing from one file is therefore not a global
    /// failure, and absence overall yields an empty result, not an
    /// error.
    ///
    /// Panics on an empty query; callers reject those up front.
    pub fn process_query(&mut self, query: &[&str]) -> FingerpostResult<Vec<QueryResult>> {
        let Some((first, rest)) = query.split_first() else {
            panic!("empty query");
        };

        let mut final_results = Vec::new();
        for (doc_table, index_table) in &mut self.readers {
            let Some(mut docid_table) = index_table.lookup_word(first)? else {
                continue;
            };
            let mut docid_list = docid_table.doc_id_list()?;

            for word in rest {
                let Some(mut docid_table) = index_table.lookup_word(word)? else {
                    docid_list.clear();
                    break;
                };
                let word_docid_list = docid_table.doc_id_list()?;
                docid_list = combine_docid_lists(&docid_list, &word_docid_list);
                if docid_list.is_empty() {
                    break;
                }
            }
            debug!("{} candidate docs after intersection", docid_list.len());

            for element in docid_list {
                if let Some(document_name) = doc_table.lookup_doc_id(element.docid)? {
                    final_results.push(QueryResult {
                        document_name,
                        rank: element.num_positions,
                    });
                }
            }
        }

        final_results.sort_by_key(|result| result.rank);
        Ok(final_results)
    }
}

// Intersect by docid; survivors carry the sum of both occurrence counts.
fn combine_docid_lists(
    running: &[DocIdElement],
    current: &[DocIdElement],
) -> Vec<DocIdElement> {
    let mut combined = Vec::new();
    for held in running {
        for candidate in current {
            if held.docid == candidate.docid {
                combined.push(DocIdElement {
                    docid: held.docid,
                    num_positions: held.num_positions + candidate.num_positions,
                });
            }
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(docid: u64, num_positions: u32) -> DocIdElement {
        DocIdElement {
            docid,
            num_positions,
        }
    }

    #[test]
    fn combine_keeps_only_shared_docids_and_sums_counts() {
        let running = vec![elem(1, 2), elem(2, 1), elem(5, 7)];
        let current = vec![elem(2, 3), elem(5, 1), elem(9, 4)];
        let combined = combine_docid_lists(&running, &current);
        assert_eq!(combined, vec![elem(2, 4), elem(5, 8)]);
    }

    #[test]
    fn combine_with_disjoint_lists_is_empty() {
        let running = vec![elem(1, 1)];
        let current = vec![elem(2, 1)];
        assert!(combine_docid_lists(&running, &current).is_empty());
    }
}
