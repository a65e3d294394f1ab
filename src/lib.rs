//! `fingerpost` is a file-backed inverted search index.
//!
//! Documents are crawled and tokenized into an in-memory index (module
//! `crawl` feeding `doctable` and `memindex`, both built on the chained
//! hash table in `hashtable`), serialized once into a compact binary
//! hash-table file (`write`), and from then on queried lazily through
//! seek-based readers without loading the file (`read`, `query`). A
//! separate checker (`fsck`) re-validates a file's structural
//! invariants independently of the readers.
//!
//! The binaries wire these together: `fingerpost` builds an index file
//! from a directory tree, `fingerpost-search` runs queries against one
//! or more index files, and `fingerpost-fsck` audits a file and prints
//! its findings.

pub mod crawl;
pub mod doctable;
pub mod error;
pub mod fsck;
pub mod hashtable;
pub mod layout;
pub mod memindex;
pub mod query;
pub mod read;
pub mod write;

mod tmp;

use std::path::Path;

pub use crate::doctable::{DocId, DocTable};
pub use crate::error::{FingerpostError, FingerpostErrorKind, FingerpostResult};
pub use crate::memindex::{MemIndex, SearchResult};
pub use crate::query::{QueryProcessor, QueryResult};

/// Crawl the tree under `docroot` and write one index file at `output`,
/// returning the number of bytes written.
pub fn build_index_file(docroot: &Path, output: &Path) -> FingerpostResult<u64> {
    let (doctable, index) = crawl::crawl_tree(docroot)?;
    write::write_index(&index, &doctable, output)
}
