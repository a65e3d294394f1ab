//! Crawling a directory tree into a [`DocTable`] and [`MemIndex`].
//!
//! Tokenization is deliberately simple: runs of ASCII alphabetic bytes,
//! case-folded to lowercase, split on every other byte. A word's
//! position is the byte offset of its first character, so positions are
//! strictly increasing within a document by construction.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::doctable::DocTable;
use crate::error::FingerpostResult;
use crate::hashtable::{fnv_hash_64, HashTable};
use crate::memindex::MemIndex;

const WORD_TABLE_BUCKETS: usize = 32;

// One document's postings while it is being scanned.
struct WordPositions {
    word: String,
    positions: Vec<u32>,
}

/// Crawl every regular file under `root`, producing the document table
/// and in-memory inverted index for the whole tree.
///
/// Files are visited in sorted path order, so docids are deterministic
/// for a given tree. Unreadable files propagate their I/O error.
pub fn crawl_tree(root: &Path) -> FingerpostResult<(DocTable, MemIndex)> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut doctable = DocTable::new();
    let mut index = MemIndex::new();
    for file in &files {
        let contents = fs::read(file)?;
        let docid = doctable.register_document_name(&file.to_string_lossy());
        add_document(&mut index, docid, &contents);
        debug!("indexed doc {docid}: {} ({} bytes)", file.display(), contents.len());
    }
    info!(
        "crawled {}: {} docs, {} distinct words",
        root.display(),
        doctable.num_docs(),
        index.num_words()
    );
    Ok((doctable, index))
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> FingerpostResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}

// Tokenize one document and hand each distinct word's position list to
// the index exactly once.
fn add_document(index: &mut MemIndex, docid: u64, contents: &[u8]) {
    let mut words: HashTable<WordPositions> = HashTable::new(WORD_TABLE_BUCKETS);

    for (start, word) in tokenize(contents) {
        let key = fnv_hash_64(word.as_bytes());
        match words.lookup_mut(key) {
            Some(entry) => entry.positions.push(start),
            None => {
                words.insert(
                    key,
                    WordPositions {
                        word,
                        positions: vec![start],
                    },
                );
            }
        }
    }

    // Drain the per-document table through the cursor; each deletion
    // hands us ownership of the positions.
    let mut cursor = words.cursor();
    while let Some((_, entry)) = cursor.delete_current() {
        index.add_posting_list(&entry.word, docid, entry.positions);
    }
}

// Yields (byte offset, lowercased word) for every ASCII-alphabetic run.
fn tokenize(contents: &[u8]) -> impl Iterator<Item = (u32, String)> + '_ {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        while pos < contents.len() && !contents[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos >= contents.len() {
            return None;
        }
        let start = pos;
        while pos < contents.len() && contents[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        let word = contents[start..pos]
            .iter()
            .map(|b| b.to_ascii_lowercase() as char)
            .collect();
        Some((start as u32, word))
    })
}
