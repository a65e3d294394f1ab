//! Lazy, seek-based readers over an on-disk index file.
//!
//! Nothing here loads a whole table into memory. A reader knows its
//! region's offset and bucket count; a lookup seeks straight to the
//! right bucket record, follows it to the element-offset array, and
//! parses only the elements in that one chain.
//!
//! Every reader owns its own file handle, obtained by reopening the
//! index file's path rather than sharing a handle, because a handle's
//! seek cursor is unsynchronized state. Readers therefore take
//! `&mut self` for lookups; to read concurrently, duplicate the reader.
//!
//! Readers trust the writer: a corrupt file can produce garbage results
//! or read errors here. Run the fsck checker first when that matters.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{NetworkEndian, ReadBytesExt};
use log::debug;

use crate::doctable::DocId;
use crate::error::{FingerpostErrorKind, FingerpostResult};
use crate::hashtable::{fnv_hash_64, HashKey};
use crate::layout::{
    IndexFileHeader, BUCKET_COUNT_SIZE, BUCKET_RECORD_SIZE, DOCID_TABLE_LEN_SIZE, MAGIC_NUMBER,
    WORD_LEN_SIZE,
};

/// A reader for one serialized hash table region within an index file.
///
/// Construction reads and byte-swaps only the region's bucket count; all
/// further I/O happens per lookup.
pub struct HashTableReader {
    file: File,
    path: PathBuf,
    offset: u32,
    num_buckets: u32,
}

impl HashTableReader {
    /// Open a reader over the table at `offset` within the file at
    /// `path`, with a freshly opened handle of its own.
    pub fn open(path: &Path, offset: u32) -> FingerpostResult<HashTableReader> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        let num_buckets = file.read_u32::<NetworkEndian>()?;
        Ok(HashTableReader {
            file,
            path: path.to_owned(),
            offset,
            num_buckets,
        })
    }

    /// A second reader over the same table with an independent cursor.
    pub fn duplicate(&self) -> FingerpostResult<HashTableReader> {
        Ok(HashTableReader {
            file: File::open(&self.path)?,
            path: self.path.clone(),
            offset: self.offset,
            num_buckets: self.num_buckets,
        })
    }

    /// The number of buckets in this table.
    pub fn num_buckets(&self) -> u32 {
        self.num_buckets
    }

    /// The absolute offsets of the elements chained in `key`'s bucket,
    /// in stored order. The chain may contain elements for other keys
    /// that hash to the same bucket; callers match keys per element.
    ///
    /// This is the one O(1)-seek primitive everything else builds on: a
    /// seek to the bucket record, then a seek to its offset array.
    pub fn lookup_element_positions(&mut self, key: HashKey) -> FingerpostResult<Vec<u32>> {
        let bucket = (key % u64::from(self.num_buckets)) as u32;
        let record_offset =
            u64::from(self.offset) + u64::from(BUCKET_COUNT_SIZE) + u64::from(BUCKET_RECORD_SIZE) * u64::from(bucket);

        self.file.seek(SeekFrom::Start(record_offset))?;
        let chain_len = self.file.read_u32::<NetworkEndian>()?;
        let bucket_position = self.file.read_u32::<NetworkEndian>()?;
        if chain_len == 0 {
            return Ok(Vec::new());
        }

        self.file.seek(SeekFrom::Start(u64::from(bucket_position)))?;
        let mut positions = Vec::with_capacity(chain_len as usize);
        for _ in 0..chain_len {
            positions.push(self.file.read_u32::<NetworkEndian>()?);
        }
        Ok(positions)
    }

    fn seek(&mut self, offset: u32) -> FingerpostResult<()> {
        self.file.seek(SeekFrom::Start(u64::from(offset)))?;
        Ok(())
    }
}

/// An open index file: validates the magic number, exposes the header,
/// and hands out readers for the two regions.
#[derive(Debug)]
pub struct FileIndexReader {
    path: PathBuf,
    header: IndexFileHeader,
}

impl FileIndexReader {
    /// Open `path` and verify it starts with the index magic number.
    pub fn open(path: &Path) -> FingerpostResult<FileIndexReader> {
        let mut file = File::open(path)?;
        let header = IndexFileHeader::read_from(&mut file)?;
        if header.magic != MAGIC_NUMBER {
            return Err(FingerpostErrorKind::BadMagicNumber.into());
        }
        debug!(
            "opened {}: doctable {} bytes, index {} bytes",
            path.display(),
            header.doctable_bytes,
            header.index_bytes
        );
        Ok(FileIndexReader {
            path: path.to_owned(),
            header,
        })
    }

    /// The decoded file header.
    pub fn header(&self) -> &IndexFileHeader {
        &self.header
    }

    /// A reader over the docid→docname region.
    pub fn doctable_reader(&self) -> FingerpostResult<DocTableReader> {
        let reader = HashTableReader::open(&self.path, self.header.doctable_offset())?;
        Ok(DocTableReader { reader })
    }

    /// A reader over the word→postings region.
    pub fn index_table_reader(&self) -> FingerpostResult<IndexTableReader> {
        let reader = HashTableReader::open(&self.path, self.header.index_offset())?;
        Ok(IndexTableReader { reader })
    }
}

/// Resolves docids to document names against the doctable region.
pub struct DocTableReader {
    reader: HashTableReader,
}

impl DocTableReader {
    /// Look up the document name stored under `docid`, if any.
    pub fn lookup_doc_id(&mut self, docid: DocId) -> FingerpostResult<Option<String>> {
        let positions = self.reader.lookup_element_positions(docid)?;
        for position in positions {
            self.reader.seek(position)?;
            let element_docid = self.reader.file.read_u64::<NetworkEndian>()?;
            if element_docid != docid {
                continue;
            }
            let name_len = self.reader.file.read_u16::<NetworkEndian>()?;
            let mut bytes = vec![0u8; usize::from(name_len)];
            self.reader.file.read_exact(&mut bytes)?;
            let name =
                String::from_utf8(bytes).map_err(|_| FingerpostErrorKind::CorruptString)?;
            return Ok(Some(name));
        }
        Ok(None)
    }
}

/// Resolves words to their embedded docid→positions sub-tables against
/// the index region.
pub struct IndexTableReader {
    reader: HashTableReader,
}

impl IndexTableReader {
    /// Look up `word`, returning a reader over its embedded docid table
    /// if the word is present in this index file.
    ///
    /// The returned reader gets its own file handle, so it outlives any
    /// further lookups on `self`.
    pub fn lookup_word(&mut self, word: &str) -> FingerpostResult<Option<DocIdTableReader>> {
        let key = fnv_hash_64(word.as_bytes());
        let positions = self.reader.lookup_element_positions(key)?;
        for position in positions {
            self.reader.seek(position)?;
            let word_len = self.reader.file.read_u16::<NetworkEndian>()?;
            let _docid_table_len = self.reader.file.read_u32::<NetworkEndian>()?;
            let mut bytes = vec![0u8; usize::from(word_len)];
            self.reader.file.read_exact(&mut bytes)?;
            if bytes != word.as_bytes() {
                continue;
            }
            let embedded_offset =
                position + WORD_LEN_SIZE + DOCID_TABLE_LEN_SIZE + u32::from(word_len);
            let reader = HashTableReader::open(&self.reader.path, embedded_offset)?;
            return Ok(Some(DocIdTableReader { reader }));
        }
        Ok(None)
    }
}

/// One entry of a word's posting list: a document and the number of
/// positions recorded for the word in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocIdElement {
    /// The document containing the word.
    pub docid: DocId,
    /// How many times the word occurs in the document.
    pub num_positions: u32,
}

/// A reader over one word's embedded docid→positions table.
pub struct DocIdTableReader {
    reader: HashTableReader,
}

impl DocIdTableReader {
    /// Every (docid, occurrence count) pair in this table, in bucket
    /// order. This walks all buckets but reads only headers, not the
    /// position lists themselves.
    pub fn doc_id_list(&mut self) -> FingerpostResult<Vec<DocIdElement>> {
        let mut all_positions = Vec::new();
        for bucket in 0..u64::from(self.reader.num_buckets) {
            let record_offset = u64::from(self.reader.offset)
                + u64::from(BUCKET_COUNT_SIZE)
                + u64::from(BUCKET_RECORD_SIZE) * bucket;
            self.reader.file.seek(SeekFrom::Start(record_offset))?;
            let chain_len = self.reader.file.read_u32::<NetworkEndian>()?;
            let bucket_position = self.reader.file.read_u32::<NetworkEndian>()?;
            if chain_len == 0 {
                continue;
            }
            self.reader
                .file
                .seek(SeekFrom::Start(u64::from(bucket_position)))?;
            for _ in 0..chain_len {
                all_positions.push(self.reader.file.read_u32::<NetworkEndian>()?);
            }
        }

        let mut elements = Vec::with_capacity(all_positions.len());
        for position in all_positions {
            self.reader.seek(position)?;
            let docid = self.reader.file.read_u64::<NetworkEndian>()?;
            let num_positions = self.reader.file.read_u32::<NetworkEndian>()?;
            elements.push(DocIdElement {
                docid,
                num_positions,
            });
        }
        Ok(elements)
    }

    /// The position list recorded for `docid`, if the document contains
    /// this word.
    pub fn lookup_doc_id(&mut self, docid: DocId) -> FingerpostResult<Option<Vec<u32>>> {
        let positions = self.reader.lookup_element_positions(docid)?;
        for position in positions {
            self.reader.seek(position)?;
            let element_docid = self.reader.file.read_u64::<NetworkEndian>()?;
            if element_docid != docid {
                continue;
            }
            let num_positions = self.reader.file.read_u32::<NetworkEndian>()?;
            let mut word_positions = Vec::with_capacity(num_positions as usize);
            for _ in 0..num_positions {
                word_positions.push(self.reader.file.read_u32::<NetworkEndian>()?);
            }
            return Ok(Some(word_positions));
        }
        Ok(None)
    }
}
