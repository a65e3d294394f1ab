//! Serializing a [`DocTable`] and [`MemIndex`] into the on-disk index
//! format.
//!
//! Each hash table region is laid out in two passes: the first computes
//! every element's size and therefore every bucket's position and every
//! element's offset, the second streams the bytes. Offsets are absolute
//! within the file, so a region must know where it will land before it
//! can be encoded; the doctable always lands right after the header, and
//! the index region right after the doctable.

use std::fs;
use std::io::Write;
use std::path::Path;

use byteorder::{NetworkEndian, WriteBytesExt};
use log::{debug, info};

use crate::doctable::DocTable;
use crate::error::{FingerpostErrorKind, FingerpostResult};
use crate::hashtable::{HashKey, HashTable};
use crate::layout::{
    IndexFileHeader, BUCKET_COUNT_SIZE, BUCKET_RECORD_SIZE, DOCID_TABLE_LEN_SIZE,
    ELEMENT_POSITION_SIZE, HEADER_SIZE, MAGIC_NUMBER, WORD_LEN_SIZE,
};
use crate::memindex::MemIndex;
use crate::tmp::TmpDir;

/// Write `index` and `doctable` as one index file at `path`, returning
/// the total number of bytes written.
///
/// The file is staged in a temporary file in the same directory and
/// renamed into place, so `path` either holds a complete index or
/// whatever it held before; a written index is never updated in place.
pub fn write_index(index: &MemIndex, doctable: &DocTable, path: &Path) -> FingerpostResult<u64> {
    let doctable_region = serialize_doctable(HEADER_SIZE, doctable)?;
    let index_offset = checked_offset(u64::from(HEADER_SIZE) + doctable_region.len() as u64)?;
    let index_region = serialize_index_table(index_offset, index)?;
    checked_offset(u64::from(index_offset) + index_region.len() as u64)?;

    let mut crc = crc32fast::Hasher::new();
    crc.update(&doctable_region);
    crc.update(&index_region);

    let header = IndexFileHeader {
        magic: MAGIC_NUMBER,
        checksum: crc.finalize(),
        doctable_bytes: doctable_region.len() as u32,
        index_bytes: index_region.len() as u32,
    };

    let out_dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp_dir = TmpDir::new(out_dir.unwrap_or_else(|| Path::new(".")));
    let (tmp_path, mut writer) = tmp_dir.create()?;
    header.write_to(&mut writer)?;
    writer.write_all(&doctable_region)?;
    writer.write_all(&index_region)?;
    writer.flush()?;
    drop(writer);
    fs::rename(&tmp_path, path)?;

    let total =
        u64::from(HEADER_SIZE) + doctable_region.len() as u64 + index_region.len() as u64;
    info!(
        "wrote index {}: {} docs, {} words, {} bytes",
        path.display(),
        doctable.num_docs(),
        index.num_words(),
        total
    );
    Ok(total)
}

// Reject anything the 32-bit offset space cannot address.
fn checked_offset(offset: u64) -> FingerpostResult<u32> {
    u32::try_from(offset).map_err(|_| FingerpostErrorKind::IndexTooLarge.into())
}

/// Bucket positions and element offsets for one region, computed from
/// element sizes alone before any bytes exist.
struct TableLayout {
    /// One `(chain_len, bucket_position)` record per bucket.
    bucket_records: Vec<(u32, u32)>,
    /// Absolute element offsets, per bucket.
    element_offsets: Vec<Vec<u32>>,
    /// Total region size in bytes.
    total_size: u32,
}

fn layout_table(base: u32, element_sizes: &[Vec<u32>]) -> FingerpostResult<TableLayout> {
    let num_buckets = element_sizes.len() as u64;
    let mut cursor =
        u64::from(base) + u64::from(BUCKET_COUNT_SIZE) + u64::from(BUCKET_RECORD_SIZE) * num_buckets;

    let mut bucket_records = Vec::with_capacity(element_sizes.len());
    let mut element_offsets = Vec::with_capacity(element_sizes.len());
    for sizes in element_sizes {
        if sizes.is_empty() {
            bucket_records.push((0, 0));
            element_offsets.push(Vec::new());
            continue;
        }
        let bucket_position = checked_offset(cursor)?;
        // The offset array sits at the bucket position; the elements
        // follow it back to back.
        let mut element_cursor =
            cursor + u64::from(ELEMENT_POSITION_SIZE) * sizes.len() as u64;
        let mut offsets = Vec::with_capacity(sizes.len());
        for &size in sizes {
            offsets.push(checked_offset(element_cursor)?);
            element_cursor += u64::from(size);
        }
        bucket_records.push((sizes.len() as u32, bucket_position));
        element_offsets.push(offsets);
        cursor = element_cursor;
    }

    Ok(TableLayout {
        bucket_records,
        element_offsets,
        total_size: checked_offset(cursor - u64::from(base))?,
    })
}

// Emit the region prelude shared by every table: the bucket count and
// the bucket-record array.
fn emit_table_prelude(out: &mut Vec<u8>, layout: &TableLayout) -> FingerpostResult<()> {
    out.write_u32::<NetworkEndian>(layout.bucket_records.len() as u32)?;
    for &(chain_len, bucket_position) in &layout.bucket_records {
        out.write_u32::<NetworkEndian>(chain_len)?;
        out.write_u32::<NetworkEndian>(bucket_position)?;
    }
    Ok(())
}

fn emit_element_offsets(out: &mut Vec<u8>, offsets: &[u32]) -> FingerpostResult<()> {
    for &offset in offsets {
        out.write_u32::<NetworkEndian>(offset)?;
    }
    Ok(())
}

/// Serialize a table whose elements can be encoded without knowing their
/// own offsets (the doctable and the docid→positions tables).
fn serialize_flat_table<V>(
    base: u32,
    table: &HashTable<V>,
    encode: impl Fn(HashKey, &V, &mut Vec<u8>) -> FingerpostResult<()>,
) -> FingerpostResult<Vec<u8>> {
    // Pass one: encode each chain's elements and collect their sizes.
    let mut chains: Vec<Vec<Vec<u8>>> = Vec::with_capacity(table.num_buckets());
    let mut sizes: Vec<Vec<u32>> = Vec::with_capacity(table.num_buckets());
    for bucket in 0..table.num_buckets() {
        let mut encoded = Vec::new();
        let mut chain_sizes = Vec::new();
        for (key, value) in table.chain(bucket) {
            let mut bytes = Vec::new();
            encode(*key, value, &mut bytes)?;
            chain_sizes.push(bytes.len() as u32);
            encoded.push(bytes);
        }
        chains.push(encoded);
        sizes.push(chain_sizes);
    }

    // Pass two: lay out and stream.
    let layout = layout_table(base, &sizes)?;
    let mut out = Vec::with_capacity(layout.total_size as usize);
    emit_table_prelude(&mut out, &layout)?;
    for (bucket, encoded) in chains.iter().enumerate() {
        emit_element_offsets(&mut out, &layout.element_offsets[bucket])?;
        for bytes in encoded {
            out.extend_from_slice(bytes);
        }
    }
    debug_assert_eq!(out.len() as u32, layout.total_size);
    Ok(out)
}

fn serialize_doctable(base: u32, doctable: &DocTable) -> FingerpostResult<Vec<u8>> {
    serialize_flat_table(base, doctable.id_table(), |docid, name, out| {
        let name_len = u16::try_from(name.len())
            .map_err(|_| FingerpostErrorKind::DocumentNameTooLong)?;
        out.write_u64::<NetworkEndian>(docid)?;
        out.write_u16::<NetworkEndian>(name_len)?;
        out.extend_from_slice(name.as_bytes());
        Ok(())
    })
}

fn serialize_docid_table(base: u32, doc_ids: &HashTable<Vec<u32>>) -> FingerpostResult<Vec<u8>> {
    serialize_flat_table(base, doc_ids, |docid, positions, out| {
        out.write_u64::<NetworkEndian>(docid)?;
        out.write_u32::<NetworkEndian>(positions.len() as u32)?;
        for &position in positions {
            out.write_u32::<NetworkEndian>(position)?;
        }
        Ok(())
    })
}

// Size of a serialized docid→positions table, needed to lay out the
// index region before the embedded tables are encoded.
fn docid_table_size(doc_ids: &HashTable<Vec<u32>>) -> u64 {
    let mut size =
        u64::from(BUCKET_COUNT_SIZE) + u64::from(BUCKET_RECORD_SIZE) * doc_ids.num_buckets() as u64;
    for bucket in 0..doc_ids.num_buckets() {
        for (_, positions) in doc_ids.chain(bucket) {
            size += u64::from(ELEMENT_POSITION_SIZE); // offset-array entry
            size += 8 + 4 + 4 * positions.len() as u64; // docid, count, positions
        }
    }
    size
}

/// Serialize the index region. Word elements embed a whole sub-table, so
/// their bytes depend on where they land; sizes are computed first, then
/// each element is encoded at its assigned offset.
fn serialize_index_table(base: u32, index: &MemIndex) -> FingerpostResult<Vec<u8>> {
    let table = index.table();

    let mut sizes: Vec<Vec<u32>> = Vec::with_capacity(table.num_buckets());
    for bucket in 0..table.num_buckets() {
        let mut chain_sizes = Vec::new();
        for (_, set) in table.chain(bucket) {
            if set.word.len() > usize::from(u16::MAX) {
                return Err(FingerpostErrorKind::WordTooLong.into());
            }
            let element_size = u64::from(WORD_LEN_SIZE)
                + u64::from(DOCID_TABLE_LEN_SIZE)
                + set.word.len() as u64
                + docid_table_size(&set.doc_ids);
            chain_sizes.push(checked_offset(element_size)?);
        }
        sizes.push(chain_sizes);
    }

    let layout = layout_table(base, &sizes)?;
    let mut out = Vec::with_capacity(layout.total_size as usize);
    emit_table_prelude(&mut out, &layout)?;
    for bucket in 0..table.num_buckets() {
        emit_element_offsets(&mut out, &layout.element_offsets[bucket])?;
        for (slot, (_, set)) in table.chain(bucket).iter().enumerate() {
            let element_offset = layout.element_offsets[bucket][slot];
            let embedded_base = element_offset
                + WORD_LEN_SIZE
                + DOCID_TABLE_LEN_SIZE
                + set.word.len() as u32;
            let embedded = serialize_docid_table(embedded_base, &set.doc_ids)?;
            out.write_u16::<NetworkEndian>(set.word.len() as u16)?;
            out.write_u32::<NetworkEndian>(embedded.len() as u32)?;
            out.extend_from_slice(set.word.as_bytes());
            out.extend_from_slice(&embedded);
            debug!(
                "word {:?}: element at {:#x}, {} byte docid table",
                set.word,
                element_offset,
                embedded.len()
            );
        }
    }
    debug_assert_eq!(out.len() as u32, layout.total_size);
    Ok(out)
}
