//! On-disk layout of an index file.
//!
//! An index file is a 16-byte header followed by two serialized hash
//! table regions, back to back: the doctable (docid → docname) and the
//! index table (word → embedded docid → positions sub-table). All
//! integers are stored in network byte order, and all positions are
//! absolute 32-bit file offsets.
//!
//! A serialized hash table region looks like:
//!
//! ```text
//! num_buckets: u32
//! num_buckets x { chain_len: u32, bucket_position: u32 }   (0,0 if empty)
//! per non-empty bucket, in bucket order:
//!     chain_len x element_position: u32
//!     the elements themselves
//! ```
//!
//! so the first non-empty bucket's position is always
//! `region_start + 4 + 8 * num_buckets`.

use std::io::{self, Read, Write};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};

/// The magic number at offset 0 of every index file.
pub const MAGIC_NUMBER: u32 = 0xCAFE_F00D;

/// Size of the fixed file header, in bytes.
pub const HEADER_SIZE: u32 = 16;

/// Size of a region's `num_buckets` field.
pub const BUCKET_COUNT_SIZE: u32 = 4;

/// Size of one `{chain_len, bucket_position}` bucket record.
pub const BUCKET_RECORD_SIZE: u32 = 8;

/// Size of one element-position entry in a bucket's offset array.
pub const ELEMENT_POSITION_SIZE: u32 = 4;

/// Size of the word-length field of an index-table element.
pub const WORD_LEN_SIZE: u32 = 2;

/// Size of the embedded-table-length field of an index-table element.
pub const DOCID_TABLE_LEN_SIZE: u32 = 4;

/// The fixed header at the front of an index file: magic number, CRC32
/// over everything after the header, and the two region lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFileHeader {
    /// Always [`MAGIC_NUMBER`] in a well-formed file.
    pub magic: u32,
    /// CRC32 over every byte after the header.
    pub checksum: u32,
    /// Length of the doctable region in bytes.
    pub doctable_bytes: u32,
    /// Length of the index region in bytes.
    pub index_bytes: u32,
}

impl IndexFileHeader {
    /// Decode a header from the start of `reader`.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<IndexFileHeader> {
        Ok(IndexFileHeader {
            magic: reader.read_u32::<NetworkEndian>()?,
            checksum: reader.read_u32::<NetworkEndian>()?,
            doctable_bytes: reader.read_u32::<NetworkEndian>()?,
            index_bytes: reader.read_u32::<NetworkEndian>()?,
        })
    }

    /// Encode the header into `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<NetworkEndian>(self.magic)?;
        writer.write_u32::<NetworkEndian>(self.checksum)?;
        writer.write_u32::<NetworkEndian>(self.doctable_bytes)?;
        writer.write_u32::<NetworkEndian>(self.index_bytes)?;
        Ok(())
    }

    /// Offset of the doctable region.
    pub fn doctable_offset(&self) -> u32 {
        HEADER_SIZE
    }

    /// Offset of the index region.
    pub fn index_offset(&self) -> u32 {
        HEADER_SIZE + self.doctable_bytes
    }
}
