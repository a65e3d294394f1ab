//! Structural validation of an on-disk index file.
//!
//! The checker walks the file the same way the readers do, but instead
//! of returning values it validates every invariant the writer is
//! supposed to maintain and collects a diagnostic for each violation.
//! Diagnostics are advisory: a finding never stops the rest of the pass,
//! so one run reports everything discoverable.
//!
//! Many real-world failures of this format are missed byte-order
//! conversions, so whenever a mismatched field would match after a byte
//! swap, the diagnostic says so.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{NetworkEndian, ReadBytesExt};
use log::info;

use crate::error::FingerpostResult;
use crate::layout::{
    BUCKET_COUNT_SIZE, BUCKET_RECORD_SIZE, DOCID_TABLE_LEN_SIZE, ELEMENT_POSITION_SIZE,
    HEADER_SIZE, MAGIC_NUMBER, WORD_LEN_SIZE,
};

// Sanity bounds, matching what a plausible index can contain.
const MAX_WORD_LEN: u16 = 8192;
const MAX_DOCNAME_LEN: u16 = 8192;
const MAX_POSITIONS: u32 = 1_000_000;

/// One problem found in an index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Which field or invariant failed, e.g. `"checksum"` or
    /// `"bucket_rec[3].position < bucket_rec[4].position"`.
    pub field: String,
    /// What was expected versus observed.
    pub detail: String,
    /// True when the observed value would match after an endianness
    /// swap, which usually means a missed byte-order conversion.
    pub endianness_hint: bool,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.detail)?;
        if self.endianness_hint {
            write!(
                f,
                "  Note: probably a missed byte-order conversion, since the \
                 byte-swapped value matches."
            )?;
        }
        Ok(())
    }
}

/// Everything one fsck pass found.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// All diagnostics, in discovery order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    /// True when the file passed every check.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Which kind of element a table holds, selecting how elements are
/// decoded and which invariants apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    /// docid + docname, in the doctable region.
    DocName,
    /// word + embedded docid table, in the index region.
    Word,
    /// docid + positions, in an embedded docid table.
    DocIdPositions,
}

/// Check the index file at `path` and return every diagnostic found.
///
/// Only I/O failures on the file itself are errors; structural problems,
/// including truncation, come back as diagnostics.
pub fn check_index_file(path: &Path) -> FingerpostResult<CheckReport> {
    info!("fsck'ing {}", path.display());
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut checker = Checker {
        file,
        file_len,
        report: CheckReport::default(),
    };
    checker.check_file()?;
    Ok(checker.report)
}

struct Checker {
    file: File,
    file_len: u64,
    report: CheckReport,
}

impl Checker {
    fn check_file(&mut self) -> FingerpostResult<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let magic = self.file.read_u32::<NetworkEndian>()?;
        self.check_eq32(MAGIC_NUMBER, magic, "magic number");

        let checksum = self.file.read_u32::<NetworkEndian>()?;
        let doctable_bytes = self.file.read_u32::<NetworkEndian>()?;
        let index_bytes = self.file.read_u32::<NetworkEndian>()?;

        // The two region lengths must account for every post-header byte.
        let body_len = self.file_len.saturating_sub(u64::from(HEADER_SIZE)) as u32;
        self.check_eq32(
            body_len,
            doctable_bytes.wrapping_add(index_bytes),
            "doctable_bytes + index_bytes",
        );

        // Recompute the checksum over everything after the header.
        let mut crc = crc32fast::Hasher::new();
        let mut remaining = u64::from(body_len);
        let mut buf = [0u8; 512];
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            self.file.read_exact(&mut buf[..want])?;
            crc.update(&buf[..want]);
            remaining -= want as u64;
        }
        self.check_eq32(crc.finalize(), checksum, "checksum");

        if let Err(err) = self.check_table(HEADER_SIZE, doctable_bytes, ElementKind::DocName) {
            self.truncation(err, "doctable region")?;
        }
        if let Err(err) = self.check_table(
            HEADER_SIZE.wrapping_add(doctable_bytes),
            index_bytes,
            ElementKind::Word,
        ) {
            self.truncation(err, "index region")?;
        }
        Ok(())
    }

    // Walk one serialized hash table: bucket count, bucket records,
    // offset arrays, and each element, recursing into embedded tables
    // for word elements.
    fn check_table(&mut self, offset: u32, len: u32, kind: ElementKind) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(u64::from(offset)))?;
        let num_buckets = self.file.read_u32::<NetworkEndian>()?;
        self.check_lt32(
            num_buckets.wrapping_mul(BUCKET_RECORD_SIZE),
            len,
            &format!("{kind:?}: num_buckets * 8 < len(table)"),
        );

        // Wrapping arithmetic: a corrupt field must yield a diagnostic,
        // not an overflow panic.
        let table_end = offset.wrapping_add(len);
        let records_end = offset
            .wrapping_add(BUCKET_COUNT_SIZE)
            .wrapping_add(BUCKET_RECORD_SIZE.wrapping_mul(num_buckets));
        let mut prev_position: Option<u32> = None;

        for bucket in 0..num_buckets {
            let record_offset = u64::from(offset)
                + u64::from(BUCKET_COUNT_SIZE)
                + u64::from(BUCKET_RECORD_SIZE) * u64::from(bucket);
            self.file.seek(SeekFrom::Start(record_offset))?;
            let chain_len = self.file.read_u32::<NetworkEndian>()?;
            let bucket_position = self.file.read_u32::<NetworkEndian>()?;
            if chain_len == 0 {
                continue;
            }

            match prev_position {
                None => {
                    // The first non-empty bucket must sit flush against
                    // the bucket-record array.
                    self.check_eq32(
                        records_end,
                        bucket_position,
                        &format!(
                            "{kind:?}: position of the first non-empty bucket \
                             (expected table start + 4 + 8*num_buckets)"
                        ),
                    );
                }
                Some(prev) => {
                    self.check_lt32(
                        prev,
                        bucket_position,
                        &format!(
                            "{kind:?}: bucket_rec[{bucket}].position increases \
                             over the previous non-empty bucket"
                        ),
                    );
                }
            }
            prev_position = Some(bucket_position);
            self.check_lt32(
                bucket_position,
                table_end.wrapping_add(1),
                &format!("{kind:?}: bucket_rec[{bucket}].position < table_end + 1"),
            );

            for slot in 0..chain_len {
                self.file.seek(SeekFrom::Start(
                    u64::from(bucket_position) + u64::from(ELEMENT_POSITION_SIZE) * u64::from(slot),
                ))?;
                let element_position = self.file.read_u32::<NetworkEndian>()?;
                self.check_lt32(
                    element_position,
                    table_end.wrapping_add(1),
                    &format!("{kind:?}: bucket[{bucket}].element[{slot}].position < table_end + 1"),
                );
                self.check_element(kind, element_position, bucket, num_buckets, offset, len)?;
            }
        }
        Ok(())
    }

    fn check_element(
        &mut self,
        kind: ElementKind,
        element_offset: u32,
        bucket: u32,
        num_buckets: u32,
        table_offset: u32,
        table_len: u32,
    ) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(u64::from(element_offset)))?;
        match kind {
            ElementKind::DocName => {
                let _docid = self.file.read_u64::<NetworkEndian>()?;
                let name_len = self.file.read_u16::<NetworkEndian>()?;
                self.check_lt16(
                    name_len,
                    MAX_DOCNAME_LEN,
                    &format!("[doctable] unreasonably long docname in bucket[{bucket}]"),
                );
                self.check_lt32(
                    element_offset.wrapping_add(8 + 2 + u32::from(name_len)),
                    table_offset.wrapping_add(table_len).wrapping_add(1),
                    &format!("[doctable] element_end < doctable_end + 1 in bucket[{bucket}]"),
                );
            }
            ElementKind::Word => {
                let word_len = self.file.read_u16::<NetworkEndian>()?;
                let docid_table_len = self.file.read_u32::<NetworkEndian>()?;
                self.check_lt16(
                    word_len,
                    MAX_WORD_LEN,
                    &format!("[index table] unreasonably long word in bucket[{bucket}]"),
                );
                self.check_lt32(
                    element_offset
                        .wrapping_add(WORD_LEN_SIZE + DOCID_TABLE_LEN_SIZE)
                        .wrapping_add(u32::from(word_len)),
                    table_offset.wrapping_add(table_len),
                    &format!("[index table] element_end < indextable_end in bucket[{bucket}]"),
                );

                let mut word = vec![0u8; usize::from(word_len)];
                self.file.read_exact(&mut word)?;
                for (i, &byte) in word.iter().enumerate() {
                    self.check_eq16(
                        1,
                        u16::from(byte.is_ascii()),
                        &format!("[index table] is_ascii(word[{i}]) in bucket[{bucket}]"),
                    );
                    if byte.is_ascii_alphabetic() {
                        self.check_eq16(
                            1,
                            u16::from(byte.is_ascii_lowercase()),
                            &format!("[index table] is_lowercase(word[{i}]) in bucket[{bucket}]"),
                        );
                    }
                }

                // A truncated embedded table ends only this sub-walk;
                // the rest of the index region is still checked.
                let embedded_offset = element_offset
                    .wrapping_add(WORD_LEN_SIZE + DOCID_TABLE_LEN_SIZE)
                    .wrapping_add(u32::from(word_len));
                if let Err(err) =
                    self.check_table(embedded_offset, docid_table_len, ElementKind::DocIdPositions)
                {
                    self.truncation(
                        err,
                        &format!("[index table] embedded docid table in bucket[{bucket}]"),
                    )?;
                }
            }
            ElementKind::DocIdPositions => {
                let docid = self.file.read_u64::<NetworkEndian>()?;
                self.check_eq64(
                    u64::from(bucket),
                    docid % u64::from(num_buckets),
                    "[docid table] docid % num_buckets == bucket_number",
                );
                let num_positions = self.file.read_u32::<NetworkEndian>()?;
                self.check_lt32(num_positions, MAX_POSITIONS, "[docid table] num_positions");

                let mut prev_position: Option<u32> = None;
                for _ in 0..num_positions {
                    let position = self.file.read_u32::<NetworkEndian>()?;
                    if let Some(prev) = prev_position {
                        self.check_lt32(
                            prev,
                            position,
                            "[docid table] word position[i] < word position[i+1]",
                        );
                    }
                    prev_position = Some(position);
                }
            }
        }
        Ok(())
    }

    // A truncated structure is a finding, not an fsck failure; any other
    // I/O error is real.
    fn truncation(&mut self, err: io::Error, what: &str) -> io::Result<()> {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            self.report.diagnostics.push(Diagnostic {
                field: what.to_string(),
                detail: "structure extends past the end of the file".to_string(),
                endianness_hint: false,
            });
            return Ok(());
        }
        Err(err)
    }

    fn check_eq16(&mut self, expected: u16, actual: u16, field: &str) {
        if expected == actual {
            return;
        }
        self.push(field, format!("expected {expected:#x}, but actually is {actual:#x}."), actual.swap_bytes() == expected);
    }

    fn check_eq32(&mut self, expected: u32, actual: u32, field: &str) {
        if expected == actual {
            return;
        }
        self.push(field, format!("expected {expected:#x}, but actually is {actual:#x}."), actual.swap_bytes() == expected);
    }

    fn check_eq64(&mut self, expected: u64, actual: u64, field: &str) {
        if expected == actual {
            return;
        }
        self.push(field, format!("expected {expected:#x}, but actually is {actual:#x}."), actual.swap_bytes() == expected);
    }

    fn check_lt16(&mut self, smaller: u16, bigger: u16, field: &str) {
        if smaller < bigger {
            return;
        }
        self.push(field, format!("expected {smaller:#x} < {bigger:#x}."), smaller.swap_bytes() < bigger);
    }

    fn check_lt32(&mut self, smaller: u32, bigger: u32, field: &str) {
        if smaller < bigger {
            return;
        }
        self.push(field, format!("expected {smaller:#x} < {bigger:#x}."), smaller.swap_bytes() < bigger);
    }

    fn push(&mut self, field: &str, detail: String, endianness_hint: bool) {
        self.report.diagnostics.push(Diagnostic {
            field: field.to_string(),
            detail,
            endianness_hint,
        });
    }
}
