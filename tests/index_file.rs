//! End-to-end tests over real index files: build in memory, write to
//! disk, read back lazily, query across files, and fsck the result.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fingerpost::error::FingerpostErrorKind;
use fingerpost::fsck::check_index_file;
use fingerpost::read::{FileIndexReader, HashTableReader};
use fingerpost::write::write_index;
use fingerpost::{DocTable, MemIndex, QueryProcessor};

fn write_sample_index(dir: &Path, name: &str) -> PathBuf {
    // "foo" appears twice in doc A and once in doc B; "bar" once in A.
    let mut doctable = DocTable::new();
    let a = doctable.register_document_name("docs/a.txt");
    let b = doctable.register_document_name("docs/b.txt");

    let mut index = MemIndex::new();
    index.add_posting_list("foo", a, vec![0, 12]);
    index.add_posting_list("foo", b, vec![4]);
    index.add_posting_list("bar", a, vec![8]);

    let path = dir.join(name);
    write_index(&index, &doctable, &path).unwrap();
    path
}

#[test]
fn written_file_length_matches_return_value_and_header() {
    let dir = tempfile::tempdir().unwrap();
    let mut doctable = DocTable::new();
    doctable.register_document_name("a.txt");
    let mut index = MemIndex::new();
    index.add_posting_list("word", 1, vec![3]);

    let path = dir.path().join("t.fgp");
    let written = write_index(&index, &doctable, &path).unwrap();
    assert_eq!(written, fs::metadata(&path).unwrap().len());

    let reader = FileIndexReader::open(&path).unwrap();
    let header = reader.header();
    assert_eq!(
        written,
        16 + u64::from(header.doctable_bytes) + u64::from(header.index_bytes)
    );
}

#[test]
fn doctable_roundtrip_resolves_ids_and_reports_absence() {
    let dir = tempfile::tempdir().unwrap();
    let mut doctable = DocTable::new();
    assert_eq!(doctable.register_document_name("a.txt"), 1);
    assert_eq!(doctable.register_document_name("b.txt"), 2);
    let index = MemIndex::new();

    let path = dir.path().join("doc.fgp");
    write_index(&index, &doctable, &path).unwrap();

    let reader = FileIndexReader::open(&path).unwrap();
    let mut doctable_reader = reader.doctable_reader().unwrap();
    assert_eq!(doctable_reader.lookup_doc_id(1).unwrap().as_deref(), Some("a.txt"));
    assert_eq!(doctable_reader.lookup_doc_id(2).unwrap().as_deref(), Some("b.txt"));
    assert_eq!(doctable_reader.lookup_doc_id(3).unwrap(), None);
}

#[test]
fn index_table_resolves_words_and_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_index(dir.path(), "sample.fgp");

    let reader = FileIndexReader::open(&path).unwrap();
    let mut index_table = reader.index_table_reader().unwrap();

    let mut foo = index_table.lookup_word("foo").unwrap().unwrap();
    let mut list = foo.doc_id_list().unwrap();
    list.sort_by_key(|e| e.docid);
    assert_eq!(list.len(), 2);
    assert_eq!((list[0].docid, list[0].num_positions), (1, 2));
    assert_eq!((list[1].docid, list[1].num_positions), (2, 1));

    // Exact position lists come back in stored (increasing) order.
    assert_eq!(foo.lookup_doc_id(1).unwrap(), Some(vec![0, 12]));
    assert_eq!(foo.lookup_doc_id(2).unwrap(), Some(vec![4]));
    assert_eq!(foo.lookup_doc_id(3).unwrap(), None);

    assert!(index_table.lookup_word("quux").unwrap().is_none());
}

#[test]
fn query_intersection_across_two_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_sample_index(dir.path(), "one.fgp");

    // A second index file without "foo" or "bar" at all.
    let mut doctable = DocTable::new();
    let c = doctable.register_document_name("docs/c.txt");
    let mut index = MemIndex::new();
    index.add_posting_list("unrelated", c, vec![0]);
    let second = dir.path().join("two.fgp");
    write_index(&index, &doctable, &second).unwrap();

    let mut qp = QueryProcessor::open(&[first, second]).unwrap();

    // Only doc A contains both words; its rank is 2 + 1.
    let results = qp.process_query(&["foo", "bar"]).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_name, "docs/a.txt");
    assert_eq!(results[0].rank, 3);

    // Single word: both docs, ascending by rank.
    let results = qp.process_query(&["foo"]).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document_name, "docs/b.txt");
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[1].document_name, "docs/a.txt");
    assert_eq!(results[1].rank, 2);

    // A word in no file at all is an empty result, not an error.
    assert!(qp.process_query(&["zebra"]).unwrap().is_empty());
    assert!(qp.process_query(&["foo", "zebra"]).unwrap().is_empty());
}

#[test]
fn crawl_write_query_end_to_end() {
    let tree = tempfile::tempdir().unwrap();
    fs::write(tree.path().join("fruit.txt"), "Apple banana apple.").unwrap();
    fs::write(tree.path().join("veg.txt"), "Carrot, banana?").unwrap();

    let out = tempfile::tempdir().unwrap();
    let index_path = out.path().join("tree.fgp");
    let written = fingerpost::build_index_file(tree.path(), &index_path).unwrap();
    assert!(written > 0);

    let mut qp = QueryProcessor::open(&[&index_path]).unwrap();
    let results = qp.process_query(&["banana"]).unwrap();
    assert_eq!(results.len(), 2);

    let results = qp.process_query(&["apple", "banana"]).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].document_name.ends_with("fruit.txt"));
    assert_eq!(results[0].rank, 3);
}

#[test]
fn open_rejects_wrong_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bogus.fgp");
    fs::write(&path, b"this is not an index file at all...").unwrap();

    let err = FileIndexReader::open(&path).unwrap_err();
    assert!(matches!(
        err.into_inner(),
        FingerpostErrorKind::BadMagicNumber
    ));
}

#[test]
fn duplicated_reader_has_an_independent_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_index(dir.path(), "dup.fgp");

    let reader = FileIndexReader::open(&path).unwrap();
    let offset = reader.header().doctable_offset();
    let mut first = HashTableReader::open(&path, offset).unwrap();
    let mut second = first.duplicate().unwrap();
    assert_eq!(second.num_buckets(), first.num_buckets());

    // Interleaved lookups on the two handles see the same table and do
    // not disturb each other's file cursor.
    let a = first.lookup_element_positions(1).unwrap();
    let b = second.lookup_element_positions(2).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(first.lookup_element_positions(1).unwrap(), a);
    assert_eq!(second.lookup_element_positions(2).unwrap(), b);
}

#[test]
fn fsck_passes_a_pristine_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_index(dir.path(), "clean.fgp");
    let report = check_index_file(&path).unwrap();
    assert!(report.is_clean(), "unexpected findings: {:?}", report.diagnostics);
}

#[test]
fn fsck_flags_exactly_one_checksum_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_index(dir.path(), "flipped.fgp");

    // Flip one bit inside the stored checksum field (bytes 4..8). The
    // body is untouched, so everything else still checks out.
    let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(5)).unwrap();
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte).unwrap();
    byte[0] ^= 0x40;
    file.seek(SeekFrom::Start(5)).unwrap();
    file.write_all(&byte).unwrap();
    drop(file);

    let report = check_index_file(&path).unwrap();
    assert_eq!(report.diagnostics.len(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.diagnostics[0].field, "checksum");
}

#[test]
fn fsck_reports_corrupt_magic_without_stopping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_index(dir.path(), "magic.fgp");

    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&[0x00, 0x00, 0x00, 0x00]).unwrap();
    drop(file);

    let report = check_index_file(&path).unwrap();
    // Magic is wrong but the rest of the file is intact; the pass keeps
    // going and finds nothing else.
    assert_eq!(report.diagnostics.len(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.diagnostics[0].field, "magic number");
}

#[test]
fn fsck_hints_at_byte_order_for_a_byteswapped_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_index(dir.path(), "swapped.fgp");

    // The right magic number written little-endian.
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.write_all(&[0x0D, 0xF0, 0xFE, 0xCA]).unwrap();
    drop(file);

    let report = check_index_file(&path).unwrap();
    assert_eq!(report.diagnostics.len(), 1, "{:?}", report.diagnostics);
    assert_eq!(report.diagnostics[0].field, "magic number");
    assert!(report.diagnostics[0].endianness_hint);
}

#[test]
fn fsck_confines_a_truncated_embedded_table_to_one_finding() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_index(dir.path(), "short.fgp");

    // Cut into the last embedded docid table's position list.
    let len = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 2).unwrap();
    drop(file);

    let report = check_index_file(&path).unwrap();
    assert_eq!(
        report
            .diagnostics
            .iter()
            .filter(|d| d.field.contains("embedded docid table"))
            .count(),
        1,
        "{:?}",
        report.diagnostics
    );
    // The sub-walk ended, not the pass: the shortened body also fails
    // the region-length and checksum checks, and both still surface.
    assert!(report.diagnostics.iter().any(|d| d.field == "checksum"));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.field == "doctable_bytes + index_bytes"));
}
