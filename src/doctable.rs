//! A bidirectional document-id / document-name mapping.

use crate::hashtable::{fnv_hash_64, HashTable};

/// A dense integer identifier for a document. Ids are handed out starting
/// at 1; 0 never names a document.
pub type DocId = u64;

const INITIAL_BUCKETS: usize = 1024;

/// Maps document names to ids and back.
///
/// Internally this is two hash tables kept as exact mutual inverses: one
/// keyed by the docid, one keyed by the FNV hash of the name. A name maps
/// to the same docid for the life of the table.
pub struct DocTable {
    id_to_name: HashTable<String>,
    name_to_id: HashTable<DocId>,
    max_id: DocId,
}

impl DocTable {
    /// Create an empty table.
    pub fn new() -> DocTable {
        DocTable {
            id_to_name: HashTable::new(INITIAL_BUCKETS),
            name_to_id: HashTable::new(INITIAL_BUCKETS),
            max_id: 0,
        }
    }

    /// The number of registered documents.
    pub fn num_docs(&self) -> usize {
        self.id_to_name.num_elements()
    }

    /// Register `name`, returning its docid.
    ///
    /// Registration is idempotent: if the name is already present, the
    /// existing docid is returned and nothing changes.
    pub fn register_document_name(&mut self, name: &str) -> DocId {
        let name_key = fnv_hash_64(name.as_bytes());
        if let Some(&docid) = self.name_to_id.lookup(name_key) {
            return docid;
        }

        self.max_id += 1;
        let docid = self.max_id;
        let replaced = self.id_to_name.insert(docid, name.to_string());
        debug_assert!(replaced.is_none(), "docid {docid} allocated twice");
        self.name_to_id.insert(name_key, docid);
        docid
    }

    /// Look up the docid for `name`, if it has been registered.
    pub fn lookup_document_name(&self, name: &str) -> Option<DocId> {
        self.name_to_id
            .lookup(fnv_hash_64(name.as_bytes()))
            .copied()
    }

    /// Look up the name registered under `docid`.
    pub fn lookup_doc_id(&self, docid: DocId) -> Option<&str> {
        self.id_to_name.lookup(docid).map(String::as_str)
    }

    /// The docid→name table, which is what gets serialized as the
    /// doctable region of an index file.
    pub(crate) fn id_table(&self) -> &HashTable<String> {
        &self.id_to_name
    }
}

impl Default for DocTable {
    fn default() -> Self {
        DocTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_are_dense() {
        let mut dt = DocTable::new();
        assert_eq!(dt.register_document_name("a.txt"), 1);
        assert_eq!(dt.register_document_name("b.txt"), 2);
        assert_eq!(dt.register_document_name("c.txt"), 3);
        assert_eq!(dt.num_docs(), 3);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut dt = DocTable::new();
        let first = dt.register_document_name("tree/doc.txt");
        let again = dt.register_document_name("tree/doc.txt");
        assert_eq!(first, again);
        assert_eq!(dt.num_docs(), 1);
    }

    #[test]
    fn lookups_are_mutual_inverses() {
        let mut dt = DocTable::new();
        let docid = dt.register_document_name("essays/on_search.txt");
        assert_eq!(dt.lookup_document_name("essays/on_search.txt"), Some(docid));
        assert_eq!(dt.lookup_doc_id(docid), Some("essays/on_search.txt"));
    }

    #[test]
    fn absent_entries_are_not_found() {
        let dt = DocTable::new();
        assert!(dt.lookup_document_name("nope.txt").is_none());
        assert!(dt.lookup_doc_id(1).is_none());
    }
}
