//! Document ordering (C8, `SPEC_FULL.md` §4.8). The only module that encodes
//! the kind hierarchy numerically; C5 and C6 both sort through here so the
//! rank table has exactly one home.

use crate::document::Document;

/// Stable sort by `(kindRank, originalIndex)`. `reverse` inverts kind rank
/// (used by delete/purge: Container→Cell→Stack→Space→Realm) while always
/// preserving intra-kind input order — reversing is about which kind goes
/// first, never about reordering documents of the same kind.
pub fn sort_documents(mut documents: Vec<Document>, reverse: bool) -> Vec<Document> {
    let mut indexed: Vec<(usize, Document)> = documents.drain(..).enumerate().collect();
    indexed.sort_by_key(|(index, doc)| {
        let rank = doc.kind().rank();
        let rank = if reverse { u8::MAX - rank } else { rank };
        (rank, *index)
    });
    indexed.into_iter().map(|(_, doc)| doc).collect()
}
