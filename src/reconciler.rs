//! Merges resolution outcomes into the ordered watch list.
//!
//! The list owner calls [`reconcile`] once per delivered batch. The pass
//! upholds one invariant: no two rows ever carry the same non-empty hash.
//! Rows touched by a batch are pulled to the front of the list, in batch
//! order, ahead of everything the batch did not touch.

use crate::hash_extractor::{HashToken, HashType};
use crate::song_source::{ResolutionResult, SongRecord};

/// Title of a row whose resolution is still in flight.
pub const PENDING_TITLE: &str = "Looking up...";

/// Title of a row no source knows.
pub const UNREGISTERED_TITLE: &str = "Unregistered song";

/// One row of the watch list. An empty hash field means that hash is
/// unknown for the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRecord {
    pub title: String,
    pub md5: String,
    pub sha256: String,
}

impl DisplayRecord {
    /// Placeholder row created the moment a hash token is detected.
    pub fn pending(token: &HashToken) -> Self {
        let mut record = Self {
            title: PENDING_TITLE.to_string(),
            md5: String::new(),
            sha256: String::new(),
        };
        match token.hash_type {
            HashType::Md5 => record.md5 = token.value.clone(),
            HashType::Sha256 => record.sha256 = token.value.clone(),
        }
        record
    }

    fn from_result(result: &ResolutionResult) -> Self {
        match &result.song {
            Some(song) => Self {
                title: song.display_title(),
                md5: song.md5.clone(),
                sha256: song.sha256.clone(),
            },
            None => {
                let mut record = Self {
                    title: UNREGISTERED_TITLE.to_string(),
                    md5: String::new(),
                    sha256: String::new(),
                };
                match result.hash_type {
                    HashType::Md5 => record.md5 = result.hash.clone(),
                    HashType::Sha256 => record.sha256 = result.hash.clone(),
                }
                record
            }
        }
    }

    /// A row matches an absent result through the requested hash, and a
    /// found result through any non-empty hash it shares with the song.
    fn matches(&self, result: &ResolutionResult) -> bool {
        match &result.song {
            Some(song) => {
                (!song.md5.is_empty() && self.md5 == song.md5)
                    || (!song.sha256.is_empty() && self.sha256 == song.sha256)
            }
            None => match result.hash_type {
                HashType::Md5 => self.md5 == result.hash,
                HashType::Sha256 => self.sha256 == result.hash,
            },
        }
    }

    /// Takes over the song's title and hashes. A hash already known on the
    /// row is never replaced by an empty field.
    fn absorb(&mut self, song: &SongRecord) {
        self.title = song.display_title();
        if !song.md5.is_empty() {
            self.md5 = song.md5.clone();
        }
        if !song.sha256.is_empty() {
            self.sha256 = song.sha256.clone();
        }
    }
}

/// Applies one delivered batch to `records`.
pub fn reconcile(records: &mut Vec<DisplayRecord>, batch: &[ResolutionResult]) {
    let mut queued: Vec<DisplayRecord> = Vec::new();

    for result in batch {
        // A row already pulled forward by an earlier result of this pass
        // absorbs further outcomes for the same song in place; surviving
        // duplicates in the main list still go away.
        if let Some(queued_record) = queued.iter_mut().find(|record| record.matches(result)) {
            if let Some(song) = &result.song {
                queued_record.absorb(song);
            }
            records.retain(|record| !record.matches(result));
            continue;
        }

        match records.iter().position(|record| record.matches(result)) {
            Some(index) => match &result.song {
                Some(song) => {
                    let mut record = records.remove(index);
                    record.absorb(song);
                    records.retain(|other| !other.matches(result));
                    queued.push(record);
                }
                None => {
                    if records[index].title == PENDING_TITLE {
                        let mut record = records.remove(index);
                        record.title = UNREGISTERED_TITLE.to_string();
                        records.retain(|other| !other.matches(result));
                        queued.push(record);
                    }
                }
            },
            None => queued.push(DisplayRecord::from_result(result)),
        }
    }

    records.splice(0..0, queued);
}

#[cfg(test)]
mod tests {
    use super::{reconcile, DisplayRecord, PENDING_TITLE, UNREGISTERED_TITLE};
    use crate::hash_extractor::HashType;
    use crate::song_source::{ResolutionResult, SongRecord};

    fn record(title: &str, md5: &str, sha256: &str) -> DisplayRecord {
        DisplayRecord {
            title: title.to_string(),
            md5: md5.to_string(),
            sha256: sha256.to_string(),
        }
    }

    fn found(hash_type: HashType, hash: &str, song: SongRecord) -> ResolutionResult {
        ResolutionResult {
            hash_type,
            hash: hash.to_string(),
            song: Some(song),
        }
    }

    fn absent(hash_type: HashType, hash: &str) -> ResolutionResult {
        ResolutionResult {
            hash_type,
            hash: hash.to_string(),
            song: None,
        }
    }

    fn song(md5: &str, sha256: &str, title: &str) -> SongRecord {
        SongRecord {
            md5: md5.to_string(),
            sha256: sha256.to_string(),
            title: title.to_string(),
            subtitle: String::new(),
        }
    }

    #[test]
    fn test_reconcile_merges_hashes_and_promotes_to_front() {
        let mut records = vec![
            record("Other", "zzz", ""),
            record(PENDING_TITLE, "abc", ""),
        ];

        reconcile(
            &mut records,
            &[found(HashType::Md5, "abc", song("abc", "def", "Air"))],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Air");
        assert_eq!(records[0].md5, "abc");
        assert_eq!(records[0].sha256, "def");
        assert_eq!(records[1].title, "Other");
        assert_eq!(
            records.iter().filter(|record| record.md5 == "abc").count(),
            1
        );
    }

    #[test]
    fn test_reconcile_removes_duplicate_rows_for_the_same_song() {
        // An old resolved row and a newer pending row for the other hash of
        // the same song collapse into one row.
        let mut records = vec![
            record("Air", "abc", ""),
            record(PENDING_TITLE, "", "def"),
        ];

        reconcile(
            &mut records,
            &[found(HashType::Md5, "abc", song("abc", "def", "Air"))],
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].md5, "abc");
        assert_eq!(records[0].sha256, "def");
    }

    #[test]
    fn test_reconcile_marks_pending_row_unregistered() {
        let mut records = vec![record("Other", "zzz", ""), record(PENDING_TITLE, "abc", "")];

        reconcile(&mut records, &[absent(HashType::Md5, "abc")]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, UNREGISTERED_TITLE);
        assert_eq!(records[0].md5, "abc");
    }

    #[test]
    fn test_reconcile_leaves_resolved_row_untouched_on_absent_result() {
        let mut records = vec![record("Other", "zzz", ""), record("Air", "abc", "def")];
        let before = records.clone();

        reconcile(&mut records, &[absent(HashType::Md5, "abc")]);

        assert_eq!(records, before);
    }

    #[test]
    fn test_reconcile_synthesizes_rows_for_unknown_hashes() {
        let mut records = Vec::new();

        reconcile(
            &mut records,
            &[
                found(HashType::Md5, "abc", song("abc", "def", "Air")),
                absent(HashType::Sha256, "eee"),
            ],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Air");
        assert_eq!(records[1].title, UNREGISTERED_TITLE);
        assert_eq!(records[1].sha256, "eee");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut records = vec![record(PENDING_TITLE, "abc", "")];
        let batch = [found(HashType::Md5, "abc", song("abc", "def", "Air"))];

        reconcile(&mut records, &batch);
        let after_first = records.clone();
        reconcile(&mut records, &batch);

        assert_eq!(records, after_first);
    }

    #[test]
    fn test_reconcile_never_clobbers_known_hash_with_empty_field() {
        // An LR2 row carries no SHA-256; merging it into a row that already
        // knows its SHA-256 keeps the known value.
        let mut records = vec![record("Air", "abc", "def")];

        reconcile(
            &mut records,
            &[found(HashType::Md5, "abc", song("abc", "", "Air -LR2-"))],
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Air -LR2-");
        assert_eq!(records[0].sha256, "def");
    }

    #[test]
    fn test_reconcile_one_song_satisfying_two_requests_keeps_one_row() {
        let mut records = vec![
            record(PENDING_TITLE, "abc", ""),
            record(PENDING_TITLE, "", "def"),
        ];
        let shared = song("abc", "def", "Air");

        reconcile(
            &mut records,
            &[
                found(HashType::Md5, "abc", shared.clone()),
                found(HashType::Sha256, "def", shared),
            ],
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].md5, "abc");
        assert_eq!(records[0].sha256, "def");
    }

    #[test]
    fn test_reconcile_prepends_queued_rows_in_batch_order() {
        let mut records = vec![
            record("Untouched", "zzz", ""),
            record(PENDING_TITLE, "m1", ""),
            record(PENDING_TITLE, "m2", ""),
        ];

        reconcile(
            &mut records,
            &[
                found(HashType::Md5, "m2", song("m2", "", "Two")),
                found(HashType::Md5, "m1", song("m1", "", "One")),
            ],
        );

        let titles: Vec<&str> = records.iter().map(|record| record.title.as_str()).collect();
        assert_eq!(titles, vec!["Two", "One", "Untouched"]);
    }
}
