//! Capability contract shared by the song database backends.

use std::path::Path;

use crate::config::Config;
use crate::hash_extractor::HashType;

/// Errors raised by song database access.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source's root path is not configured.
    #[error("{0} root path is not configured")]
    Configuration(&'static str),
    /// Opening, closing, or querying the backing database failed.
    #[error("database access failed: {0}")]
    Connection(#[from] rusqlite::Error),
    /// The source was queried before being opened.
    #[error("{0} is not open")]
    NotOpen(&'static str),
    /// The source cannot be queried by this hash type.
    #[error("{source_name} cannot look up {hash_type:?} hashes")]
    Unsupported {
        source_name: &'static str,
        hash_type: HashType,
    },
}

/// A single lookup keyed by hash type and value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupRequest {
    pub hash_type: HashType,
    pub hash: String,
}

/// One song row fetched from a source. An empty hash field means the
/// source's schema does not carry that hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
    pub md5: String,
    pub sha256: String,
    pub title: String,
    pub subtitle: String,
}

impl SongRecord {
    /// Title joined with the subtitle when one exists.
    pub fn display_title(&self) -> String {
        if self.subtitle.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.subtitle)
        }
    }
}

/// Outcome of one lookup: the requested hash plus the row, when found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub hash_type: HashType,
    pub hash: String,
    pub song: Option<SongRecord>,
}

impl ResolutionResult {
    /// A confirmed "no source knows this hash" outcome.
    pub fn absent(request: &LookupRequest) -> Self {
        Self {
            hash_type: request.hash_type,
            hash: request.hash.clone(),
            song: None,
        }
    }
}

/// Hash types a source can be queried by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedHashes {
    Md5,
    Sha256,
    Both,
}

impl SupportedHashes {
    pub fn supports(self, hash_type: HashType) -> bool {
        match self {
            SupportedHashes::Md5 => hash_type == HashType::Md5,
            SupportedHashes::Sha256 => hash_type == HashType::Sha256,
            SupportedHashes::Both => true,
        }
    }
}

/// Read-only access to one song database.
pub trait SongSource: Send {
    /// Short source name used in logs and delivery attribution.
    fn name(&self) -> &'static str;

    fn is_open(&self) -> bool;

    /// Opens the backing database read-only. No-op when already open.
    fn open(&mut self, config: &Config) -> Result<(), SourceError>;

    /// Closes the connection. The source reads as closed afterwards even
    /// when the underlying close reports a failure.
    fn close(&mut self) -> Result<(), SourceError>;

    fn find_by_md5(&self, hash: &str) -> Result<ResolutionResult, SourceError>;

    fn find_by_sha256(&self, hash: &str) -> Result<ResolutionResult, SourceError>;

    /// Batch lookup: one result per request, in request order, grouped into
    /// one query per hash type. A row satisfying several requests is
    /// attributed to each of them.
    fn find_all(&self, requests: &[LookupRequest]) -> Result<Vec<ResolutionResult>, SourceError>;

    fn supported_hashes(&self) -> SupportedHashes;

    fn supports(&self, hash_type: HashType) -> bool {
        self.supported_hashes().supports(hash_type)
    }

    /// Dispatches a single request to the matching typed lookup.
    fn find(&self, request: &LookupRequest) -> Result<ResolutionResult, SourceError> {
        match request.hash_type {
            HashType::Md5 => self.find_by_md5(&request.hash),
            HashType::Sha256 => self.find_by_sha256(&request.hash),
        }
    }

    /// Whether the expected database file exists below `base_dir`.
    fn is_valid_path(&self, base_dir: &Path) -> bool;
}

/// Maps every request onto the first fetched row carrying its hash.
/// Requests nothing matched get an absent result.
pub(crate) fn attribute_batch(
    requests: &[LookupRequest],
    rows: &[SongRecord],
) -> Vec<ResolutionResult> {
    requests
        .iter()
        .map(|request| {
            let song = rows.iter().find(|song| {
                let field = match request.hash_type {
                    HashType::Md5 => &song.md5,
                    HashType::Sha256 => &song.sha256,
                };
                !field.is_empty() && *field == request.hash
            });
            ResolutionResult {
                hash_type: request.hash_type,
                hash: request.hash.clone(),
                song: song.cloned(),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory source shared by poller and controller tests.

    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use super::{
        attribute_batch, LookupRequest, ResolutionResult, SongRecord, SongSource, SourceError,
        SupportedHashes,
    };
    use crate::config::Config;
    use crate::hash_extractor::HashType;

    /// Observable side effects of a scripted source.
    #[derive(Debug, Default)]
    pub struct SourceProbe {
        pub opens: usize,
        pub closes: usize,
        pub finds: usize,
        pub is_open: bool,
    }

    pub struct ScriptedSource {
        pub name: &'static str,
        pub supported: SupportedHashes,
        pub rows: Vec<SongRecord>,
        pub fail_open: bool,
        pub probe: Arc<Mutex<SourceProbe>>,
    }

    impl ScriptedSource {
        pub fn new(name: &'static str, supported: SupportedHashes) -> Self {
            Self {
                name,
                supported,
                rows: Vec::new(),
                fail_open: false,
                probe: Arc::new(Mutex::new(SourceProbe::default())),
            }
        }

        pub fn with_rows(mut self, rows: Vec<SongRecord>) -> Self {
            self.rows = rows;
            self
        }

        pub fn failing_open(mut self) -> Self {
            self.fail_open = true;
            self
        }

        pub fn probe(&self) -> Arc<Mutex<SourceProbe>> {
            Arc::clone(&self.probe)
        }
    }

    impl SongSource for ScriptedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_open(&self) -> bool {
            self.probe.lock().unwrap().is_open
        }

        fn open(&mut self, _config: &Config) -> Result<(), SourceError> {
            if self.fail_open {
                return Err(SourceError::Configuration(self.name));
            }
            let mut probe = self.probe.lock().unwrap();
            if !probe.is_open {
                probe.opens += 1;
                probe.is_open = true;
            }
            Ok(())
        }

        fn close(&mut self) -> Result<(), SourceError> {
            let mut probe = self.probe.lock().unwrap();
            probe.closes += 1;
            probe.is_open = false;
            Ok(())
        }

        fn find_by_md5(&self, hash: &str) -> Result<ResolutionResult, SourceError> {
            self.probe.lock().unwrap().finds += 1;
            let request = LookupRequest {
                hash_type: HashType::Md5,
                hash: hash.to_string(),
            };
            Ok(attribute_batch(&[request], &self.rows).remove(0))
        }

        fn find_by_sha256(&self, hash: &str) -> Result<ResolutionResult, SourceError> {
            self.probe.lock().unwrap().finds += 1;
            let request = LookupRequest {
                hash_type: HashType::Sha256,
                hash: hash.to_string(),
            };
            Ok(attribute_batch(&[request], &self.rows).remove(0))
        }

        fn find_all(
            &self,
            requests: &[LookupRequest],
        ) -> Result<Vec<ResolutionResult>, SourceError> {
            self.probe.lock().unwrap().finds += 1;
            Ok(attribute_batch(requests, &self.rows))
        }

        fn supported_hashes(&self) -> SupportedHashes {
            self.supported
        }

        fn is_valid_path(&self, _base_dir: &Path) -> bool {
            true
        }
    }

    pub fn song(md5: &str, sha256: &str, title: &str, subtitle: &str) -> SongRecord {
        SongRecord {
            md5: md5.to_string(),
            sha256: sha256.to_string(),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
        }
    }
}
