//! Song lookups against an LR2 `song.db`.

use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};

use crate::config::Config;
use crate::hash_extractor::HashType;
use crate::song_source::{
    attribute_batch, LookupRequest, ResolutionResult, SongRecord, SongSource, SourceError,
    SupportedHashes,
};

pub const SOURCE_NAME: &str = "LR2";

const DB_RELATIVE_PATH: &str = "LR2files/Database/song.db";

/// Accessor for LR2's song database. The schema keys songs by MD5 only;
/// every SHA-256 entry point reports the hash type as unsupported.
#[derive(Default)]
pub struct Lr2Source {
    connection: Option<Connection>,
}

impl Lr2Source {
    pub fn new() -> Self {
        Self { connection: None }
    }

    fn connection(&self) -> Result<&Connection, SourceError> {
        self.connection
            .as_ref()
            .ok_or(SourceError::NotOpen(SOURCE_NAME))
    }
}

fn row_to_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<SongRecord> {
    Ok(SongRecord {
        md5: row.get(0).unwrap_or_default(),
        sha256: String::new(),
        title: row.get(1).unwrap_or_default(),
        subtitle: row.get(2).unwrap_or_default(),
    })
}

impl SongSource for Lr2Source {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn open(&mut self, config: &Config) -> Result<(), SourceError> {
        if config.lr2.root_path.is_empty() {
            return Err(SourceError::Configuration(SOURCE_NAME));
        }
        if self.connection.is_some() {
            return Ok(());
        }
        let db_path = Path::new(&config.lr2.root_path).join(DB_RELATIVE_PATH);
        let connection = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        self.connection = Some(connection);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        match self.connection.take() {
            Some(connection) => connection
                .close()
                .map_err(|(_, error)| SourceError::Connection(error)),
            None => Ok(()),
        }
    }

    fn find_by_md5(&self, hash: &str) -> Result<ResolutionResult, SourceError> {
        let connection = self.connection()?;
        let mut statement =
            connection.prepare("SELECT hash, title, subtitle FROM song WHERE hash = ?1 LIMIT 1")?;
        let song = statement
            .query_row(params![hash], row_to_song)
            .optional()?;
        Ok(ResolutionResult {
            hash_type: HashType::Md5,
            hash: hash.to_string(),
            song,
        })
    }

    fn find_by_sha256(&self, _hash: &str) -> Result<ResolutionResult, SourceError> {
        Err(SourceError::Unsupported {
            source_name: SOURCE_NAME,
            hash_type: HashType::Sha256,
        })
    }

    fn find_all(&self, requests: &[LookupRequest]) -> Result<Vec<ResolutionResult>, SourceError> {
        if let Some(request) = requests
            .iter()
            .find(|request| request.hash_type != HashType::Md5)
        {
            return Err(SourceError::Unsupported {
                source_name: SOURCE_NAME,
                hash_type: request.hash_type,
            });
        }
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let connection = self.connection()?;

        let hashes: Vec<&str> = requests.iter().map(|request| request.hash.as_str()).collect();
        let query = format!(
            "SELECT DISTINCT hash, title, subtitle FROM song WHERE hash IN ({})",
            placeholders(hashes.len())
        );
        let mut statement = connection.prepare(&query)?;
        let rows = statement.query_map(params_from_iter(hashes.iter()), row_to_song)?;
        let mut found = Vec::new();
        for row in rows {
            found.push(row?);
        }
        Ok(attribute_batch(requests, &found))
    }

    fn supported_hashes(&self) -> SupportedHashes {
        SupportedHashes::Md5
    }

    fn is_valid_path(&self, base_dir: &Path) -> bool {
        if base_dir.as_os_str().is_empty() {
            return false;
        }
        base_dir.join(DB_RELATIVE_PATH).is_file()
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
