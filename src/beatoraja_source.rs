//! Song lookups against a beatoraja `songdata.db`.

use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};

use crate::config::Config;
use crate::hash_extractor::HashType;
use crate::song_source::{
    attribute_batch, LookupRequest, ResolutionResult, SongRecord, SongSource, SourceError,
    SupportedHashes,
};

pub const SOURCE_NAME: &str = "beatoraja";

const DB_RELATIVE_PATH: &str = "songdata.db";

/// Accessor for beatoraja's song database. The schema carries both hashes.
/// Rows with an empty chart path are leftovers from removed folders and
/// are never eligible.
#[derive(Default)]
pub struct BeatorajaSource {
    connection: Option<Connection>,
}

impl BeatorajaSource {
    pub fn new() -> Self {
        Self { connection: None }
    }

    fn connection(&self) -> Result<&Connection, SourceError> {
        self.connection
            .as_ref()
            .ok_or(SourceError::NotOpen(SOURCE_NAME))
    }

    fn find_by_column(&self, column: &str, hash: &str) -> Result<Option<SongRecord>, SourceError> {
        let connection = self.connection()?;
        let query = format!(
            "SELECT md5, sha256, title, subtitle FROM song WHERE {} = ?1 AND path <> '' LIMIT 1",
            column
        );
        let mut statement = connection.prepare(&query)?;
        let song = statement
            .query_row(params![hash], row_to_song)
            .optional()?;
        Ok(song)
    }
}

fn row_to_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<SongRecord> {
    Ok(SongRecord {
        md5: row.get(0).unwrap_or_default(),
        sha256: row.get(1).unwrap_or_default(),
        title: row.get(2).unwrap_or_default(),
        subtitle: row.get(3).unwrap_or_default(),
    })
}

impl SongSource for BeatorajaSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn open(&mut self, config: &Config) -> Result<(), SourceError> {
        if config.beatoraja.root_path.is_empty() {
            return Err(SourceError::Configuration(SOURCE_NAME));
        }
        if self.connection.is_some() {
            return Ok(());
        }
        let db_path = Path::new(&config.beatoraja.root_path).join(DB_RELATIVE_PATH);
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
        let song = self.find_by_column("md5", hash)?;
        Ok(ResolutionResult {
            hash_type: HashType::Md5,
            hash: hash.to_string(),
            song,
        })
    }

    fn find_by_sha256(&self, hash: &str) -> Result<ResolutionResult, SourceError> {
        let song = self.find_by_column("sha256", hash)?;
        Ok(ResolutionResult {
            hash_type: HashType::Sha256,
            hash: hash.to_string(),
            song,
        })
    }

    fn find_all(&self, requests: &[LookupRequest]) -> Result<Vec<ResolutionResult>, SourceError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let connection = self.connection()?;

        let md5_hashes: Vec<&str> = requests
            .iter()
            .filter(|request| request.hash_type == HashType::Md5)
            .map(|request| request.hash.as_str())
            .collect();
        let sha256_hashes: Vec<&str> = requests
            .iter()
            .filter(|request| request.hash_type == HashType::Sha256)
            .map(|request| request.hash.as_str())
            .collect();

        let mut clauses = Vec::new();
        if !md5_hashes.is_empty() {
            clauses.push(format!("md5 IN ({})", placeholders(md5_hashes.len())));
        }
        if !sha256_hashes.is_empty() {
            clauses.push(format!("sha256 IN ({})", placeholders(sha256_hashes.len())));
        }
        let query = format!(
            "SELECT DISTINCT md5, sha256, title, subtitle FROM song WHERE path <> '' AND ({})",
            clauses.join(" OR ")
        );

        let mut statement = connection.prepare(&query)?;
        let rows = statement.query_map(
            params_from_iter(md5_hashes.iter().chain(sha256_hashes.iter())),
            row_to_song,
        )?;
        let mut found = Vec::new();
        for row in rows {
            found.push(row?);
        }
        Ok(attribute_batch(requests, &found))
    }

    fn supported_hashes(&self) -> SupportedHashes {
        SupportedHashes::Both
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
