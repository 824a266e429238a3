use crate::error::RustyGsheetError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub(crate) enum UnifiedReaderError {
    #[error("No data from remote document: '{0}'")]
    RemoteFileNoDataError(String),
}

/// A unified reader over a spreadsheet document stored in a local file or at a remote URL
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Remote URL reader (in-memory buffer)
    Remote(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a document from either a local path or remote URL.
    /// Remote URLs go through DuckDB's read_blob, which takes care of protocols and credentials.
    pub(crate) fn new(location: &str) -> Result<UnifiedReader, RustyGsheetError> {
        if Self::is_remote_url(location) {
            Self::read_blob_with_duckdb(location)
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            let file = File::open(path)?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    /// Checks if a location represents a remote URL
    pub(crate) fn is_remote_url(location: &str) -> bool {
        if let Ok(url) = Url::parse(location) {
            url.scheme() != "file"
        } else {
            false
        }
    }

    /// Reads a remote document (http, https, s3, gs, hf, ...) with DuckDB's read_blob
    fn read_blob_with_duckdb(location: &str) -> Result<UnifiedReader, RustyGsheetError> {
        let connection = duckdb::Connection::open_in_memory()?;
        let result: Result<Vec<u8>, _> = connection.query_row("SELECT content FROM read_blob(?)", [location], |row| row.get(0));
        connection.close().map_err(|(_, e)| e)?;

        let bytes = result?;
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoDataError(location.to_owned()))?;
        }
        Ok(UnifiedReader::Remote(Cursor::new(bytes)))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Remote(reader) => reader.read(buf),
        }
    }
}
