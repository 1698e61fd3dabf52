//! Reading of line-delimited JSON data files, optionally gzipped

use crate::error::PipelineError;
use async_compression::tokio::bufread::GzipDecoder;
use serde::de::DeserializeOwned;
use std::{
    io,
    marker::PhantomData,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
};
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines},
};

/// Reader of JSON records, one per line
///
/// Blank lines are skipped. Any other line that does not decode into a `T` is
/// reported as a [`PipelineError::Schema`] error.
pub struct JsonLines<T> {
    /// Path of the data file, for error reporting
    path: PathBuf,

    /// Lines of (decompressed) text from the data file
    lines: Lines<Pin<Box<dyn AsyncBufRead + Send>>>,

    /// Number of lines read so far
    line_number: usize,

    /// Type of records in the file
    record: PhantomData<fn() -> T>,
}
//
impl<T: DeserializeOwned> JsonLines<T> {
    /// Open a data file
    ///
    /// Files whose name ends with `.gz` are transparently decompressed.
    pub async fn open(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)
            .await
            .map_err(|e| PipelineError::io("opening", path, e))?;
        let bytes = BufReader::new(file);
        let text: Pin<Box<dyn AsyncBufRead + Send>> =
            if path.extension().is_some_and(|ext| ext == "gz") {
                log::debug!("Decompressing {} on the fly", path.display());
                Box::pin(BufReader::new(GzipDecoder::new(bytes)))
            } else {
                Box::pin(bytes)
            };
        Ok(Self {
            path: path.to_owned(),
            lines: text.lines(),
            line_number: 0,
            record: PhantomData,
        })
    }

    /// Read the next record, if any
    pub async fn next_record(&mut self) -> Result<Option<T>, PipelineError> {
        loop {
            let line = self.lines.next_line().await.map_err(|e| {
                // Undecodable bytes are bad data, not a failed read
                if e.kind() == io::ErrorKind::InvalidData {
                    PipelineError::schema(
                        format!("{}:{}", self.path.display(), self.line_number + 1),
                        e,
                    )
                } else {
                    PipelineError::io("reading", &self.path, e)
                }
            })?;
            let Some(line) = line else {
                return Ok(None);
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&line).map(Some).map_err(|e| {
                PipelineError::schema(
                    format!("{}:{}", self.path.display(), self.line_number),
                    e,
                )
            });
        }
    }

    /// Read up to `max_records` records
    ///
    /// Returns an empty chunk once the end of the file has been reached.
    pub async fn next_chunk(
        &mut self,
        max_records: NonZeroUsize,
    ) -> Result<Vec<T>, PipelineError> {
        let mut chunk = Vec::new();
        while chunk.len() < max_records.get() {
            let Some(record) = self.next_record().await? else {
                break;
            };
            chunk.push(record);
        }
        Ok(chunk)
    }

    /// Read all remaining records
    pub async fn read_all(mut self) -> Result<Vec<T>, PipelineError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn data_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn reads_records_in_chunks() {
        let file = data_file("{\"id\": 1}\n{\"id\": 2}\n\n{\"id\": 3}\n");
        let mut reader = JsonLines::<Item>::open(file.path()).await.unwrap();
        let two = NonZeroUsize::new(2).unwrap();
        assert_eq!(
            reader.next_chunk(two).await.unwrap(),
            [Item { id: 1 }, Item { id: 2 }]
        );
        assert_eq!(reader.next_chunk(two).await.unwrap(), [Item { id: 3 }]);
        assert!(reader.next_chunk(two).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_are_schema_errors() {
        let file = data_file("{\"id\": 1}\n{\"id\": \"one\"}\n");
        let reader = JsonLines::<Item>::open(file.path()).await.unwrap();
        match reader.read_all().await {
            Err(PipelineError::Schema { location, .. }) => assert!(location.ends_with(":2")),
            other => panic!("expected a schema error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gzipped_files_are_decompressed() {
        use async_compression::tokio::write::GzipEncoder;
        use tokio::io::AsyncWriteExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json.gz");
        let mut encoder = GzipEncoder::new(File::create(&path).await.unwrap());
        encoder.write_all(b"{\"id\": 4}\n{\"id\": 5}\n").await.unwrap();
        encoder.shutdown().await.unwrap();

        let items = JsonLines::<Item>::open(&path)
            .await
            .unwrap()
            .read_all()
            .await
            .unwrap();
        assert_eq!(items, [Item { id: 4 }, Item { id: 5 }]);
    }

    #[tokio::test]
    async fn undecodable_lines_are_schema_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"id\": 1}\n{\"id\": \xff}\n").unwrap();
        let mut reader = JsonLines::<Item>::open(file.path()).await.unwrap();
        assert_eq!(reader.next_record().await.unwrap(), Some(Item { id: 1 }));
        let error = reader.next_record().await.unwrap_err();
        assert!(!error.is_retryable());
        assert!(matches!(
            &error,
            PipelineError::Schema { location, .. } if location.ends_with(":2")
        ));
    }

    #[tokio::test]
    async fn missing_files_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonLines::<Item>::open(&dir.path().join("nope.json")).await;
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }
}
