//! Apache Parquet storage of output partitions
//!
//! Each partition is written as a single gzip-compressed Parquet file with one
//! flat column per record field, business fields first, then review fields,
//! then derived features.

use crate::{error::PipelineError, records::MatchedRecord};
use arrow::{
    array::{
        ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray,
        UInt32Array,
    },
    datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit},
};
use parquet::{
    arrow::AsyncArrowWriter,
    basic::{Compression, GzipLevel},
    errors::ParquetError,
    file::properties::WriterProperties,
};
use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};
use tokio::fs::{self, File};

/// Schema of the output files
pub fn schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                Field::new("business_id", DataType::Utf8, false),
                Field::new("name", DataType::Utf8, true),
                Field::new("address", DataType::Utf8, true),
                Field::new("city", DataType::Utf8, true),
                Field::new("state", DataType::Utf8, true),
                Field::new("postal_code", DataType::Utf8, true),
                Field::new("latitude", DataType::Float64, true),
                Field::new("longitude", DataType::Float64, true),
                Field::new("avg_stars", DataType::Int64, false),
                Field::new("is_open", DataType::Int64, true),
                Field::new("categories", DataType::Utf8, false),
                Field::new("review_id", DataType::Utf8, false),
                Field::new("user_id", DataType::Utf8, false),
                Field::new("review_stars", DataType::Int64, false),
                Field::new("useful", DataType::Int64, false),
                Field::new("text", DataType::Utf8, false),
                Field::new(
                    "date",
                    DataType::Timestamp(TimeUnit::Microsecond, None),
                    false,
                ),
                Field::new("sentiment", DataType::Utf8, false),
                Field::new("text_cleansed", DataType::Utf8, false),
                Field::new("num_words_matched", DataType::UInt32, false),
                Field::new("text_matched", DataType::Utf8, false),
            ]))
        })
        .clone()
}

/// Write a partition of the dataset to a Parquet file, return its path
///
/// Parent directories are created as needed.
pub async fn write_local(
    partition: &[MatchedRecord],
    path: &Path,
) -> Result<PathBuf, PipelineError> {
    let io_error = |e| PipelineError::io("writing", path, e);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let batch = to_record_batch(partition).map_err(|e| PipelineError::encoding(path, e))?;
    let properties = WriterProperties::builder()
        .set_compression(Compression::GZIP(GzipLevel::default()))
        .build();
    let file = File::create(path).await.map_err(io_error)?;
    let mut writer = AsyncArrowWriter::try_new(file, schema(), Some(properties))
        .map_err(|e| parquet_error(path, e))?;
    writer
        .write(&batch)
        .await
        .map_err(|e| parquet_error(path, e))?;
    writer.close().await.map_err(|e| parquet_error(path, e))?;
    log::info!(
        "Wrote {} records to {}",
        partition.len(),
        path.display()
    );
    Ok(path.to_owned())
}

/// Translate a Parquet writer error
///
/// Failures of the underlying file are I/O errors, anything else comes from
/// the encoder itself.
fn parquet_error(path: &Path, error: ParquetError) -> PipelineError {
    match error {
        ParquetError::External(source) => match source.downcast::<io::Error>() {
            Ok(source) => PipelineError::io("writing", path, *source),
            Err(source) => PipelineError::encoding(path, source),
        },
        other => PipelineError::encoding(path, other),
    }
}

/// Convert a partition into a columnar batch
fn to_record_batch(partition: &[MatchedRecord]) -> arrow::error::Result<RecordBatch> {
    let businesses = || partition.iter().map(|r| &*r.record.business);
    let reviews = || partition.iter().map(|r| &r.record.review);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            businesses().map(|b| &b.business_id[..]),
        )),
        Arc::new(StringArray::from_iter(businesses().map(|b| b.name.as_deref()))),
        Arc::new(StringArray::from_iter(
            businesses().map(|b| b.address.as_deref()),
        )),
        Arc::new(StringArray::from_iter(businesses().map(|b| b.city.as_deref()))),
        Arc::new(StringArray::from_iter(businesses().map(|b| b.state.as_deref()))),
        Arc::new(StringArray::from_iter(
            businesses().map(|b| b.postal_code.as_deref()),
        )),
        Arc::new(Float64Array::from_iter(businesses().map(|b| b.latitude))),
        Arc::new(Float64Array::from_iter(businesses().map(|b| b.longitude))),
        Arc::new(Int64Array::from_iter_values(
            businesses().map(|b| b.avg_stars),
        )),
        Arc::new(Int64Array::from_iter(businesses().map(|b| b.is_open))),
        Arc::new(StringArray::from_iter_values(
            businesses().map(|b| &b.categories[..]),
        )),
        Arc::new(StringArray::from_iter_values(
            reviews().map(|r| &r.review_id[..]),
        )),
        Arc::new(StringArray::from_iter_values(
            reviews().map(|r| &r.user_id[..]),
        )),
        Arc::new(Int64Array::from_iter_values(
            reviews().map(|r| r.review_stars),
        )),
        Arc::new(Int64Array::from_iter_values(reviews().map(|r| r.useful))),
        Arc::new(StringArray::from_iter_values(reviews().map(|r| &r.text[..]))),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            partition
                .iter()
                .map(|r| r.record.date.and_utc().timestamp_micros()),
        )),
        Arc::new(StringArray::from_iter_values(
            partition.iter().map(|r| r.record.sentiment.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            partition.iter().map(|r| &r.record.text_cleansed[..]),
        )),
        Arc::new(UInt32Array::from_iter_values(
            partition.iter().map(|r| r.num_words_matched),
        )),
        Arc::new(StringArray::from_iter_values(
            partition.iter().map(|r| &r.text_matched[..]),
        )),
    ];
    RecordBatch::try_new(schema(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        business,
        records::{AnnotatedRecord, Review, Sentiment},
    };
    use arrow::array::Array;
    use chrono::NaiveDate;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn matched(id: &str, text_matched: &str) -> MatchedRecord {
        let business = business::filter(vec![business::tests::business("b1", Some("Food"), 4.5)])
            .pop()
            .unwrap();
        MatchedRecord {
            record: AnnotatedRecord {
                business,
                review: Review {
                    review_id: id.into(),
                    user_id: "u1".into(),
                    business_id: "b1".into(),
                    review_stars: 5,
                    date: "2021-03-04 05:06:07".into(),
                    text: "Vegan tacos!".into(),
                    useful: 1,
                },
                date: NaiveDate::from_ymd_opt(2021, 3, 4)
                    .unwrap()
                    .and_hms_opt(5, 6, 7)
                    .unwrap(),
                sentiment: Sentiment::Positive,
                text_cleansed: "vegan tacos ".into(),
            },
            num_words_matched: u32::from(!text_matched.is_empty()),
            text_matched: text_matched.into(),
        }
    }

    fn read_back(path: &Path) -> Vec<RecordBatch> {
        let file = std::fs::File::open(path).unwrap();
        ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[tokio::test]
    async fn partitions_are_written_as_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/reviews_0.parquet");
        let written = write_local(&[matched("r1", "vegan"), matched("r2", "")], &path)
            .await
            .unwrap();
        assert_eq!(written, path);

        let batches = read_back(&path);
        let rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>();
        assert_eq!(rows, 2);
        let batch = &batches[0];
        assert_eq!(batch.schema().fields().len(), schema().fields().len());
        let strings = |name: &str| {
            batch
                .column_by_name(name)
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap()
        };
        let review_ids = strings("review_id");
        assert_eq!(review_ids.value(0), "r1");
        assert_eq!(review_ids.value(1), "r2");
        let avg_stars = batch
            .column_by_name("avg_stars")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(avg_stars.value(0), 4);
        assert_eq!(strings("sentiment").value(1), "positive");
        assert_eq!(strings("text_matched").value(0), "vegan");
        assert!(batch.column_by_name("address").unwrap().is_null(0));
    }

    #[test]
    fn only_file_failures_are_worth_retrying() {
        let path = Path::new("out/reviews_0.parquet");
        let disk = parquet_error(
            path,
            ParquetError::External(Box::new(io::Error::other("disk full"))),
        );
        assert!(matches!(disk, PipelineError::Io { .. }));
        assert!(disk.is_retryable());

        let encoder = parquet_error(path, ParquetError::General("bad column".into()));
        assert!(matches!(encoder, PipelineError::Encoding { .. }));
        assert!(!encoder.is_retryable());
    }

    #[tokio::test]
    async fn empty_partitions_are_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews_3.parquet");
        write_local(&[], &path).await.unwrap();
        let rows = read_back(&path)
            .iter()
            .map(RecordBatch::num_rows)
            .sum::<usize>();
        assert_eq!(rows, 0);
    }
}
