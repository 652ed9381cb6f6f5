//! Dataset readers for the supported formats.
//!
//! Everything is read eagerly into a single [`RecordBatch`], so a loaded
//! [`Dataset`] is already fully materialized.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, StringArray};
use arrow::compute::{cast, concat_batches};
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Int64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use scaleout_core::{DatasetDescriptor, DatasetFormat, ReadOptions};

use crate::dataset::Dataset;
use crate::error::ComputeError;

pub fn load(path: &Path, descriptor: &DatasetDescriptor) -> Result<Dataset, ComputeError> {
    let batch = match descriptor.extension {
        DatasetFormat::Csv => read_csv(path, &descriptor.read_options)?,
        DatasetFormat::Json => read_json(path)?,
        DatasetFormat::Txt => read_text(path)?,
    };
    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "dataset materialized"
    );
    Ok(Dataset::new(batch))
}

fn read_csv(path: &Path, options: &ReadOptions) -> Result<RecordBatch, ComputeError> {
    let header = options.flag("header");
    let infer = options.flag("inferSchema");
    let delimiter = options
        .get("delimiter")
        .or_else(|| options.get("sep"))
        .and_then(|d| d.bytes().next())
        .unwrap_or(b',');

    let mut file = File::open(path)?;
    let format = Format::default()
        .with_header(header)
        .with_delimiter(delimiter);
    let (inferred, _) = format.infer_schema(&mut file, None)?;
    file.rewind()?;

    let schema: SchemaRef = if infer {
        Arc::new(inferred)
    } else {
        let fields: Vec<Field> = inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect();
        Arc::new(Schema::new(fields))
    };

    let reader = arrow::csv::ReaderBuilder::new(Arc::clone(&schema))
        .with_header(header)
        .with_delimiter(delimiter)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;

    if infer {
        narrow_integers(batch)
    } else {
        Ok(batch)
    }
}

/// Declare 64-bit integer columns as 32-bit when every value fits, matching
/// how CSV schema inference types small integers as `int`.
fn narrow_integers(batch: RecordBatch) -> Result<RecordBatch, ComputeError> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let fits_i32 = field.data_type() == &DataType::Int64
            && column
                .as_primitive::<Int64Type>()
                .iter()
                .flatten()
                .all(|v| i32::try_from(v).is_ok());

        if fits_i32 {
            columns.push(cast(column, &DataType::Int32)?);
            fields.push(field.as_ref().clone().with_data_type(DataType::Int32));
        } else {
            columns.push(Arc::clone(column));
            fields.push(field.as_ref().clone());
        }
    }

    let schema = Arc::new(Schema::new(fields));
    if columns.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Newline-delimited JSON.
fn read_json(path: &Path) -> Result<RecordBatch, ComputeError> {
    let mut reader = BufReader::new(File::open(path)?);
    let (schema, _) = arrow::json::reader::infer_json_schema_from_seekable(&mut reader, None)?;
    reader.rewind()?;

    let schema = Arc::new(schema);
    let json = arrow::json::ReaderBuilder::new(Arc::clone(&schema)).build(reader)?;
    let batches = json.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Plain text: one row per line in a single `value` column.
fn read_text(path: &Path) -> Result<RecordBatch, ComputeError> {
    let mut content = String::new();
    File::open(path)?.read_to_string(&mut content)?;

    let values = StringArray::from_iter_values(content.lines());
    let schema = Arc::new(Schema::new(vec![Field::new("value", DataType::Utf8, false)]));
    Ok(RecordBatch::try_new(schema, vec![Arc::new(values) as ArrayRef])?)
}
