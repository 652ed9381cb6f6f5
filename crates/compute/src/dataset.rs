//! In-memory dataset handle and the column-wise primitives the task
//! engines are built from.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use arrow::util::display::array_value_to_string;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ComputeError;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Declared type name of a column, in the engine's vocabulary
/// (`int`, `long`, `double`, `string`, `array<string>`, ...).
pub fn type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::UInt8 | DataType::UInt16 => {
            "int".into()
        }
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => "long".into(),
        DataType::Float16 | DataType::Float32 => "float".into(),
        DataType::Float64 => "double".into(),
        DataType::Boolean => "boolean".into(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "string".into(),
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => "binary".into(),
        DataType::Date32 | DataType::Date64 => "date".into(),
        DataType::Timestamp(_, _) => "timestamp".into(),
        DataType::Decimal128(p, s) | DataType::Decimal256(p, s) => format!("decimal({p},{s})"),
        DataType::List(f) | DataType::LargeList(f) | DataType::FixedSizeList(f, _) => {
            format!("array<{}>", type_name(f.data_type()))
        }
        DataType::Struct(_) => "struct".into(),
        DataType::Null => "void".into(),
        other => other.to_string().to_lowercase(),
    }
}

fn is_integer(data_type: &DataType) -> bool {
    data_type.is_integer()
}

/// Min, max and mean of one numeric column. `None` when the column has no
/// usable values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub min: Option<serde_json::Value>,
    pub max: Option<serde_json::Value>,
    pub mean: Option<f64>,
}

/// A fully materialized dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_count(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    pub fn column(&self, name: &str) -> Result<&ArrayRef, ComputeError> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| ComputeError::UnknownColumn(name.to_string()))
    }

    /// Column name → declared type name, in schema order.
    pub fn declared_types(&self) -> IndexMap<String, String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| (f.name().clone(), type_name(f.data_type())))
            .collect()
    }

    /// Columns whose declared type name is in `types`, in schema order.
    pub fn columns_of_types(&self, types: &[&str]) -> Vec<String> {
        self.declared_types()
            .into_iter()
            .filter(|(_, t)| types.contains(&t.as_str()))
            .map(|(name, _)| name)
            .collect()
    }

    /// Nulls, plus NaN for floating columns.
    pub fn missing_count(&self, name: &str) -> Result<usize, ComputeError> {
        let column = self.column(name)?;
        let mut missing = column.null_count();
        if column.data_type().is_floating() {
            let values = cast(column, &DataType::Float64)?;
            missing += values
                .as_primitive::<Float64Type>()
                .iter()
                .flatten()
                .filter(|v| v.is_nan())
                .count();
        }
        Ok(missing)
    }

    /// Number of distinct non-null values.
    pub fn distinct_count(&self, name: &str) -> Result<usize, ComputeError> {
        let column = self.column(name)?;
        let converter = RowConverter::new(vec![SortField::new(column.data_type().clone())])?;
        let rows = converter.convert_columns(&[Arc::clone(column)])?;
        let distinct: HashSet<_> = (0..column.len())
            .filter(|&i| column.is_valid(i))
            .map(|i| rows.row(i))
            .collect();
        Ok(distinct.len())
    }

    /// Min, max and mean of a numeric column, ignoring nulls and NaN.
    /// Integer columns report integral min/max.
    pub fn summarize(&self, name: &str) -> Result<ColumnSummary, ComputeError> {
        let column = self.column(name)?;

        let floats = cast(column, &DataType::Float64)?;
        let (sum, count) = floats
            .as_primitive::<Float64Type>()
            .iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        let mean = (count > 0).then(|| sum / count as f64);

        if is_integer(column.data_type()) {
            let ints = cast(column, &DataType::Int64)?;
            let ints = ints.as_primitive::<Int64Type>();
            return Ok(ColumnSummary {
                min: arrow::compute::min(ints).map(Into::into),
                max: arrow::compute::max(ints).map(Into::into),
                mean,
            });
        }

        let (min, max) = floats
            .as_primitive::<Float64Type>()
            .iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .fold((None::<f64>, None::<f64>), |(lo, hi), v| {
                (
                    Some(lo.map_or(v, |m| m.min(v))),
                    Some(hi.map_or(v, |m| m.max(v))),
                )
            });

        Ok(ColumnSummary {
            min: min.map(Into::into),
            max: max.map(Into::into),
            mean,
        })
    }

    /// Assemble `columns` into one feature vector per row. Rows with a null or
    /// NaN in any of the columns are dropped.
    pub fn feature_rows(&self, columns: &[String]) -> Result<Vec<Vec<f64>>, ComputeError> {
        let arrays = columns
            .iter()
            .map(|c| Ok(cast(self.column(c)?, &DataType::Float64)?))
            .collect::<Result<Vec<ArrayRef>, ComputeError>>()?;
        let arrays: Vec<_> = arrays.iter().map(|a| a.as_primitive::<Float64Type>()).collect();

        let rows = (0..self.row_count())
            .filter_map(|row| {
                arrays
                    .iter()
                    .map(|a| {
                        if a.is_valid(row) && !a.value(row).is_nan() {
                            Some(a.value(row))
                        } else {
                            None
                        }
                    })
                    .collect::<Option<Vec<f64>>>()
            })
            .collect();
        Ok(rows)
    }

    /// Non-null entries of a list-typed column as string items. Returns
    /// `None` when the column is not list-typed.
    pub fn transactions(&self, name: &str) -> Result<Option<Vec<Vec<String>>>, ComputeError> {
        let column = self.column(name)?;
        let lists: Vec<ArrayRef> = match column.data_type() {
            DataType::List(_) => {
                let list = column.as_list::<i32>();
                (0..list.len())
                    .filter(|&i| list.is_valid(i))
                    .map(|i| list.value(i))
                    .collect()
            }
            DataType::LargeList(_) => {
                let list = column.as_list::<i64>();
                (0..list.len())
                    .filter(|&i| list.is_valid(i))
                    .map(|i| list.value(i))
                    .collect()
            }
            _ => return Ok(None),
        };

        let mut transactions = Vec::with_capacity(lists.len());
        for values in &lists {
            let items = (0..values.len())
                .filter(|&j| values.is_valid(j))
                .map(|j| array_value_to_string(&**values, j))
                .collect::<Result<Vec<String>, _>>()?;
            transactions.push(items);
        }
        Ok(Some(transactions))
    }

    /// Calendar date of every row of a date, timestamp or string column.
    /// Values that cannot be read as a date become `None`.
    pub fn dates(&self, name: &str) -> Result<Vec<Option<NaiveDate>>, ComputeError> {
        let column = self.column(name)?;
        match column.data_type() {
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
                let days = cast(column, &DataType::Date32)?;
                let days = days.as_primitive::<Date32Type>();
                Ok((0..days.len())
                    .map(|i| if days.is_valid(i) { days.value_as_date(i) } else { None })
                    .collect())
            }
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
                let text = cast(column, &DataType::Utf8)?;
                Ok(text
                    .as_string::<i32>()
                    .iter()
                    .map(|v| v.and_then(parse_date_prefix))
                    .collect())
            }
            other => Err(ComputeError::failed(
                "timeseries",
                format!("column '{name}' of type {} cannot be read as a date", type_name(other)),
            )),
        }
    }
}

/// Parse the leading `YYYY-MM-DD` of a date or datetime string.
fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}
