//! CSV tables

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Write serializable rows to a CSV file with a header row.
///
/// An empty slice still gets the header, taken from `T::default()`.
pub fn write_csv<T, P>(rows: &[T], path: P) -> Result<()>
where
    T: Serialize + Default,
    P: AsRef<Path>,
{
    if rows.is_empty() {
        std::fs::write(path.as_ref(), header_line::<T>()?)?;
        return Ok(());
    }
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Header row of `T` as csv's serializer would write it
fn header_line<T: Serialize + Default>() -> Result<Vec<u8>> {
    let mut scratch = csv::Writer::from_writer(Vec::new());
    scratch.serialize(T::default())?;
    let bytes = scratch.into_inner().map_err(|e| e.into_error())?;
    let end = bytes.iter().position(|&b| b == b'\n').map_or(bytes.len(), |i| i + 1);
    Ok(bytes[..end].to_vec())
}

/// Read a headed CSV file into typed rows
pub fn read_csv<T, P>(path: P) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Write a table whose columns are only known at run time
pub fn write_records<P: AsRef<Path>>(header: &[String], rows: &[Vec<String>], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
