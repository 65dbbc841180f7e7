// src/sink/output.rs
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::OutputError;

/// Serialize with 4-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, OutputError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Overwrite `path` with `value` as indented JSON. Goes through a sibling
/// temp file and a rename, so readers never observe a half-written file.
pub async fn save_to_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), OutputError> {
    let bytes = to_pretty_json(value)?;
    let tmp = path.with_extension("json.tmp");
    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
    Ok(())
}
