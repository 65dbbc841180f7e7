// src/sink/summary.rs
use serde_json::{json, Value};

/// Shape produced by the bundled `osint_processor`:
/// `{"source_count": <len of input array, 0 otherwise>, "processed_data": <input>}`.
pub fn summarize(input: Value) -> Value {
    let source_count = input.as_array().map(Vec::len).unwrap_or(0);
    json!({
        "source_count": source_count,
        "processed_data": input,
    })
}
