use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Reads an engine export, picking the decoder from the file extension:
/// `.bin` is bincode, `.msgpack` is MessagePack, anything else is JSON.
pub fn load_export<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open export file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let value = match extension {
        "bin" => bincode::deserialize_from(reader)
            .with_context(|| format!("Failed to decode bincode from {}", path.display()))?,
        "msgpack" => rmp_serde::from_read(reader)
            .with_context(|| format!("Failed to decode MessagePack from {}", path.display()))?,
        _ => serde_json::from_reader(reader)
            .with_context(|| format!("Failed to decode JSON from {}", path.display()))?,
    };
    Ok(value)
}
