//! Multi-document decoding.

use serde::Deserialize;
use serde_json::Value;

use crate::manifest::types::{ManifestError, ManifestResult};

/// Split `text` into structured documents.
///
/// YAML streams separated by `---` and plain JSON are both accepted.
/// Empty documents are skipped but still count towards the document index,
/// so indexes match what a reader of the file sees.
pub fn decode_documents(text: &str, source_name: &str) -> ManifestResult<Vec<(usize, Value)>> {
    let mut documents = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document).map_err(|e| ManifestError::Parse {
            source_name: source_name.to_string(),
            document: index,
            message: e.to_string(),
        })?;
        if !value.is_null() {
            documents.push((index, value));
        }
    }

    Ok(documents)
}
