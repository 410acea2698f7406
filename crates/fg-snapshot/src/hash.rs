use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Canonicalize by sorting object keys recursively and emitting compact JSON.
pub fn canonical_json<T: Serialize>(v: &T) -> Result<String, serde_json::Error> {
    let raw = serde_json::to_value(v)?;
    serde_json::to_string(&sort_keys(&raw))
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
