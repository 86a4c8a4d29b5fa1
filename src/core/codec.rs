//! Record encoding
//!
//! A [`Codec`] turns serde values into the bytes stored on disk and back.
//! Lenient decoding ignores fields the target type doesn't know about;
//! strict decoding rejects them with [`StoreError::UnknownFields`].

use crate::error::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encoder/decoder for stored records
pub trait Codec: Send + Sync {
    /// File extension appended to keys, including the leading dot
    fn extension(&self) -> &'static str;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8], strict: bool) -> Result<T>;
}

/// YAML records (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn extension(&self) -> &'static str {
        ".yaml"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| StoreError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8], strict: bool) -> Result<T> {
        let de = serde_yaml::Deserializer::from_slice(bytes);
        if strict {
            deserialize_strict(de, |e: serde_yaml::Error| e.to_string())
        } else {
            T::deserialize(de).map_err(|e| StoreError::Decode(e.to_string()))
        }
    }
}

/// Pretty-printed JSON records
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn extension(&self) -> &'static str {
        ".json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(value).map_err(|e| StoreError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8], strict: bool) -> Result<T> {
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let value = if strict {
            deserialize_strict(&mut de, |e: serde_json::Error| e.to_string())?
        } else {
            T::deserialize(&mut de).map_err(|e| StoreError::Decode(e.to_string()))?
        };
        de.end().map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(value)
    }
}

fn deserialize_strict<'de, D, T, F>(de: D, describe: F) -> Result<T>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
    F: FnOnce(D::Error) -> String,
{
    let mut unknown = Vec::new();
    let value = serde_ignored::deserialize(de, |path| unknown.push(path.to_string()))
        .map_err(|e| StoreError::Decode(describe(e)))?;
    if unknown.is_empty() {
        Ok(value)
    } else {
        Err(StoreError::UnknownFields(unknown))
    }
}
