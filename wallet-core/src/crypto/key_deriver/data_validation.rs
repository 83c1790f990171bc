// wallet-core/src/crypto/key_deriver/data_validation.rs
//
// Arbitrary-data signing guard.
//
// A key that signs transactions must never sign bytes that could be replayed
// as a protocol message. Data is rejected when it (raw or decoded) starts
// with one of the node's hash-domain prefixes, and must otherwise match the
// JSON schema supplied by the request type.

use crate::error::{WalletError, WalletResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hash-domain prefixes used by the Algorand node (protocol/hash.go)
pub const ALGORAND_DOMAIN_PREFIXES: &[&str] = &[
    "appID", "arc", "aB", "aD", "aO", "aP", "aS", "AS", "B256", "BH", "BR", "CR", "GE", "KP",
    "MA", "MB", "MX", "NIC", "NIR", "NIV", "NPR", "OT1", "OT2", "PF", "PL", "Program",
    "ProgData", "PS", "PK", "SD", "SpecialAddr", "STIB", "spc", "spm", "spp", "sps", "spv", "TE",
    "TG", "TL", "TX", "VO",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Data is base64 text of a JSON document
    Base64,
    /// Data is the JSON document itself
    None,
}

/// How `sign_data` must interpret and validate its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignMetadata {
    pub encoding: Encoding,
    pub schema: Value,
}

impl SignMetadata {
    pub fn base64(schema: Value) -> Self {
        Self {
            encoding: Encoding::Base64,
            schema,
        }
    }
}

pub fn has_algorand_tags(data: &[u8]) -> bool {
    ALGORAND_DOMAIN_PREFIXES
        .iter()
        .any(|prefix| data.starts_with(prefix.as_bytes()))
}

/// Decode `data` per `metadata.encoding` and check it against the schema
pub fn validate_data(data: &[u8], metadata: &SignMetadata) -> WalletResult<()> {
    if has_algorand_tags(data) {
        return Err(WalletError::signing(
            "data carries a reserved protocol prefix",
        ));
    }

    let decoded = match metadata.encoding {
        Encoding::Base64 => STANDARD
            .decode(data)
            .map_err(|e| WalletError::signing(format!("invalid base64 payload: {}", e)))?,
        Encoding::None => data.to_vec(),
    };

    if has_algorand_tags(&decoded) {
        return Err(WalletError::signing(
            "decoded data carries a reserved protocol prefix",
        ));
    }

    let document: Value = serde_json::from_slice(&decoded)
        .map_err(|e| WalletError::signing(format!("payload is not JSON: {}", e)))?;

    validate_schema(&document, &metadata.schema, "$")
        .map_err(|reason| WalletError::signing(format!("schema mismatch: {}", reason)))
}

// =============================================================================
// SCHEMA SUBSET
// =============================================================================
// Supported keywords: type, required, properties, items, enum, const.
// Unknown keywords are ignored, as JSON Schema does.

fn validate_schema(value: &Value, schema: &Value, path: &str) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        // `true` / `{}` style schemas accept anything
        return match schema {
            Value::Bool(false) => Err(format!("{} is not allowed", path)),
            _ => Ok(()),
        };
    };

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(t) => vec![t.as_str()],
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|t| matches_type(value, t)) {
            return Err(format!("{} expected type {}", path, allowed.join("|")));
        }
    }

    if let Some(constant) = schema.get("const") {
        if constant != value {
            return Err(format!("{} does not match const", path));
        }
    }

    if let Some(Value::Array(options)) = schema.get("enum") {
        if !options.contains(value) {
            return Err(format!("{} is not one of the allowed values", path));
        }
    }

    if let Value::Object(fields) = value {
        if let Some(Value::Array(required)) = schema.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !fields.contains_key(name) {
                    return Err(format!("{} is missing required field '{}'", path, name));
                }
            }
        }
        if let Some(Value::Object(properties)) = schema.get("properties") {
            for (name, sub_schema) in properties {
                if let Some(field) = fields.get(name) {
                    validate_schema(field, sub_schema, &format!("{}.{}", path, name))?;
                }
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (i, item) in items.iter().enumerate() {
            validate_schema(item, item_schema, &format!("{}[{}]", path, i))?;
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        _ => false,
    }
}
