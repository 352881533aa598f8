//! Content fingerprints and cache storage paths.
//!
//! A fingerprint is the SHA-256 of a canonical encoding of everything that
//! can change the bytes of an artifact: the plan payload (minus the
//! entitlement flag), the normalized template identifier and any pipeline
//! stage markers (e.g. the watermark algorithm version).
//!
//! Canonical encoding:
//! - objects are emitted with keys in sorted order, whatever the order of the source JSON
//! - strings are trimmed; empty strings, empty arrays and empty objects become `null`
//! - `null` object members are dropped
//! - stage markers are sorted and de-duplicated
//!
//! The artifact kind is not hashed; it is a path segment.

use crate::artifact::ArtifactKind;
use crate::error::{Error, Result};
use crate::plan::PlanPayload;
use crate::theme::normalize_template_id;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Fields of the payload that never influence generated bytes.
const EXCLUDED_FIELDS: &[&str] = &["entitled"];

/// Hex-encoded SHA-256 content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// The 64-character lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a typed payload.
pub fn fingerprint(
    payload: &PlanPayload,
    template_id: &str,
    stage_markers: &[&str],
) -> Result<ContentFingerprint> {
    let value = serde_json::to_value(payload)
        .map_err(|e| Error::Fingerprint(format!("payload is not encodable: {}", e)))?;
    Ok(fingerprint_value(&value, template_id, stage_markers))
}

/// Fingerprint a raw JSON payload.
pub fn fingerprint_value(
    payload: &Value,
    template_id: &str,
    stage_markers: &[&str],
) -> ContentFingerprint {
    let mut payload = canonicalize(payload);
    if let Value::Object(map) = &mut payload {
        for field in EXCLUDED_FIELDS {
            map.remove(*field);
        }
    }

    let mut markers: Vec<&str> = stage_markers.iter().map(|m| m.trim()).collect();
    markers.sort_unstable();
    markers.dedup();

    let mut hasher = Sha256::new();
    hasher.update(b"plan-export/fingerprint/v1\n");
    hasher.update(b"template:");
    hasher.update(normalize_template_id(template_id).as_bytes());
    hasher.update(b"\nmarkers:");
    for marker in &markers {
        hasher.update((marker.len() as u64).to_be_bytes());
        hasher.update(marker.as_bytes());
    }
    hasher.update(b"\npayload:");
    let mut encoded = Vec::new();
    write_canonical(&payload, &mut encoded);
    hasher.update(&encoded);

    ContentFingerprint(hex::encode(hasher.finalize()))
}

/// Normalize a JSON value for hashing.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        },
        Value::Array(items) => {
            if items.is_empty() {
                Value::Null
            } else {
                Value::Array(items.iter().map(canonicalize).collect())
            }
        },
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                let value = canonicalize(value);
                if !value.is_null() {
                    out.insert(key.clone(), value);
                }
            }
            if out.is_empty() {
                Value::Null
            } else {
                Value::Object(out)
            }
        },
        other => other.clone(),
    }
}

/// Write a value as compact JSON with object keys sorted bytewise.
fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(&Value::String((*key).clone()), out);
                out.push(b':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push(b'}');
        },
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        },
        // Scalars have a single serde_json rendering
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

/// Hierarchical cache location: `plan_id/template_id/fingerprint/file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoragePath(String);

impl StoragePath {
    /// Build the path for one artifact kind.
    ///
    /// Segments are sanitized so that they can never introduce extra
    /// separators or parent references.
    pub fn build(
        plan_id: &str,
        template_id: &str,
        hash: &ContentFingerprint,
        kind: ArtifactKind,
    ) -> Self {
        StoragePath(format!(
            "{}/{}/{}/{}",
            sanitize_segment(plan_id),
            sanitize_segment(&normalize_template_id(template_id)),
            hash.as_str(),
            kind.file_name()
        ))
    }

    /// Path as a `/`-separated string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"a":1,"b":{"x":"1","y":[1,2]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b":{"y":[1,2],"x":"1"},"a":1}"#).unwrap();
        assert_eq!(fingerprint_value(&a, "classic", &[]), fingerprint_value(&b, "classic", &[]));
    }

    #[test]
    fn test_empty_and_missing_fields_hash_identically() {
        let a = json!({"plan_id": "p", "narrative": {"records": ""}});
        let b = json!({"plan_id": "p", "narrative": {"records": null}});
        let c = json!({"plan_id": "p"});
        let fa = fingerprint_value(&a, "classic", &[]);
        assert_eq!(fa, fingerprint_value(&b, "classic", &[]));
        assert_eq!(fa, fingerprint_value(&c, "classic", &[]));
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!({"steps": ["a", "b"]});
        let b = json!({"steps": ["b", "a"]});
        assert_ne!(fingerprint_value(&a, "classic", &[]), fingerprint_value(&b, "classic", &[]));
    }

    #[test]
    fn test_entitlement_not_hashed() {
        let a = json!({"plan_id": "p", "entitled": true});
        let b = json!({"plan_id": "p", "entitled": false});
        assert_eq!(fingerprint_value(&a, "classic", &[]), fingerprint_value(&b, "classic", &[]));
    }

    #[test]
    fn test_template_and_markers_change_hash() {
        let v = json!({"plan_id": "p"});
        let base = fingerprint_value(&v, "classic", &[]);
        assert_ne!(base, fingerprint_value(&v, "modern", &[]));
        assert_ne!(base, fingerprint_value(&v, "classic", &["watermark:v1"]));
        assert_eq!(
            fingerprint_value(&v, "classic", &["b", "a"]),
            fingerprint_value(&v, "classic", &["a", "b", "a"])
        );
        assert_eq!(base, fingerprint_value(&v, " Classic ", &[]));
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fp = fingerprint_value(&json!({}), "classic", &[]);
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_storage_path_layout() {
        let fp = fingerprint_value(&json!({}), "classic", &[]);
        let path = StoragePath::build("plan-42", "Modern", &fp, ArtifactKind::FixedLayoutClean);
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, vec!["plan-42", "modern", fp.as_str(), "plan.pdf"]);
    }

    #[test]
    fn test_storage_path_kinds_do_not_collide() {
        let fp = fingerprint_value(&json!({}), "classic", &[]);
        let clean = StoragePath::build("p", "classic", &fp, ArtifactKind::FixedLayoutClean);
        let preview = StoragePath::build("p", "classic", &fp, ArtifactKind::FixedLayoutPreview);
        let word = StoragePath::build("p", "classic", &fp, ArtifactKind::WordDocument);
        assert_ne!(clean, preview);
        assert_ne!(clean, word);
    }

    #[test]
    fn test_storage_path_segments_are_sanitized() {
        let fp = fingerprint_value(&json!({}), "classic", &[]);
        let path = StoragePath::build("../../etc/passwd", "a/b", &fp, ArtifactKind::WordDocument);
        assert_eq!(path.segments().count(), 4);
        assert!(!path.as_str().contains(".."));
    }
}
