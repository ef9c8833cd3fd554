// Copyright 2025 Cloudbin (https://github.com/cloudbin)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Backup checksum
//!
//! SHA-256 over the canonical JSON form of `data` - objects serialized
//! with recursively sorted keys - truncated to the first 16 hex
//! characters. Stable under key reordering, changed by any value change.
//!
//! 16 hex chars is a weak integrity marker (birthday bound around 2^32),
//! but the backup file format is pinned at `version: "1.0"` and widening
//! the digest would be a compatibility break.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Length of the truncated hex digest in the backup metadata
pub const CHECKSUM_HEX_LEN: usize = 16;

/// Serialize with recursively sorted object keys, compact separators
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                // serde_json handles string escaping
                out.push_str(&serde_json::to_string(key).expect("string serializes"));
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        leaf => out.push_str(&serde_json::to_string(leaf).expect("leaf serializes")),
    }
}

/// Checksum of a backup's `data` member
pub fn data_checksum(data: &Value) -> String {
    let canonical = canonical_json(data);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..CHECKSUM_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stable_under_key_reorder() {
        let a = json!({"pastes": [{"id": "p1", "title": "a"}, {"title": "b", "id": "p2"}]});
        let b = json!({"pastes": [{"title": "a", "id": "p1"}, {"id": "p2", "title": "b"}]});
        assert_eq!(data_checksum(&a), data_checksum(&b));
    }

    #[test]
    fn test_changes_with_value_change() {
        let a = json!({"pastes": [{"id": "p1"}]});
        let b = json!({"pastes": [{"id": "p2"}]});
        assert_ne!(data_checksum(&a), data_checksum(&b));
    }

    #[test]
    fn test_length_and_charset() {
        let checksum = data_checksum(&json!({}));
        assert_eq!(checksum.len(), CHECKSUM_HEX_LEN);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_canonical_nested_sorting() {
        let value = json!({"b": {"z": 1, "a": [{"y": 2, "x": 3}]}, "a": null});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":null,"b":{"a":[{"x":3,"y":2}],"z":1}}"#
        );
    }

    #[test]
    fn test_array_order_matters() {
        // Row order inside a table changes the digest; multiset equality is
        // guaranteed by the engine reading tables in a stable order
        let a = json!({"t": [1, 2]});
        let b = json!({"t": [2, 1]});
        assert_ne!(data_checksum(&a), data_checksum(&b));
    }
}
