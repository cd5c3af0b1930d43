use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const FILE_KEYS: &[&str] = &["imagefile", "file", "image"];
pub const POSITION_KEYS: &[&str] = &["location", "pos", "loc"];
pub const ROTATION_KEYS: &[&str] = &["rotation", "rot", "quaternion"];
pub const FOV_KEYS: &[&str] = &["fovy", "fov", "fieldofview"];
pub const MATRIX_KEYS: &[&str] = &["M3x4"];

/// First value present among `aliases`, checked in order
pub fn lookup<'a>(entry: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|key| entry.get(*key))
}

/// Entries of the top-level `images` list
pub fn image_entries(document: &Value) -> Result<Vec<&Map<String, Value>>> {
    let images = document
        .get("images")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::format("pose file has no \"images\" list"))?;

    images
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .as_object()
                .ok_or_else(|| Error::format(format!("images[{i}] is not an object")))
        })
        .collect()
}

pub fn require_file(entry: &Map<String, Value>, index: usize) -> Result<String> {
    lookup(entry, FILE_KEYS)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::format(format!("images[{index}] has no image file name")))
}

/// Fixed-length list of numbers
pub fn number_array<const N: usize>(value: &Value, what: &str, index: usize) -> Result<[f32; N]> {
    let items = value
        .as_array()
        .filter(|items| items.len() == N)
        .ok_or_else(|| Error::format(format!("images[{index}].{what} must be a list of {} numbers", N)))?;

    let mut out = [0.0f32; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item
            .as_f64()
            .ok_or_else(|| Error::format(format!("images[{index}].{what} contains a non-number")))?
            as f32;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_prefers_first_alias() {
        let value = json!({"file": "b.png", "imagefile": "a.png"});
        let entry = value.as_object().unwrap();
        assert_eq!(lookup(entry, FILE_KEYS), Some(&json!("a.png")));
    }

    #[test]
    fn test_lookup_falls_through_aliases() {
        let value = json!({"loc": [1, 2, 3]});
        let entry = value.as_object().unwrap();
        assert_eq!(lookup(entry, POSITION_KEYS), Some(&json!([1, 2, 3])));
        assert_eq!(lookup(entry, ROTATION_KEYS), None);
    }

    #[test]
    fn test_number_array_length_checked() {
        assert_eq!(number_array::<3>(&json!([1, 2.5, -3]), "pos", 0).unwrap(), [1.0, 2.5, -3.0]);
        assert!(number_array::<3>(&json!([1, 2]), "pos", 0).is_err());
        assert!(number_array::<3>(&json!([1, "2", 3]), "pos", 0).is_err());
    }

    #[test]
    fn test_missing_images_list() {
        assert!(matches!(image_entries(&json!({})), Err(Error::Format(_))));
        assert!(matches!(image_entries(&json!({"images": [1]})), Err(Error::Format(_))));
    }
}
