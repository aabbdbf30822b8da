//! Local copy of the subscribed subtree.
//!
//! The event stream only sends deltas (`put` / `patch` at a relative path)
//! after the initial value, but subscribers expect the full value on every
//! change. [`DataMirror`] applies deltas with the store's semantics: `null`
//! or an empty object deletes, emptied parents disappear, and new keys are
//! appended after existing ones.

use serde_json::{Map, Value};

use crate::transport::FeedError;

#[derive(Debug, Default, Clone)]
pub struct DataMirror {
    root: Option<Value>,
}

impl DataMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the whole subtree, `None` when empty.
    pub fn snapshot(&self) -> Option<Value> {
        self.root.clone()
    }

    /// Replace the value at `path` (relative, `/`-separated).
    pub fn put(&mut self, path: &str, data: Value) {
        let segments = split_path(path);

        if is_deletion(&data) {
            if segments.is_empty() {
                self.root = None;
            } else if let Some(root) = self.root.as_mut() {
                if remove_at(root, &segments) {
                    self.root = None;
                }
            }
            return;
        }

        let root = self.root.get_or_insert(Value::Null);
        set_at(root, &segments, data);
    }

    /// Merge each child of `data` into the value at `path`.
    pub fn patch(&mut self, path: &str, data: Value) -> Result<(), FeedError> {
        let Value::Object(children) = data else {
            return Err(FeedError::Protocol(format!(
                "patch data at {path} must be an object"
            )));
        };

        let base = path.trim_end_matches('/');
        for (key, value) in children {
            self.put(&format!("{base}/{key}"), value);
        }
        Ok(())
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_deletion(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn set_at(node: &mut Value, segments: &[&str], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = data;
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        set_at(child, rest, data);
    }
}

/// Remove the value at `segments`, pruning parents left empty.
///
/// Returns `true` when `node` itself is now empty.
fn remove_at(node: &mut Value, segments: &[&str]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return true;
    };
    let Value::Object(map) = node else {
        return false;
    };

    let child_emptied = match map.get_mut(*head) {
        Some(child) => rest.is_empty() || remove_at(child, rest),
        None => false,
    };
    if child_emptied {
        map.shift_remove(*head);
    }
    map.is_empty()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn root_put_replaces_everything() {
        let mut mirror = DataMirror::new();
        mirror.put("/", json!({"a": 1}));
        mirror.put("/", json!({"b": 2}));
        assert_eq!(mirror.snapshot(), Some(json!({"b": 2})));

        mirror.put("/", Value::Null);
        assert_eq!(mirror.snapshot(), None);
    }

    #[test]
    fn child_put_appends_new_key_last() {
        let mut mirror = DataMirror::new();
        mirror.put("/", json!({"-Na": {"lastUpdated": 1}}));
        mirror.put("/-Nb", json!({"lastUpdated": 2}));

        let snapshot = mirror.snapshot().expect("data");
        let keys: Vec<&String> = snapshot.as_object().expect("object").keys().collect();
        assert_eq!(keys, vec!["-Na", "-Nb"]);
    }

    #[test]
    fn nested_put_creates_intermediate_objects() {
        let mut mirror = DataMirror::new();
        mirror.put("/-Na/heartbeat/filtered", json!(3000));
        assert_eq!(
            mirror.snapshot(),
            Some(json!({"-Na": {"heartbeat": {"filtered": 3000}}}))
        );
    }

    #[test]
    fn null_put_deletes_and_prunes_empty_parents() {
        let mut mirror = DataMirror::new();
        mirror.put("/", json!({"a": {"b": {"c": 1}}, "d": 2}));

        mirror.put("/a/b/c", Value::Null);
        assert_eq!(mirror.snapshot(), Some(json!({"d": 2})));

        mirror.put("/d", json!({}));
        assert_eq!(mirror.snapshot(), None);
    }

    #[test]
    fn deleting_missing_path_is_noop() {
        let mut mirror = DataMirror::new();
        mirror.put("/missing", Value::Null);
        assert_eq!(mirror.snapshot(), None);

        mirror.put("/", json!({"a": 1}));
        mirror.put("/a/deeper", Value::Null);
        assert_eq!(mirror.snapshot(), Some(json!({"a": 1})));
    }

    #[test]
    fn delete_keeps_order_of_remaining_keys() {
        let mut mirror = DataMirror::new();
        mirror.put("/", json!({"k1": 1, "k2": 2, "k3": 3}));
        mirror.put("/k1", Value::Null);

        let snapshot = mirror.snapshot().expect("data");
        let keys: Vec<&String> = snapshot.as_object().expect("object").keys().collect();
        assert_eq!(keys, vec!["k2", "k3"]);
    }

    #[test]
    fn patch_merges_children() {
        let mut mirror = DataMirror::new();
        mirror.put("/", json!({"a": {"x": 1, "y": 2}}));
        mirror
            .patch("/a", json!({"y": 20, "z": 30}))
            .expect("object patch");
        assert_eq!(mirror.snapshot(), Some(json!({"a": {"x": 1, "y": 20, "z": 30}})));

        mirror.patch("/", json!({"a": null})).expect("object patch");
        assert_eq!(mirror.snapshot(), None);
    }

    #[test]
    fn patch_with_non_object_is_rejected() {
        let mut mirror = DataMirror::new();
        assert_matches!(mirror.patch("/", json!(5)), Err(FeedError::Protocol(_)));
    }
}
