//! In-memory result cache and merge logic
//!
//! `CacheStore` holds a tree of JSON mappings mirroring every cache path
//! seen this run. Intermediate segments are mapping nodes created on first
//! visit; the leaf level maps object ids to full object payloads. The tree
//! only grows: keys are added or overwritten by id, never removed, and it is
//! discarded at process exit.

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::path::CachePath;

/// Payload shapes the merger accepts
///
/// API pages carry a list of objects; previously persisted subtrees carry an
/// id-to-object map. Both normalize to the same leaf insertions.
#[derive(Debug)]
pub enum Payload {
    /// Fresh API page: a list of objects, each expected to carry an `id`
    ObjectList(Vec<Value>),
    /// Persisted subtree: object id mapped to the full object
    ObjectMap(Map<String, Value>),
}

impl Payload {
    /// Classifies a JSON value into one of the two accepted shapes.
    ///
    /// Any other shape is handed back to the caller, which logs it and
    /// merges nothing.
    pub fn classify(value: Value) -> Result<Self, Value> {
        match value {
            Value::Array(items) => Ok(Payload::ObjectList(items)),
            Value::Object(map) => Ok(Payload::ObjectMap(map)),
            other => Err(other),
        }
    }
}

/// Extracts the map key for one object in a list payload.
///
/// String ids are used verbatim; numeric ids are stringified so that a
/// list-shaped merge and a reloaded map-shaped merge of the same objects
/// land on identical keys (JSON object keys are strings after a save/load
/// cycle). Anything else counts as a missing id.
fn object_id(object: &Value) -> Option<String> {
    match object.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// In-memory tree of results keyed by cache path
#[derive(Debug, Default)]
pub struct CacheStore {
    root: Map<String, Value>,
}

impl CacheStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks from the root to the mapping node at `path`, creating empty
    /// mapping nodes for any missing intermediate segment.
    ///
    /// Pure navigation; never touches disk or network.
    pub fn node_at(&mut self, path: &CachePath) -> &mut Map<String, Value> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            let entry = node
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            node = match entry {
                Value::Object(map) => map,
                _ => unreachable!("entry was just made an object"),
            };
        }
        node
    }

    /// Returns the mapping node at `path` without creating it
    pub fn get(&self, path: &CachePath) -> Option<&Map<String, Value>> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.get(segment)?.as_object()?;
        }
        Some(node)
    }

    /// Merges a payload into the node at `path`, returning the number of
    /// objects inserted.
    ///
    /// Insertion overwrites on key collision, so merging the same payload
    /// twice yields the same mapping as merging it once. A list object
    /// without an id is skipped and logged, not fatal to the batch.
    pub fn merge(&mut self, path: &CachePath, payload: Payload) -> usize {
        let node = self.node_at(path);
        match payload {
            Payload::ObjectMap(map) => {
                let count = map.len();
                for (id, object) in map {
                    node.insert(id, object);
                }
                count
            }
            Payload::ObjectList(objects) => {
                let mut count = 0;
                for object in objects {
                    match object_id(&object) {
                        Some(id) => {
                            node.insert(id, object);
                            count += 1;
                        }
                        None => {
                            warn!(cache_path = %path, %object, "skipping object without id");
                        }
                    }
                }
                count
            }
        }
    }

    /// Merges an optional raw JSON value, classifying its shape first.
    ///
    /// An absent value is valid for some queries and merges nothing; a value
    /// that is neither a list nor a map is logged as an error and merges
    /// nothing.
    pub fn merge_value(&mut self, path: &CachePath, value: Option<Value>) -> usize {
        match value {
            None => {
                debug!(cache_path = %path, "no payload to merge");
                0
            }
            Some(value) => match Payload::classify(value) {
                Ok(payload) => self.merge(path, payload),
                Err(other) => {
                    error!(cache_path = %path, payload = %other, "unexpected payload shape");
                    0
                }
            },
        }
    }

    /// Merges the payload collection out of a full API response.
    ///
    /// The collection lives under the key equal to the last segment of
    /// `path`; the response is consumed so the payload can be taken without
    /// cloning.
    pub fn merge_response(&mut self, path: &CachePath, mut response: Value) -> usize {
        let payload = response.get_mut(path.last_segment()).map(Value::take);
        self.merge_value(path, payload)
    }
}
