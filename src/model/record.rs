//! VertexRecord: a vertex after ingress, carrying its partition placement.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use super::{Edge, PropertyMap, VertexId};
use crate::{Error, Result};

/// Partition identifier in `[0, num_partitions)`.
pub type PartitionId = u32;

/// Mirror set. Most vertices replicate to a handful of partitions.
pub type Mirrors = SmallVec<[PartitionId; 4]>;

/// Property names the wire format uses for record fields.
pub const RESERVED_KEYS: [&str; 3] = ["id", "owner", "mirrors"];

/// A vertex with its owner partition and mirror partitions.
///
/// Wire format: `{"id": ..., "owner": 2, "mirrors": [0, 1], <properties>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: VertexId,
    pub owner: PartitionId,
    #[serde(default)]
    pub mirrors: Mirrors,
    #[serde(flatten)]
    pub properties: PropertyMap,
}

impl VertexRecord {
    /// Build a record. The owner is removed from `mirrors`, which are
    /// sorted and deduplicated. Properties named like a record field are
    /// dropped since they would collide on the wire.
    pub fn new(
        id: VertexId,
        owner: PartitionId,
        mirrors: impl IntoIterator<Item = PartitionId>,
        mut properties: PropertyMap,
    ) -> Self {
        let mut mirrors: Mirrors = mirrors.into_iter().filter(|&p| p != owner).collect();
        mirrors.sort_unstable();
        mirrors.dedup();
        for key in RESERVED_KEYS {
            if properties.remove(key).is_some() {
                tracing::debug!(vertex = %id, key, "dropping reserved property name");
            }
        }
        Self { id, owner, mirrors, properties }
    }

    /// Every partition that receives a copy: owner first, then mirrors.
    pub fn partitions(&self) -> impl Iterator<Item = PartitionId> + '_ {
        std::iter::once(self.owner).chain(self.mirrors.iter().copied())
    }

    pub fn fan_out(&self) -> usize {
        1 + self.mirrors.len()
    }

    /// Check placement invariants for a layout of `num_partitions`.
    ///
    /// Records read off the wire can violate what `new` guarantees; those
    /// are malformed.
    pub fn validate(&self, num_partitions: u32) -> Result<()> {
        if self.owner >= num_partitions {
            return Err(Error::Parse(format!(
                "vertex {}: owner {} outside [0, {num_partitions})", self.id, self.owner
            )));
        }
        for (i, &m) in self.mirrors.iter().enumerate() {
            if m >= num_partitions {
                return Err(Error::Parse(format!(
                    "vertex {}: mirror {m} outside [0, {num_partitions})", self.id
                )));
            }
            if m == self.owner {
                return Err(Error::Parse(format!(
                    "vertex {}: owner {m} also listed as mirror", self.id
                )));
            }
            if self.mirrors[..i].contains(&m) {
                return Err(Error::Parse(format!(
                    "vertex {}: mirror {m} listed twice", self.id
                )));
            }
        }
        Ok(())
    }

    /// Parse one wire-format line.
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::Parse(format!("vertex record: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Per-partition summary written next to the vertex records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMeta {
    #[serde(rename = "numVertices")]
    pub num_vertices: u64,
    #[serde(rename = "numOwnVertices")]
    pub num_own_vertices: u64,
}

/// Everything one partition ends up holding.
///
/// `edges` is filled by the pipeline from the ingress placement; the
/// distributor itself only deals in vertex records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartitionOutput {
    pub partition: PartitionId,
    pub records: Vec<VertexRecord>,
    pub meta: PartitionMeta,
    pub edges: Vec<Edge>,
}

impl PartitionOutput {
    pub fn new(partition: PartitionId) -> Self {
        Self {
            partition,
            records: Vec::new(),
            meta: PartitionMeta::default(),
            edges: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{props, Value};

    #[test]
    fn test_new_strips_owner_from_mirrors() {
        let r = VertexRecord::new(VertexId::Long(1), 2, [4, 2, 0, 4, 1], PropertyMap::new());
        assert_eq!(r.owner, 2);
        assert_eq!(r.mirrors.as_slice(), &[0, 1, 4]);
        assert_eq!(r.partitions().collect::<Vec<_>>(), vec![2, 0, 1, 4]);
        assert_eq!(r.fan_out(), 4);
    }

    #[test]
    fn test_wire_format_flattens_properties() {
        let r = VertexRecord::new(VertexId::from("ada"), 1, [3], props([("age", 36)]));
        let json: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(json["id"], "ada");
        assert_eq!(json["owner"], 1);
        assert_eq!(json["mirrors"], serde_json::json!([3]));
        assert_eq!(json["age"], 36);

        let back = VertexRecord::from_json(&r.to_json().unwrap()).unwrap();
        assert_eq!(back.properties.get("age"), Some(&Value::Int(36)));
    }

    #[test]
    fn test_properties_survive_read_write() {
        let line = concat!(
            r#"{"id":1,"owner":0,"mirrors":[],"big":9223372036854775807,"day":"2024-03-01","#,
            r#""nested":{"a":[1,2.5,null]},"ts":"2024-03-01T00:00:00+02:00","#,
            r#""when":"2024-03-01T10:30:00Z"}"#,
        );
        let r = VertexRecord::from_json(line).unwrap();
        assert_eq!(r.to_json().unwrap(), line);
        assert_eq!(r.properties.get("ts"), Some(&Value::from("2024-03-01T00:00:00+02:00")));
        assert!(matches!(r.properties.get("when"), Some(Value::DateTime(_))));
    }

    #[test]
    fn test_integer_beyond_i64_is_malformed() {
        let line = r#"{"id":1,"owner":0,"big":18446744073709551615}"#;
        assert!(matches!(VertexRecord::from_json(line), Err(Error::Parse(_))));
    }

    #[test]
    fn test_reserved_property_names_dropped() {
        let r = VertexRecord::new(VertexId::Long(1), 0, [], props([("owner", "bob"), ("x", "y")]));
        assert!(!r.properties.contains_key("owner"));
        assert!(r.properties.contains_key("x"));
    }

    #[test]
    fn test_validate_rejects_bad_placement() {
        let good = VertexRecord::from_json(r#"{"id":1,"owner":0,"mirrors":[1]}"#).unwrap();
        assert!(good.validate(2).is_ok());
        assert!(good.validate(1).is_err());

        let owner_mirrored = VertexRecord::from_json(r#"{"id":1,"owner":0,"mirrors":[0]}"#).unwrap();
        assert!(owner_mirrored.validate(4).is_err());

        let dup = VertexRecord::from_json(r#"{"id":1,"owner":0,"mirrors":[2,2]}"#).unwrap();
        assert!(dup.validate(4).is_err());
    }

    #[test]
    fn test_meta_wire_names() {
        let meta = PartitionMeta { num_vertices: 3, num_own_vertices: 1 };
        assert_eq!(
            serde_json::to_string(&meta).unwrap(),
            r#"{"numVertices":3,"numOwnVertices":1}"#
        );
    }
}
