//! # Property Graph Model
//!
//! Clean DTOs that cross every stage boundary:
//! reader → tokenizer → dedup → ingress → distributor.
//!
//! Design rule: this module is pure data (no I/O, no state).

pub mod value;
pub mod property_map;
pub mod vertex;
pub mod edge;
pub mod element;
pub mod record;

pub use value::Value;
pub use property_map::{PropertyMap, merge_properties, props};
pub use vertex::{Vertex, VertexId};
pub use edge::{Edge, EdgeId};
pub use element::GraphElement;
pub use record::{
    Mirrors, PartitionId, PartitionMeta, PartitionOutput, VertexRecord, RESERVED_KEYS,
};
