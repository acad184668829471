//! Record tokenizers: raw record bytes → vertices and edges.
//!
//! Tokenizing is owned by the data source; the crate only needs the
//! interface plus a couple of formats it can run end to end. Formats are a
//! closed table selected by `TokenizerKind` in configuration.
//!
//! | Kind | Record body |
//! |------|-------------|
//! | `json` | `{"vertices": [...], "edges": [...]}` |
//! | `edge_list` | lines of `src<TAB>dst[<TAB>label]` |

use serde::{Deserialize, Serialize};

use crate::model::{Edge, GraphElement, Vertex, VertexId};
use crate::reader::{Delimiters, RawRecord};
use crate::{Error, Result};

/// Elements produced from one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tokens {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Tokens {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Flatten into elements, vertices first.
    pub fn into_elements(self) -> impl Iterator<Item = GraphElement> {
        self.vertices
            .into_iter()
            .map(GraphElement::Vertex)
            .chain(self.edges.into_iter().map(GraphElement::Edge))
    }
}

/// Raw record body → graph elements.
pub trait Tokenizer {
    fn parse(&self, body: &[u8]) -> Result<Tokens>;

    /// Parse a record as returned by the boundary reader.
    fn parse_record(&self, record: &RawRecord, delimiters: &Delimiters) -> Result<Tokens> {
        self.parse(record.body(delimiters)).map_err(|e| match e {
            Error::Parse(msg) => Error::Parse(format!("record at offset {}: {msg}", record.offset)),
            other => other,
        })
    }
}

// ============================================================================
// Registered tokenizers
// ============================================================================

/// The tokenizer table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    #[default]
    Json,
    EdgeList,
}

impl Tokenizer for TokenizerKind {
    fn parse(&self, body: &[u8]) -> Result<Tokens> {
        match self {
            TokenizerKind::Json => JsonTokenizer.parse(body),
            TokenizerKind::EdgeList => EdgeListTokenizer.parse(body),
        }
    }
}

/// JSON object with optional `vertices` and `edges` arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTokenizer;

impl Tokenizer for JsonTokenizer {
    fn parse(&self, body: &[u8]) -> Result<Tokens> {
        serde_json::from_slice(body).map_err(|e| Error::Parse(format!("json tokens: {e}")))
    }
}

/// Tab-separated edge list. Both endpoints are also emitted as bare
/// vertices so isolated-looking ids still reach ingress.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeListTokenizer;

impl Tokenizer for EdgeListTokenizer {
    fn parse(&self, body: &[u8]) -> Result<Tokens> {
        let text = std::str::from_utf8(body)
            .map_err(|e| Error::Parse(format!("edge list is not UTF-8: {e}")))?;
        let mut tokens = Tokens::default();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(src), Some(dst)) = (fields.next(), fields.next()) else {
                return Err(Error::Parse(format!("line {}: expected src<TAB>dst", lineno + 1)));
            };
            let (src, dst) = (VertexId::parse(src.trim()), VertexId::parse(dst.trim()));
            let mut edge = Edge::new(src.clone(), dst.clone());
            if let Some(label) = fields.next().map(str::trim).filter(|l| !l.is_empty()) {
                edge = edge.with_label(label);
            }
            tokens.vertices.push(Vertex::new(src));
            tokens.vertices.push(Vertex::new(dst));
            tokens.edges.push(edge);
        }
        Ok(tokens)
    }
}
