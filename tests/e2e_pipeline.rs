//! Full pipeline runs: bytes in, partition directories out.

use std::fs;

use graph_ingress::distributor::writer::{EDGES_FILE, META_FILE, RECORDS_FILE};
use graph_ingress::metrics::Counter;
use graph_ingress::{
    IngressConfig, IngressMetrics, IngressPipeline, KeyFunction, PartitionMeta, TokenizerKind,
    VertexRecord,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const DUMP: &str = r#"<mediawiki>
<page>{"vertices":[{"id":1,"label":"Person","properties":{"name":"ada"}}],
 "edges":[{"source":1,"dest":2},{"source":2,"dest":1},{"source":1,"dest":1}]}</page>
<page>{"vertices":[{"id":2,"properties":{"name":"bob"}},{"id":3}],
 "edges":[{"source":2,"dest":3,"properties":{"since":2020}}]}</page>
</mediawiki>"#;

fn config(num_partitions: u32) -> IngressConfig {
    let mut config = IngressConfig::default();
    config.partitioning.num_partitions = num_partitions;
    config
}

#[test]
fn test_run_to_dir_layout() {
    let dir = tempdir().unwrap();
    let metrics = IngressMetrics::new();
    let pipeline = IngressPipeline::new(config(2), &metrics).unwrap();
    let outputs = pipeline.run_to_dir(DUMP.as_bytes(), 3, dir.path()).unwrap();
    assert_eq!(outputs.len(), 2);

    let mut owned = 0;
    let mut edges = 0;
    for output in &outputs {
        let pdir = dir.path().join(format!("partition_{}", output.partition));
        let meta: PartitionMeta =
            serde_json::from_slice(&fs::read(pdir.join(META_FILE)).unwrap()).unwrap();
        assert_eq!(meta, output.meta);

        let records: Vec<VertexRecord> = fs::read_to_string(pdir.join(RECORDS_FILE))
            .unwrap()
            .lines()
            .map(|l| VertexRecord::from_json(l).unwrap())
            .collect();
        assert_eq!(records.len() as u64, meta.num_vertices);
        owned += meta.num_own_vertices;
        edges += fs::read_to_string(pdir.join(EDGES_FILE)).unwrap().lines().count();
    }
    assert_eq!(owned, 3);
    // 1->2, 2->1 and 2->3; the self-loop is gone.
    assert_eq!(edges, 3);
    assert_eq!(metrics.get(Counter::RecordsRead), 2);
    assert_eq!(metrics.get(Counter::SelfLoopsDropped), 1);
}

#[test]
fn test_no_bidirectional_with_pair_key() {
    let metrics = IngressMetrics::new();
    let mut config = config(4);
    config.dedup.no_bidirectional = true;
    config.dedup.key_function = KeyFunction::UnorderedPair;
    let pipeline = IngressPipeline::new(config, &metrics).unwrap();
    let outputs = pipeline.run(DUMP.as_bytes(), 1).unwrap();
    let edges: usize = outputs.iter().map(|o| o.edges.len()).sum();
    assert_eq!(edges, 2);
    assert_eq!(metrics.get(Counter::BidirectionalDropped), 1);
}

#[test]
fn test_same_input_same_output() {
    let m1 = IngressMetrics::new();
    let m2 = IngressMetrics::new();
    let a = IngressPipeline::new(config(3), &m1).unwrap().run(DUMP.as_bytes(), 2).unwrap();
    let b = IngressPipeline::new(config(3), &m2).unwrap().run(DUMP.as_bytes(), 5).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_edge_list_records() {
    let metrics = IngressMetrics::new();
    let mut config = config(1);
    config.tokenizer.kind = TokenizerKind::EdgeList;
    config.reader.start_delimiter = "BEGIN".into();
    config.reader.end_delimiter = "END".into();
    let input = "BEGIN\na\tb\tknows\nb\tc\nEND junk BEGIN\n# comment\na\tb\nEND";
    let outputs = IngressPipeline::new(config, &metrics).unwrap().run(input.as_bytes(), 2).unwrap();
    assert_eq!(outputs[0].meta, PartitionMeta { num_vertices: 3, num_own_vertices: 3 });
    assert_eq!(outputs[0].edges.len(), 2);
    assert_eq!(metrics.get(Counter::EdgesMerged), 1);
}
