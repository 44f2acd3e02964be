mod common;

use common::{build, build_arena, node_mapping, set_items, shapes, shared_graph, tree};
use proptest::prelude::*;
use srl_pack::*;

const COMPRESSIONS: [CompressType; 3] = [CompressType::None, CompressType::Fast, CompressType::General];

fn config(version: u8, compression: CompressType) -> EncoderConfig {
    EncoderConfig::builder()
        .protocol_version(version)
        .compression(compression)
        .compression_threshold(0)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn acyclic_graphs_roundtrip(
        tree in tree(),
        references in any::<bool>(),
        aliases in any::<bool>(),
    ) {
        let graph = build(&tree);
        for version in 0..=LATEST_VERSION {
            for compression in COMPRESSIONS {
                let config = config(version, compression)
                    .to_builder()
                    .track_references(references)
                    .track_aliases(aliases)
                    .build()
                    .unwrap();
                let enc = encode(&graph, &config).unwrap();
                let dec = decode(&enc).unwrap();
                prop_assert_eq!(&dec, &graph, "version {} compression {:?}", version, compression);
            }
        }
    }

    #[test]
    fn shared_and_cyclic_graphs_keep_identity(arena in shapes()) {
        let graph = build_arena(&arena);
        for version in 0..=LATEST_VERSION {
            let config = config(version, CompressType::None)
                .to_builder()
                .track_references(true)
                .track_aliases(true)
                .build()
                .unwrap();
            let enc = encode(&graph, &config).unwrap();
            let dec = decode(&enc).unwrap();
            prop_assert_eq!(&dec, &graph, "version {}", version);
            prop_assert!(
                node_mapping(&graph, &dec).is_some(),
                "version {}: sharing differs after decoding",
                version
            );
        }
    }

    #[test]
    fn header_matches_config(tree in tree(), version in 0..=LATEST_VERSION) {
        let graph = build(&tree);
        let config = config(version, CompressType::General);
        let encoder = Encoder::new(config);
        let body = encoder.encode_body(&graph).unwrap();
        let enc = encoder.encode(&graph).unwrap();
        let (header, payload) = Header::split(&enc).unwrap();
        prop_assert_eq!(header.version, version);
        match header.compression {
            CompressType::None => {
                prop_assert_eq!(payload, &body[..]);
                prop_assert_eq!(header.uncompressed_len, None);
            }
            _ => {
                prop_assert!(payload.len() < body.len());
                prop_assert_eq!(header.uncompressed_len, Some(body.len()));
            }
        }
    }
}

#[test]
fn integer_five() {
    let mut graph = ValueGraph::new();
    graph.int(5);
    let enc = encode(&graph, &EncoderConfig::new(3).unwrap()).unwrap();
    assert_eq!(enc, vec![0x3d, 0x03, 0x00, 0x05]);
    assert_eq!(decode(&enc).unwrap(), graph);
}

#[test]
fn config_versions() {
    for version in 0..=3 {
        assert!(EncoderConfig::new(version).is_ok());
    }
    let err = EncoderConfig::new(4).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn config_from_serde() {
    let config = EncoderConfig::builder()
        .protocol_version(2)
        .track_references(true)
        .compression(CompressType::Fast)
        .user_data(Some(vec![1, 2, 3]))
        .build()
        .unwrap();
    let json = serde_json::to_string(&config).unwrap();
    let back: EncoderConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    let bad = json.replace("\"protocol_version\":2", "\"protocol_version\":7");
    assert_ne!(bad, json);
    assert!(serde_json::from_str::<EncoderConfig>(&bad).is_err());

    let bad = json.replace("\"protocol_version\":2", "\"protocol_version\":1");
    assert!(
        serde_json::from_str::<EncoderConfig>(&bad).is_err(),
        "user data needs version 2"
    );

    let json = serde_json::to_string(&DecoderConfig::default()).unwrap();
    let back: DecoderConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, DecoderConfig::default());
    let bad = json.replace("\"max_depth\":512", "\"max_depth\":0");
    assert!(serde_json::from_str::<DecoderConfig>(&bad).is_err());
}

mod references {
    use super::*;

    #[test]
    fn shared_node_encodes_once() {
        let (graph, _) = shared_graph();
        for version in 0..=LATEST_VERSION {
            let plain = encode(&graph, &EncoderConfig::new(version).unwrap()).unwrap();
            let tracked = EncoderConfig::builder()
                .protocol_version(version)
                .track_references(true)
                .build()
                .unwrap();
            let tracked = encode(&graph, &tracked).unwrap();
            assert!(
                tracked.len() < plain.len(),
                "version {}: {} vs {}",
                version,
                tracked.len(),
                plain.len()
            );

            let dec = decode(&tracked).unwrap();
            assert_eq!(dec, graph);
            let items = dec[dec.root().unwrap()].as_array().unwrap();
            assert!(dec.same_node(items[0], items[1]));
            assert!(!dec.same_node(items[0], items[2]));

            // Without tracking the two uses come back as separate, equal nodes
            let dec = decode(&plain).unwrap();
            assert_eq!(dec, graph);
            let items = dec[dec.root().unwrap()].as_array().unwrap();
            assert!(!dec.same_node(items[0], items[1]));
        }
    }

    #[test]
    fn self_cycle() {
        let mut graph = ValueGraph::new();
        let root = graph.array(vec![]);
        set_items(&mut graph, root, vec![root]);

        for version in 0..=LATEST_VERSION {
            let tracked = EncoderConfig::builder()
                .protocol_version(version)
                .track_references(true)
                .build()
                .unwrap();
            let enc = encode(&graph, &tracked).unwrap();
            let dec = decode(&enc).unwrap();
            let root = dec.root().unwrap();
            assert_eq!(dec[root].as_array(), Some(&[root][..]));
            assert_eq!(dec.len(), 1);

            let err = encode(&graph, &EncoderConfig::new(version).unwrap()).unwrap_err();
            assert!(err.is_recursion_limit());
        }
    }

    #[test]
    fn cycle_through_references() {
        // root = { "next": \a }, a = [ \root ]
        let mut graph = ValueGraph::new();
        let root = graph.map(vec![]);
        let key = graph.str("next");
        let a = graph.array(vec![]);
        let ref_a = graph.strong_ref(a);
        let ref_root = graph.strong_ref(root);
        set_items(&mut graph, a, vec![ref_root]);
        if let Some(Value::Map(pairs)) = graph.get_mut(root) {
            pairs.push((key, ref_a));
        }

        let tracked = EncoderConfig::builder().track_references(true).build().unwrap();
        let dec = decode(&encode(&graph, &tracked).unwrap()).unwrap();
        assert_eq!(dec, graph);

        let root = dec.root().unwrap();
        let (_, ref_a) = dec[root].as_map().unwrap()[0];
        let (a, kind) = dec[ref_a].as_ref_target().unwrap();
        assert_eq!(kind, RefKind::Strong);
        let ref_root = dec[a].as_array().unwrap()[0];
        let (target, _) = dec[ref_root].as_ref_target().unwrap();
        assert!(dec.same_node(target, root));
    }

    #[test]
    fn aliases() {
        let mut graph = ValueGraph::new();
        let root = graph.array(vec![]);
        let text = graph.str("a longer piece of shared text");
        let num = graph.int(123456789);
        set_items(&mut graph, root, vec![text, num, text, num]);

        for version in 0..=LATEST_VERSION {
            let aliased = EncoderConfig::builder()
                .protocol_version(version)
                .track_aliases(true)
                .build()
                .unwrap();
            let dec = decode(&encode(&graph, &aliased).unwrap()).unwrap();
            assert_eq!(dec, graph);
            let items = dec[dec.root().unwrap()].as_array().unwrap();
            assert!(dec.same_node(items[0], items[2]));
            assert!(dec.same_node(items[1], items[3]));
        }
    }

    #[test]
    fn weak_references() {
        let mut graph = ValueGraph::new();
        let root = graph.array(vec![]);
        let target = graph.str("target");
        let weak = graph.weak_ref(target);
        set_items(&mut graph, root, vec![target, weak]);

        let config = EncoderConfig::builder()
            .track_references(true)
            .track_aliases(true)
            .build()
            .unwrap();
        let dec = decode(&encode(&graph, &config).unwrap()).unwrap();
        assert_eq!(dec, graph);
        let items = dec[dec.root().unwrap()].as_array().unwrap();
        let (target, kind) = dec[items[1]].as_ref_target().unwrap();
        assert_eq!(kind, RefKind::Weak);
        assert!(dec.same_node(target, items[0]));

        // Without alias tracking, weak references are written as strong ones
        let dec = decode(&encode(&graph, &EncoderConfig::default()).unwrap()).unwrap();
        let items = dec[dec.root().unwrap()].as_array().unwrap();
        assert_eq!(dec[items[1]].as_ref_target().unwrap().1, RefKind::Strong);
    }
}

mod strings_and_objects {
    use super::*;

    fn repeated() -> ValueGraph {
        let mut graph = ValueGraph::new();
        let root = graph.array(vec![]);
        let mut items = Vec::new();
        for i in 0..10 {
            let payload = graph.int(i);
            items.push(graph.object("Some::Class", payload));
            items.push(graph.str("repeated string value"));
        }
        set_items(&mut graph, root, items);
        graph
    }

    #[test]
    fn smaller_in_later_versions() {
        let graph = repeated();
        let sizes: Vec<usize> = (0..=LATEST_VERSION)
            .map(|v| {
                let enc = encode(&graph, &EncoderConfig::new(v).unwrap()).unwrap();
                assert_eq!(decode(&enc).unwrap(), graph);
                enc.len()
            })
            .collect();
        // OBJECTV arrives in version 2 and COPY in version 3
        assert!(sizes[2] < sizes[1], "{:?}", sizes);
        assert!(sizes[3] < sizes[2], "{:?}", sizes);
    }

    #[test]
    fn copies_are_distinct_nodes() {
        let graph = repeated();
        let dec = decode(&encode(&graph, &EncoderConfig::default()).unwrap()).unwrap();
        let items = dec[dec.root().unwrap()].as_array().unwrap();
        assert!(!dec.same_node(items[1], items[3]));
        assert_eq!(dec[items[3]].as_str(), Some("repeated string value"));
    }
}

mod framing {
    use super::*;

    fn big() -> ValueGraph {
        let mut graph = ValueGraph::new();
        let root = graph.array(vec![]);
        let items = (0..2000).map(|i| graph.int(i % 100)).collect();
        set_items(&mut graph, root, items);
        graph
    }

    #[test]
    fn threshold() {
        let graph = big();
        for compression in [CompressType::Fast, CompressType::General] {
            let body_len = Encoder::default().encode_body(&graph).unwrap().len();

            let above = EncoderConfig::builder()
                .compression(compression)
                .compression_threshold(body_len)
                .build()
                .unwrap();
            let enc = encode(&graph, &above).unwrap();
            let (header, _) = Header::split(&enc).unwrap();
            assert_eq!(header.compression, compression);
            assert_eq!(header.uncompressed_len, Some(body_len));
            assert_eq!(decode(&enc).unwrap(), graph);

            let below = above.to_builder().compression_threshold(body_len + 1).build().unwrap();
            let enc = encode(&graph, &below).unwrap();
            let (header, _) = Header::split(&enc).unwrap();
            assert_eq!(header.compression, CompressType::None);
            assert_eq!(header.uncompressed_len, None);
            assert_eq!(enc.len(), 3 + body_len);
        }
    }

    #[test]
    fn user_data() {
        let graph = big();
        for compression in COMPRESSIONS {
            let config = config(2, compression)
                .to_builder()
                .user_data(Some(b"user supplied".to_vec()))
                .build()
                .unwrap();
            let enc = encode(&graph, &config).unwrap();
            let (header, dec) = Decoder::default().decode_with_header(&enc).unwrap();
            assert_eq!(header.user_data.as_deref(), Some(&b"user supplied"[..]));
            assert_eq!(dec, graph);
        }
    }
}
