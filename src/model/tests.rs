use super::*;
use crate::config::ConfigError;
use crate::graph::PageGraph;
use candle_core::{Device, Tensor};
use tempfile::TempDir;

fn tiny_config() -> GraphModelConfig {
    GraphModelConfig {
        input_size: 3,
        output_size: 4,
        nb_hidden: 2,
        hidden_width: 8,
        dropout: 0.1,
    }
}

fn rows() -> Vec<Vec<f32>> {
    vec![
        vec![1.0, 0.0, 0.5],
        vec![0.0, 1.0, 0.5],
        vec![0.5, 0.5, 1.0],
        vec![0.2, 0.1, 0.0],
    ]
}

fn page_with_edges(edges: Vec<(u32, u32)>) -> PageGraph {
    let labels = vec![true; edges.len()];
    PageGraph::new("page", 3, rows(), edges, labels).expect("page is well formed")
}

fn max_abs_diff(a: &Tensor, b: &Tensor) -> f32 {
    let a = a.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    let b = b.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(&b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

#[test]
fn test_normalized_adjacency_single_edge() {
    let page = PageGraph::new(
        "p",
        1,
        vec![vec![0.0], vec![1.0]],
        vec![(0, 1)],
        vec![true],
    )
    .unwrap();

    let adjacency = normalized_adjacency(&page);
    let inv_sqrt2 = 1.0 / 2.0f32.sqrt();

    // Row-major [dst][src]: node 1 receives from node 0, node 0 only from itself.
    assert!((adjacency[0] - 1.0).abs() < 1e-6);
    assert_eq!(adjacency[1], 0.0);
    assert!((adjacency[2] - inv_sqrt2).abs() < 1e-6);
    assert!((adjacency[3] - 0.5).abs() < 1e-6);
}

#[test]
fn test_normalized_adjacency_ignores_explicit_self_loops() {
    let with_loop = page_with_edges(vec![(0, 1), (2, 2)]);
    let without_loop = page_with_edges(vec![(0, 1)]);
    assert_eq!(
        normalized_adjacency(&with_loop),
        normalized_adjacency(&without_loop)
    );
}

#[test]
fn test_normalized_adjacency_is_edge_order_invariant() {
    let forward = page_with_edges(vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
    let shuffled = page_with_edges(vec![(2, 3), (0, 1), (3, 0), (1, 2)]);
    assert_eq!(
        normalized_adjacency(&forward),
        normalized_adjacency(&shuffled)
    );
}

#[test]
fn test_normalized_adjacency_is_dense_square() {
    let page = page_with_edges(vec![]);
    let n = page.nb_nodes();

    let adjacency = normalized_adjacency(&page);
    assert_eq!(adjacency.len(), n * n);
    for row in 0..n {
        for col in 0..n {
            let expected = if row == col { 1.0 } else { 0.0 };
            assert_eq!(adjacency[row * n + col], expected);
        }
    }
}

#[test]
fn test_page_tensors_shapes() {
    let page = page_with_edges(vec![(0, 1), (1, 2)]);
    let tensors = PageTensors::new(&page, &Device::Cpu).unwrap();

    assert_eq!(tensors.nb_nodes(), 4);
    assert_eq!(tensors.nb_edges(), 2);
    assert_eq!(tensors.node_features.dims(), &[4, 3]);
    assert_eq!(tensors.adjacency.dims(), &[4, 4]);
    assert_eq!(tensors.edge_src.dims(), &[2]);
    assert_eq!(
        tensors.labels.as_ref().unwrap().to_vec1::<f32>().unwrap(),
        vec![1.0, 1.0]
    );
}

#[test]
fn test_page_tensors_unlabeled_page_has_no_targets() {
    let page = PageGraph::new("p", 3, rows(), vec![(0, 1)], vec![]).unwrap();
    let tensors = PageTensors::new(&page, &Device::Cpu).unwrap();
    assert!(tensors.labels.is_none());
}

#[test]
fn test_embed_output_shape() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![(0, 1), (1, 2)]);
    let tensors = PageTensors::new(&page, &Device::Cpu).unwrap();

    let embeddings = model.embed_page(&tensors, false).unwrap();
    assert_eq!(embeddings.dims(), &[4, 4]);
}

#[test]
fn test_embed_rejects_wrong_feature_width() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = PageGraph::new("p", 2, vec![vec![0.0, 1.0]], vec![], vec![]).unwrap();
    let tensors = PageTensors::new(&page, &Device::Cpu).unwrap();

    let err = model.embed_page(&tensors, false).unwrap_err();
    assert!(matches!(err, ModelError::InvalidConfig { .. }));
}

#[test]
fn test_embed_is_deterministic_without_dropout() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![(0, 1), (1, 2)]);
    let tensors = PageTensors::new(&page, &Device::Cpu).unwrap();

    let first = model.embed_page(&tensors, false).unwrap();
    let second = model.embed_page(&tensors, false).unwrap();
    assert_eq!(max_abs_diff(&first, &second), 0.0);
}

#[test]
fn test_embed_does_not_depend_on_edge_order() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let forward = page_with_edges(vec![(0, 1), (1, 2), (2, 3)]);
    let reversed = page_with_edges(vec![(2, 3), (1, 2), (0, 1)]);

    let a = model
        .embed_page(&PageTensors::new(&forward, &Device::Cpu).unwrap(), false)
        .unwrap();
    let b = model
        .embed_page(&PageTensors::new(&reversed, &Device::Cpu).unwrap(), false)
        .unwrap();
    assert!(max_abs_diff(&a, &b) < 1e-6);
}

#[test]
fn test_edge_score_is_symmetric() {
    let embeddings = Tensor::new(
        &[[0.5f32, -1.0, 2.0], [1.5, 0.25, -0.5], [3.0, 1.0, 0.0]],
        &Device::Cpu,
    )
    .unwrap();
    let src = Tensor::new(&[0u32, 1, 0, 2], &Device::Cpu).unwrap();
    let dst = Tensor::new(&[1u32, 0, 2, 0], &Device::Cpu).unwrap();

    let scores = EdgeAffinityModel::edge_scores(&embeddings, &src, &dst)
        .unwrap()
        .to_vec1::<f32>()
        .unwrap();

    assert_eq!(scores[0], scores[1]);
    assert_eq!(scores[2], scores[3]);
    // 0.5 * 1.5 - 1.0 * 0.25 + 2.0 * -0.5
    assert!((scores[0] - (-0.5)).abs() < 1e-6);
}

#[test]
fn test_edge_scores_on_model_embeddings_are_symmetric() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![(0, 1), (1, 0), (2, 3), (3, 2)]);
    let tensors = PageTensors::new(&page, &Device::Cpu).unwrap();

    let embeddings = model.embed_page(&tensors, false).unwrap();
    let scores = EdgeAffinityModel::edge_scores(&embeddings, &tensors.edge_src, &tensors.edge_dst)
        .unwrap()
        .to_vec1::<f32>()
        .unwrap();

    assert_eq!(scores[0], scores[1]);
    assert_eq!(scores[2], scores[3]);
}

#[test]
fn test_edge_probabilities_are_probabilities() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![(0, 1), (1, 2), (2, 3)]);

    let probabilities = model.edge_probabilities(&page).unwrap();
    assert_eq!(probabilities.len(), 3);
    assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_edge_probabilities_without_edges() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![]);
    assert!(model.edge_probabilities(&page).unwrap().is_empty());
}

#[test]
fn test_infer_page_without_edges_yields_singletons() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![])
        .with_line_ids(["l1", "l2", "l3", "l4"])
        .unwrap();

    let bites = infer_page(&model, &page).unwrap();
    assert_eq!(
        bites,
        vec![
            vec!["l1".to_string()],
            vec!["l2".to_string()],
            vec!["l3".to_string()],
            vec!["l4".to_string()],
        ]
    );
}

#[test]
fn test_infer_page_partitions_all_lines() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![(0, 1), (1, 2), (2, 3), (3, 0)]);

    let bites = infer_page(&model, &page).unwrap();
    let mut lines: Vec<String> = bites.into_iter().flatten().collect();
    lines.sort();
    assert_eq!(lines, vec!["0", "1", "2", "3"]);
}

#[test]
fn test_accepted_edges_end_up_in_the_same_bite() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    let page = page_with_edges(vec![(0, 1), (1, 2), (2, 3), (3, 0)]);

    let accepted = accepted_edges(&model, &page).unwrap();
    let bites = infer_page(&model, &page).unwrap();
    for (src, dst) in accepted {
        let bite_of = |node: usize| {
            bites
                .iter()
                .position(|bite| bite.contains(&node.to_string()))
                .unwrap()
        };
        assert_eq!(bite_of(src), bite_of(dst));
    }
}

#[test]
fn test_model_save_and_load() {
    let dir = TempDir::new().unwrap();
    let weights = dir.path().join("best.safetensors");

    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    model.save(&weights).unwrap();
    assert!(weights.is_file());
    assert!(config_path_for(&weights).is_file());

    let loaded = EdgeAffinityModel::load(&weights, &Device::Cpu).unwrap();
    assert_eq!(loaded.config(), model.config());

    let page = page_with_edges(vec![(0, 1), (1, 2)]);
    let tensors = PageTensors::new(&page, &Device::Cpu).unwrap();
    let a = model.embed_page(&tensors, false).unwrap();
    let b = loaded.embed_page(&tensors, false).unwrap();
    assert_eq!(max_abs_diff(&a, &b), 0.0);
}

#[test]
fn test_model_load_missing_checkpoint() {
    let dir = TempDir::new().unwrap();
    let err = EdgeAffinityModel::load(&dir.path().join("missing.safetensors"), &Device::Cpu)
        .unwrap_err();
    assert!(matches!(err, ModelError::CheckpointNotFound { .. }));
}

#[test]
fn test_model_load_without_config_sidecar() {
    let dir = TempDir::new().unwrap();
    let weights = dir.path().join("orphan.safetensors");

    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    model.save(&weights).unwrap();
    std::fs::remove_file(config_path_for(&weights)).unwrap();

    let err = EdgeAffinityModel::load(&weights, &Device::Cpu).unwrap_err();
    assert!(matches!(err, ModelError::Checkpoint { .. }));
}

#[test]
fn test_model_vars_cover_every_layer() {
    let model = EdgeAffinityModel::new(tiny_config(), &Device::Cpu).unwrap();
    // Two graph convolutions (weight + bias each) and the output projection.
    assert_eq!(model.vars().len(), 6);
}

#[test]
fn test_config_defaults() {
    let config = GraphModelConfig::default();
    assert_eq!(config.input_size, 97);
    assert_eq!(config.output_size, 10);
    assert_eq!(config.nb_hidden, 2);
    assert_eq!(config.hidden_width, 256);
    assert!((config.dropout - 0.1).abs() < f32::EPSILON);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_zero_hidden_layers() {
    let config = GraphModelConfig {
        nb_hidden: 0,
        ..tiny_config()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange {
            name: "nb_hidden",
            ..
        })
    ));
    assert!(EdgeAffinityModel::new(config, &Device::Cpu).is_err());
}

#[test]
fn test_config_rejects_certain_dropout() {
    let config = GraphModelConfig {
        dropout: 1.0,
        ..tiny_config()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange {
            name: "dropout",
            ..
        })
    ));
}

#[test]
fn test_device_preference_parsing() {
    assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
    assert_eq!("CPU".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
    assert_eq!("cuda".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda(0));
    assert_eq!("cuda:1".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda(1));
    assert_eq!("metal:2".parse::<DevicePreference>().unwrap(), DevicePreference::Metal(2));
    assert!("tpu".parse::<DevicePreference>().is_err());
    assert!("cuda:x".parse::<DevicePreference>().is_err());
}

#[test]
fn test_device_preference_display_parses_back() {
    for preference in [
        DevicePreference::Auto,
        DevicePreference::Cpu,
        DevicePreference::Cuda(3),
        DevicePreference::Metal(0),
    ] {
        assert_eq!(
            preference.to_string().parse::<DevicePreference>().unwrap(),
            preference
        );
    }
}

#[test]
fn test_select_cpu_device() {
    let device = select_device(DevicePreference::Cpu).unwrap();
    assert!(matches!(device, Device::Cpu));
}
