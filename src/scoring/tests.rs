use super::*;
use crate::constants::UNCLUSTERED;
use std::path::Path;
use tempfile::TempDir;

const EPS: f64 = 1e-9;

fn page(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|g| g.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPS,
        "expected {expected}, got {actual}"
    );
}

fn write(dir: &Path, name: &str, json: &str) {
    std::fs::write(dir.join(name), json).unwrap();
}

mod measures_tests {
    use super::*;

    #[test]
    fn test_identical_labels_score_perfectly() {
        let labels = [0, 0, 1, 1, 2];
        let scores = homogeneity_completeness_v_measure(&labels, &labels).unwrap();
        assert_eq!(scores, VScores::PERFECT);
    }

    #[test]
    fn test_permuted_label_ids_score_perfectly() {
        let pred = [7, 7, 3, 3, UNCLUSTERED];
        let truth = [0, 0, 1, 1, 2];
        let scores = homogeneity_completeness_v_measure(&pred, &truth).unwrap();
        assert_close(scores.homogeneity, 1.0);
        assert_close(scores.completeness, 1.0);
        assert_close(scores.v_measure, 1.0);
    }

    #[test]
    fn test_all_singletons_against_one_cluster() {
        let pred = [0, 1, 2, 3];
        let truth = [0, 0, 0, 0];
        let scores = homogeneity_completeness_v_measure(&pred, &truth).unwrap();

        // one reference class: homogeneity defaults to 1
        assert_close(scores.homogeneity, 1.0);
        assert_close(scores.completeness, 0.0);
        assert_close(scores.v_measure, 0.0);
    }

    #[test]
    fn test_one_cluster_against_singletons() {
        let pred = [0, 0, 0, 0];
        let truth = [0, 1, 2, 3];
        let scores = homogeneity_completeness_v_measure(&pred, &truth).unwrap();

        assert_close(scores.homogeneity, 0.0);
        assert_close(scores.completeness, 1.0);
        assert_close(scores.v_measure, 0.0);
    }

    #[test]
    fn test_single_item() {
        let scores = homogeneity_completeness_v_measure(&[5], &[9]).unwrap();
        assert_eq!(scores, VScores::PERFECT);
    }

    #[test]
    fn test_empty_input_scores_perfectly() {
        let empty: [i64; 0] = [];
        let scores = homogeneity_completeness_v_measure(&empty, &empty).unwrap();
        assert_eq!(scores, VScores::PERFECT);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = homogeneity_completeness_v_measure(&[0, 1], &[0]).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput { .. }));
    }

    #[test]
    fn test_partial_agreement_matches_reference_values() {
        // truth {a,b,c} {d,e,f}; pred {a,b} {c,d} {e,f}
        let pred = [0, 0, 1, 1, 2, 2];
        let truth = [0, 0, 0, 1, 1, 1];
        let scores = homogeneity_completeness_v_measure(&pred, &truth).unwrap();

        // H(truth) = ln 2, H(truth | pred) = (1/3) ln 2
        assert_close(scores.homogeneity, 2.0 / 3.0);
        // H(pred) = ln 3, H(pred | truth) = ln 3 - (2/3) ln 2
        let ln2 = 2f64.ln();
        let ln3 = 3f64.ln();
        let h_pred_given_truth = ln3 - (2.0 / 3.0) * ln2;
        assert_close(scores.completeness, 1.0 - h_pred_given_truth / ln3);
        assert!(scores.v_measure > 0.0 && scores.v_measure < 1.0);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let pred = [0, 1, 0, 1, 2, 2, 0, 3];
        let truth = [1, 1, 0, 0, 0, 2, 2, 2];
        let scores = homogeneity_completeness_v_measure(&pred, &truth).unwrap();
        for value in [scores.homogeneity, scores.completeness, scores.v_measure] {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}

mod score_page_tests {
    use super::*;

    #[test]
    fn test_clustering_against_itself_is_perfect() {
        let gt = page(&[&["a", "b"], &["c"], &["d", "e", "f"]]);
        let scores = score_page(&gt, &gt);
        assert_eq!(scores, VScores::PERFECT);
    }

    #[test]
    fn test_merged_hypothesis_is_complete_but_not_homogeneous() {
        let gt = page(&[&["a", "b"], &["c"]]);
        let hyp = page(&[&["a", "b", "c"]]);
        let scores = score_page(&hyp, &gt);

        assert_close(scores.completeness, 1.0);
        assert!(scores.homogeneity < 1.0);
        assert_close(scores.homogeneity, 0.0);
        assert_close(scores.v_measure, 0.0);
    }

    #[test]
    fn test_split_hypothesis_is_homogeneous_but_not_complete() {
        let gt = page(&[&["a", "b", "c"]]);
        let hyp = page(&[&["a"], &["b"], &["c"]]);
        let scores = score_page(&hyp, &gt);

        assert_close(scores.homogeneity, 1.0);
        assert_close(scores.completeness, 0.0);
    }

    #[test]
    fn test_line_missing_from_hypothesis_stays_in_universe() {
        let gt = page(&[&["a"], &["b", "c", "d"]]);
        let hyp = page(&[&["a"], &["b", "c"]]);
        let scores = score_page(&hyp, &gt);

        // "d" is unclustered in the hypothesis, splitting the {b,c,d} bite
        assert_close(scores.homogeneity, 1.0);
        assert!(scores.completeness < 1.0);
        assert!(scores.v_measure > 0.0 && scores.v_measure < 1.0);
    }

    #[test]
    fn test_line_missing_from_ground_truth_stays_in_universe() {
        let gt = page(&[&["a", "b"]]);
        let hyp = page(&[&["a", "b", "x"]]);
        let scores = score_page(&hyp, &gt);

        assert_close(scores.completeness, 1.0);
        assert!(scores.homogeneity < 1.0);
    }

    #[test]
    fn test_overlapping_hypothesis_uses_last_occurrence() {
        let gt = page(&[&["a", "b"], &["c"]]);
        // "b" also appears in the later grouping, which wins
        let hyp = page(&[&["a", "b"], &["b", "c"]]);
        let resolved = page(&[&["a"], &["b", "c"]]);

        let overlapping = score_page(&hyp, &gt);
        let expected = score_page(&resolved, &gt);
        assert_close(overlapping.homogeneity, expected.homogeneity);
        assert_close(overlapping.completeness, expected.completeness);
        assert_close(overlapping.v_measure, expected.v_measure);
    }

    #[test]
    fn test_empty_pages_score_perfectly() {
        let empty: Vec<Vec<String>> = vec![];
        assert_eq!(score_page(&empty, &empty), VScores::PERFECT);
    }

    #[test]
    fn test_score_page_is_symmetric_in_swap() {
        let a = page(&[&["a", "b"], &["c", "d"]]);
        let b = page(&[&["a"], &["b", "c", "d"]]);

        let ab = score_page(&a, &b);
        let ba = score_page(&b, &a);
        assert_close(ab.homogeneity, ba.completeness);
        assert_close(ab.completeness, ba.homogeneity);
        assert_close(ab.v_measure, ba.v_measure);
    }
}

mod format_tests {
    use super::*;

    #[test]
    fn test_parse_bite_objects() {
        let groups = parse_page(r#"[{"lines": ["a", "b"], "name": "x"}, {"lines": ["c"]}]"#)
            .unwrap();
        assert_eq!(groups, page(&[&["a", "b"], &["c"]]));
    }

    #[test]
    fn test_parse_bare_arrays() {
        let groups = parse_page(r#"[["a", "b"], ["c"]]"#).unwrap();
        assert_eq!(groups, page(&[&["a", "b"], &["c"]]));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_page(r#"{"lines": ["a"]}"#).is_err());
    }

    #[test]
    fn test_write_then_read_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.json");
        let groups = page(&[&["l1", "l2"], &["l3"]]);

        write_page(&path, &groups).unwrap();
        assert_eq!(read_page(&path).unwrap(), groups);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"lines\""));
    }

    #[test]
    fn test_write_page_into_missing_directory_is_a_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("page.json");

        let err = write_page(&path, &page(&[&["l1"]])).unwrap_err();
        assert!(matches!(err, ScoringError::Write { .. }));
        assert!(err.to_string().contains("failed to write"));
    }

    #[test]
    fn test_serialize_error_is_not_reported_as_parse_failure() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = ScoringError::Serialize {
            path: "page.json".into(),
            source,
        };
        let message = err.to_string();
        assert!(message.contains("failed to serialize"));
        assert!(!message.contains("parse"));
    }

    #[test]
    fn test_read_page_reports_path_on_parse_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.json", "[{");

        let err = read_page(&dir.path().join("broken.json")).unwrap_err();
        assert!(matches!(err, ScoringError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_format_v_scores() {
        let scores = VScores::from_parts(1.0, 0.5);
        assert_eq!(format_v_scores(&scores), "[H/C/V 100.00 50.00 66.67]");
        assert_eq!(scores.to_string(), "[H/C/V 100.00 50.00 66.67]");
    }
}

mod corpus_tests {
    use super::*;

    fn corpus() -> (TempDir, TempDir) {
        (TempDir::new().unwrap(), TempDir::new().unwrap())
    }

    #[test]
    fn test_accumulator_zero_pages_is_error() {
        let mut acc = ScoreAccumulator::new();
        acc.add_not_found();

        let err = acc.average().unwrap_err();
        assert!(matches!(err, ScoringError::EmptyCorpus { not_found: 1 }));
    }

    #[test]
    fn test_accumulator_averages_independently() {
        let mut acc = ScoreAccumulator::new();
        acc.add(&VScores::PERFECT);
        acc.add(&VScores {
            homogeneity: 0.5,
            completeness: 0.0,
            v_measure: 0.0,
        });
        acc.add_not_found();

        let avg = acc.average().unwrap();
        assert_close(avg.homogeneity, 0.75);
        assert_close(avg.completeness, 0.5);
        assert_close(avg.v_measure, 0.5);
        assert_close(acc.not_found_fraction(), 1.0 / 3.0);
    }

    #[test]
    fn test_corpus_of_perfect_pages_is_perfect() {
        let (hyp, gt) = corpus();
        for i in 0..4 {
            let json = r#"[{"lines": ["a", "b"]}, {"lines": ["c"]}]"#;
            write(gt.path(), &format!("page-{i}.json"), json);
            write(hyp.path(), &format!("page-{i}.json"), json);
        }

        let report = score_corpus(hyp.path(), gt.path()).unwrap();
        assert_eq!(report.nb_found(), 4);
        assert!(!report.is_partial());
        assert_close(report.average.homogeneity, 1.0);
        assert_close(report.average.completeness, 1.0);
        assert_close(report.average.v_measure, 1.0);
    }

    #[test]
    fn test_corpus_missing_pages_are_excluded_not_zeroed() {
        let (hyp, gt) = corpus();
        write(gt.path(), "a.json", r#"[["1", "2"]]"#);
        write(gt.path(), "b.json", r#"[["1"], ["2"]]"#);
        write(hyp.path(), "a.json", r#"[{"lines": ["1", "2"]}]"#);

        let report = score_corpus(hyp.path(), gt.path()).unwrap();
        assert_eq!(report.nb_found(), 1);
        assert_eq!(report.not_found, vec!["b.json".to_string()]);
        assert_eq!(report.average, VScores::PERFECT);
        assert_close(report.not_found_fraction(), 0.5);
    }

    #[test]
    fn test_corpus_with_no_matches_is_error() {
        let (hyp, gt) = corpus();
        write(gt.path(), "a.json", r#"[["1"]]"#);
        write(hyp.path(), "other.json", r#"[["1"]]"#);

        let err = score_corpus(hyp.path(), gt.path()).unwrap_err();
        assert!(matches!(err, ScoringError::EmptyCorpus { not_found: 1 }));
    }

    #[test]
    fn test_corpus_ignores_non_json_files() {
        let (hyp, gt) = corpus();
        write(gt.path(), "a.json", r#"[["1"]]"#);
        write(gt.path(), "notes.txt", "not a page");
        write(hyp.path(), "a.json", r#"[["1"]]"#);

        let report = score_corpus(hyp.path(), gt.path()).unwrap();
        assert_eq!(report.nb_found(), 1);
        assert_eq!(report.nb_not_found(), 0);
    }

    #[test]
    fn test_corpus_reports_pages_in_sorted_order() {
        let (hyp, gt) = corpus();
        for name in ["c.json", "a.json", "b.json"] {
            write(gt.path(), name, r#"[["1"]]"#);
            write(hyp.path(), name, r#"[["1"]]"#);
        }

        let mut seen = Vec::new();
        let report = score_corpus_with(hyp.path(), gt.path(), |p| seen.push(p.name.clone()))
            .unwrap();

        assert_eq!(seen, vec!["a.json", "b.json", "c.json"]);
        assert_eq!(
            report.pages.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            seen
        );
    }

    #[test]
    fn test_corpus_rejects_missing_directory() {
        let (hyp, _gt) = corpus();
        let err = score_corpus(hyp.path(), Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, ScoringError::NotADirectory { .. }));
    }

    #[test]
    fn test_corpus_propagates_malformed_page() {
        let (hyp, gt) = corpus();
        write(gt.path(), "a.json", r#"[["1"]]"#);
        write(hyp.path(), "a.json", "nope");

        let err = score_corpus(hyp.path(), gt.path()).unwrap_err();
        assert!(matches!(err, ScoringError::Parse { .. }));
    }
}
