use serde_json::json;

use scaleout_pipeline::read_performance_table;

use crate::helpers::{request, Harness, SALES_CSV};

#[tokio::test]
async fn descriptive_job_persists_every_scale() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);

    let req = request(
        "job-1",
        "acme/datasets/sales.csv",
        "descriptive",
        &["row_count", "column_count", "data_types", "null_percentage", "min_max_mean", "unique_counts"],
        &[1, 2],
    );
    let result = h.orchestrator().execute(req).await.unwrap();

    assert_eq!(result.job_id, "job-1");
    assert_eq!(result.result_path, "acme/result/job-1/output");
    assert_eq!(
        result.outputs.keys().cloned().collect::<Vec<_>>(),
        vec!["1_nodes".to_string(), "2_nodes".to_string()]
    );
    assert!(result.started_at <= result.completed_at);

    let perf = &result.performance_metrics;
    assert_eq!(perf.len(), 2);
    assert_eq!(perf[0].scale, 1);
    assert_eq!(perf[0].speedup, 1.0);
    assert_eq!(perf[0].efficiency, 1.0);
    assert_eq!(perf[1].scale, 2);

    for key in ["1_nodes", "2_nodes"] {
        let out = h.read_json(&format!("acme/result/job-1/output/{key}.json"));
        assert_eq!(out["row_count"], json!(4));
        assert_eq!(out["column_count"], json!(3));
        assert_eq!(out["data_types"]["id"], json!("int"));
        assert_eq!(out["data_types"]["amount"], json!("double"));
        assert_eq!(out["null_percentage"]["id"], json!(0.0));
        assert_eq!(out["null_percentage"]["amount"], json!(25.0));
        assert_eq!(out["min_max_mean"]["id"], json!({"min": 1, "max": 4, "mean": 2.5}));
        assert_eq!(out["unique_counts"]["id"], json!(4));
        assert!(out["min_max_mean"].get("region").is_none());
    }

    let table = h.object_path("acme/result/job-1/output/performance.csv");
    assert!(result.performance_metrics_uri.ends_with("acme/result/job-1/output/performance.csv"));
    let back = read_performance_table(&table).unwrap();
    assert_eq!(back.len(), 2);
    for (a, b) in perf.iter().zip(&back) {
        assert_eq!(a.scale, b.scale);
        assert!((a.duration_seconds - b.duration_seconds).abs() < 1e-9);
        assert!((a.speedup - b.speedup).abs() < 1e-9);
        assert!((a.efficiency - b.efficiency).abs() < 1e-9);
    }

    assert_eq!(h.scratch_dirs(), 0, "scratch directory must be removed");
}

#[tokio::test]
async fn empty_dataset_reports_error_for_each_scale() {
    let h = Harness::new();
    h.put("acme/datasets/empty.csv", "id,amount\n");

    let req = request("job-empty", "acme/datasets/empty.csv", "descriptive", &["row_count"], &[1, 2]);
    let result = h.orchestrator().execute(req).await.unwrap();

    for key in result.outputs.keys() {
        let out = h.read_json(&format!("acme/result/job-empty/output/{key}.json"));
        assert_eq!(out, json!({"error": "Empty dataset"}));
    }
}

#[tokio::test]
async fn dataset_reference_may_be_a_store_uri() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);
    let uri = h.storage.backend.uri_for("acme/datasets/sales.csv");

    let req = request("job-uri", &uri, "descriptive", &["row_count"], &[1]);
    let result = h.orchestrator().execute(req).await.unwrap();
    assert_eq!(result.result_path, "acme/result/job-uri/output");
}

#[tokio::test]
async fn omitted_scales_use_the_default_list() {
    let h = Harness::new();
    h.put("acme/datasets/sales.csv", SALES_CSV);

    let req = scaleout_core::JobRequest::new(
        "job-default",
        "acme/datasets/sales.csv",
        scaleout_core::JobConfig::new("descriptive", &["column_count"]),
    );
    let result = h.orchestrator().execute(req).await.unwrap();

    let scales: Vec<usize> = result.performance_metrics.iter().map(|r| r.scale).collect();
    assert_eq!(scales, vec![1, 2, 4, 8]);
    assert_eq!(result.outputs.len(), 4);
}

#[tokio::test]
async fn text_dataset_has_single_value_column() {
    let h = Harness::new();
    h.put("notes/raw/log.txt", "alpha\nbeta\ngamma\n");

    let req = request("job-txt", "notes/raw/log.txt", "descriptive", &["row_count", "data_types"], &[1]);
    let result = h.orchestrator().execute(req).await.unwrap();

    let out = h.read_json("notes/result/job-txt/output/1_nodes.json");
    assert_eq!(out, json!({"row_count": 3, "data_types": {"value": "string"}}));
    assert_eq!(result.result_path, "notes/result/job-txt/output");
}
