use serde_json::json;

use scaleout_core::PipelineError;

use crate::helpers::{request, Harness};

const EVENTS_JSON: &str = r#"{"x": 1.0, "y": 3.0, "items": ["milk", "bread"], "timestamp": "2024-05-02 10:00:00"}
{"x": 2.0, "y": 5.0, "items": ["milk"], "timestamp": "2024-05-01 08:30:00"}
{"x": 3.0, "y": 7.0, "items": ["milk", "bread", "eggs"], "timestamp": "2024-05-02 18:15:00"}
{"x": 10.0, "y": 21.0, "items": ["bread"], "timestamp": "2024-05-03 07:00:00"}
"#;

#[tokio::test]
async fn ml_job_runs_every_task() {
    let h = Harness::new();
    h.put("shop/events/events.json", EVENTS_JSON);

    let req = request(
        "ml-1",
        "shop/events/events.json",
        "ml",
        &["kmeans", "regression", "fpgrowth", "timeseries"],
        &[2, 4],
    );
    let result = h.orchestrator().execute(req).await.unwrap();
    assert_eq!(result.performance_metrics[0].speedup, 1.0);
    assert_eq!(result.performance_metrics[0].efficiency, 0.5);

    let out = h.read_json("shop/result/ml-1/output/4_nodes.json");

    let centers = out["kmeans"].as_array().unwrap();
    assert_eq!(centers.len(), 3);
    assert!(centers.iter().all(|c| c.as_array().unwrap().len() == 2));

    let coef = out["regression"].as_array().unwrap();
    assert_eq!(coef.len(), 1);
    assert!((coef[0].as_f64().unwrap() - 2.0).abs() < 1e-9);

    assert_eq!(
        out["fpgrowth"],
        json!([
            {"items": ["bread"], "frequency": 3},
            {"items": ["milk"], "frequency": 3},
            {"items": ["bread", "milk"], "frequency": 2}
        ])
    );

    assert_eq!(
        out["timeseries"],
        json!([
            {"date": "2024-05-01", "count": 1},
            {"date": "2024-05-02", "count": 2},
            {"date": "2024-05-03", "count": 1}
        ])
    );

    // Every scale computes the same answer.
    assert_eq!(out, h.read_json("shop/result/ml-1/output/2_nodes.json"));
}

#[tokio::test]
async fn ml_tasks_skip_when_columns_are_missing() {
    let h = Harness::new();
    h.put("shop/raw/notes.txt", "one\ntwo\n");

    let req = request(
        "ml-skip",
        "shop/raw/notes.txt",
        "ml",
        &["kmeans", "regression", "fpgrowth", "timeseries"],
        &[1],
    );
    h.orchestrator().execute(req).await.unwrap();

    let out = h.read_json("shop/result/ml-skip/output/1_nodes.json");
    assert_eq!(
        out,
        json!({
            "kmeans": "Skipped: no numeric columns",
            "regression": "Skipped: insufficient columns",
            "fpgrowth": "Skipped: items column required",
            "timeseries": "Skipped: timestamp column required"
        })
    );
}

#[tokio::test]
async fn constant_feature_regresses_to_zero() {
    let h = Harness::new();
    h.put("shop/flat/flat.csv", "x,y\n4.0,1\n4.0,2\n4.0,6\n");

    let req = request("ml-flat", "shop/flat/flat.csv", "ml", &["regression"], &[1]);
    h.orchestrator().execute(req).await.unwrap();

    let out = h.read_json("shop/result/ml-flat/output/1_nodes.json");
    assert_eq!(out, json!({"regression": [0.0]}));
}

#[tokio::test]
async fn unsolvable_regression_aborts_with_engine_error() {
    let h = Harness::new();
    h.put("shop/huge/huge.csv", "x,y\n1.0e308,1\n1.0e308,3\n");

    let orchestrator = h.orchestrator();
    let req = request("ml-huge", "shop/huge/huge.csv", "ml", &["regression"], &[1, 2]);
    let err = orchestrator.execute(req).await.unwrap_err();

    assert!(matches!(err, PipelineError::Engine(ref m) if m.contains("regression")), "{err:?}");
    assert_eq!(err.kind(), "engine");
    assert!(!err.is_client_error());
    assert_eq!(orchestrator.active_sessions(), 0);
    assert!(!h.object_path("shop/result/ml-huge").exists());
    assert_eq!(h.scratch_dirs(), 0);
}
