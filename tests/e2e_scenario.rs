// tests/e2e_scenario.rs
// Config file -> engine -> sink -> output file, against a local HTTP server.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{http::StatusCode, routing::get, Json, Router};
use common::spawn_server;
use osint_aggregator::scheduler::run_cycle;
use osint_aggregator::{build_engine, AggregatorConfig, ConfigError, Credentials, ResultSink};
use serde_json::{json, Value};

async fn server() -> std::net::SocketAddr {
    let router = Router::new()
        .route("/a", get(|| async { Json(json!({ "v": 1 })) }))
        .route("/b", get(|| async { Json(json!({ "v": 2 })) }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
        );
    spawn_server(router).await
}

fn write_config(dir: &std::path::Path, body: Value) -> std::path::PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
    path
}

fn read_output(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn by_source(out: &Value) -> Vec<(String, Value)> {
    let mut v: Vec<(String, Value)> = out
        .as_array()
        .expect("output is an array")
        .iter()
        .map(|e| (e["source"].as_str().unwrap().to_string(), e["data"].clone()))
        .collect();
    v.sort_by(|a, b| a.0.cmp(&b.0));
    v
}

#[tokio::test(flavor = "multi_thread")]
async fn two_sources_both_land_in_output_in_about_one_second() {
    let addr = server().await;
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("osint_aggregated_data.json");
    let cfg_path = write_config(
        dir.path(),
        json!({
            "sources": [
                { "name": "A", "endpoint": format!("http://{addr}/a") },
                { "name": "B", "endpoint": format!("http://{addr}/b") }
            ],
            "rate_limit": 1,
            "post_processor": null,
            "output_path": out_path,
        }),
    );

    let cfg = AggregatorConfig::load_from_file(&cfg_path).unwrap();
    let engine = build_engine(&cfg, Arc::new(Credentials::default())).unwrap();
    let sink = ResultSink::from_config(&cfg);

    let t0 = Instant::now();
    let with_data = run_cycle(&engine, &sink).await.unwrap();
    let elapsed = t0.elapsed();

    assert_eq!(with_data, 2);
    assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1_900), "{elapsed:?}");
    assert_eq!(
        by_source(&read_output(&out_path)),
        vec![
            ("A".to_string(), json!({ "v": 1 })),
            ("B".to_string(), json!({ "v": 2 })),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn http_500_source_is_omitted_from_output() {
    let addr = server().await;
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.json");
    let cfg_path = write_config(
        dir.path(),
        json!({
            "sources": [
                { "name": "A", "endpoint": format!("http://{addr}/a") },
                { "name": "Broken", "endpoint": format!("http://{addr}/broken") }
            ],
            "rate_limit": 0,
            "post_processor": null,
            "output_path": out_path,
        }),
    );

    let cfg = AggregatorConfig::load_from_file(&cfg_path).unwrap();
    let engine = build_engine(&cfg, Arc::new(Credentials::default())).unwrap();
    let sink = ResultSink::from_config(&cfg);
    run_cycle(&engine, &sink).await.unwrap();

    assert_eq!(
        by_source(&read_output(&out_path)),
        vec![("A".to_string(), json!({ "v": 1 }))]
    );
}

#[tokio::test]
async fn missing_config_aborts_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let err = AggregatorConfig::load_from_file(dir.path().join("config.json")).unwrap_err();

    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn bundled_processor_summarizes_aggregate() {
    let addr = server().await;
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.json");
    let cfg_path = write_config(
        dir.path(),
        json!({
            "sources": [{ "name": "A", "endpoint": format!("http://{addr}/a") }],
            "rate_limit": 0,
            "post_processor": { "command": env!("CARGO_BIN_EXE_osint_processor") },
            "output_path": out_path,
        }),
    );
    let cfg = AggregatorConfig::load_from_file(&cfg_path).unwrap();
    let engine = build_engine(&cfg, Arc::new(Credentials::default())).unwrap();
    let processor = osint_aggregator::sink::ExternalProcessor::from_config(
        cfg.post_processor().unwrap(),
    )
    .with_current_dir(dir.path());
    let sink = ResultSink::new(Box::new(processor), &out_path);

    run_cycle(&engine, &sink).await.unwrap();

    let out = read_output(&out_path);
    assert_eq!(out["source_count"], 1);
    assert_eq!(
        out["processed_data"],
        json!([{ "source": "A", "data": { "v": 1 } }])
    );
    assert!(dir.path().join("processed_data.json").exists());
    assert!(dir.path().join("errors.log").exists());
}
