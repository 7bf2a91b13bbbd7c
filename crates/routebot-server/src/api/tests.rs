use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use routebot_core::{GeoPoint, RouteRecord};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, persistence, state::AppState};

const LAT: f64 = 60.17;
const LON: f64 = 24.94;
// roughly 10 m east at LAT
const STEP_LON: f64 = 0.00018;

fn test_config() -> Config {
    let mut config = Config::from_env();
    // one connection so every query sees the same in-memory database
    config.database_path = ":memory:".to_string();
    config.database_max_connections = 1;
    // no network in tests; direct lines degrade to interpolated heights
    config.terrain_provider_url = String::new();
    config.follower_tick_ms = 10;
    config
}

async fn setup_app(config_routes: Vec<RouteRecord>) -> (axum::Router, Arc<AppState>) {
    let config = test_config();
    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await
        .expect("init db");
    let state = Arc::new(AppState::with_database(db, config, config_routes));
    state.load_from_database().await.expect("load db");

    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn line_route(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Harbour line",
        "points": [
            { "lon": LON, "lat": LAT },
            { "lon": LON + STEP_LON, "lat": LAT },
            { "lon": LON + 2.0 * STEP_LON, "lat": LAT }
        ]
    })
}

fn config_route() -> RouteRecord {
    RouteRecord {
        id: "config-ridge".to_string(),
        name: "Ridge".to_string(),
        color: "CYAN".to_string(),
        description: Some("from routes file".to_string()),
        points: vec![
            GeoPoint::new(LON, LAT + 0.01, 0.0),
            GeoPoint::new(LON + STEP_LON, LAT + 0.01, 0.0),
        ],
    }
}

#[tokio::test]
async fn create_route_and_list_with_config_first() {
    let (app, _state) = setup_app(vec![config_route()]).await;

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/routes", line_route("harbour")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = read_json(res).await;
    assert_eq!(created["color"], "ORANGE");

    let res = app.clone().oneshot(empty_request("GET", "/v1/routes")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let list = read_json(res).await;
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["config-ridge", "harbour"]);

    let res = app.clone().oneshot(empty_request("GET", "/v1/graph")).await.unwrap();
    let stats = read_json(res).await;
    assert_eq!(stats["routes"], 2);
    assert_eq!(stats["nodes"], 5);
    assert_eq!(stats["edges"], 3);
}

#[tokio::test]
async fn empty_id_gets_generated() {
    let (app, _state) = setup_app(Vec::new()).await;
    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/routes", line_route("")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = read_json(res).await;
    let id = created["id"].as_str().unwrap();
    assert!(!id.is_empty());

    let res = app
        .clone()
        .oneshot(empty_request("GET", &format!("/v1/routes/{}", id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn config_routes_are_read_only() {
    let (app, _state) = setup_app(vec![config_route()]).await;

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/routes/config-ridge"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/routes", line_route("config-ridge")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/routes/missing"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_contains_stored_routes_only() {
    let (app, _state) = setup_app(vec![config_route()]).await;
    app.clone()
        .oneshot(json_request("POST", "/v1/routes", line_route("harbour")))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/v1/routes/export"))
        .await
        .unwrap();
    let body = read_json(res).await;
    let routes = body["routes"].as_array().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["id"], "harbour");
}

#[tokio::test]
async fn replace_routes_swaps_the_stored_set() {
    let (app, state) = setup_app(Vec::new()).await;
    app.clone()
        .oneshot(json_request("POST", "/v1/routes", line_route("old")))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/routes",
            json!({ "routes": [line_route("a"), line_route("b")] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["stored"], 2);

    let ids: Vec<String> = state.stored_routes().await.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(state.graph().node_count(), 6);
}

#[tokio::test]
async fn plan_follows_stored_route_network() {
    let (app, _state) = setup_app(Vec::new()).await;
    app.clone()
        .oneshot(json_request("POST", "/v1/routes", line_route("harbour")))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/plan",
            json!({
                "start": { "lon": LON, "lat": LAT },
                "end": { "lon": LON + 2.0 * STEP_LON, "lat": LAT }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["mode"], "network");
    let length = body["length_m"].as_f64().unwrap();
    assert!(length > 15.0 && length < 25.0);
    assert_eq!(body["follower"]["status"], "running");
    assert_eq!(body["follower"]["run_id"], 1);

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/follower"))
        .await
        .unwrap();
    let stopped = read_json(res).await;
    assert_eq!(stopped["stopped"], true);
    assert_eq!(stopped["follower"]["status"], "idle");
}

#[tokio::test]
async fn plan_without_routes_falls_back_to_direct_line() {
    let (app, state) = setup_app(Vec::new()).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/plan",
            json!({
                "start": { "lon": LON, "lat": LAT },
                "end": { "lon": LON + 0.01, "lat": LAT + 0.005 },
                "follow": false
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["mode"], "direct");
    assert_eq!(body["positions"].as_array().unwrap().len(), 49);
    assert!(body["node_ids"].as_array().unwrap().is_empty());
    assert_eq!(body["follower"]["status"], "idle");
    assert_eq!(state.follower_snapshot().run_id, 0);
}

#[tokio::test]
async fn identical_points_are_unprocessable() {
    let (app, _state) = setup_app(Vec::new()).await;
    let point = json!({ "lon": LON, "lat": LAT, "height": 4.0 });

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/plan",
            json!({ "start": point, "end": point }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(res).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("unable to compute route between selected points"));
}

#[tokio::test]
async fn follower_is_idle_until_planned() {
    let (app, _state) = setup_app(Vec::new()).await;
    let res = app
        .clone()
        .oneshot(empty_request("GET", "/v1/follower"))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["status"], "idle");
    assert_eq!(body["run_id"], 0);

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/follower"))
        .await
        .unwrap();
    assert_eq!(read_json(res).await["stopped"], false);
}

#[tokio::test]
async fn follower_ticks_are_broadcast_until_completion() {
    let (_app, state) = setup_app(vec![RouteRecord {
        points: vec![GeoPoint::new(LON, LAT, 0.0), GeoPoint::new(LON + STEP_LON, LAT, 0.0)],
        ..config_route()
    }])
    .await;
    let mut rx = state.tx.subscribe();

    let planned = state
        .plan(&GeoPoint::new(LON, LAT, 0.0), &GeoPoint::new(LON + STEP_LON, LAT, 0.0), true)
        .await
        .expect("plan");

    let last = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            let tick = rx.recv().await.expect("tick");
            if tick.completed {
                return tick;
            }
        }
    })
    .await
    .expect("run completes");

    let positions = planned.path.positions();
    assert_eq!(last.position, positions[positions.len() - 1]);
    assert_eq!(last.run_id, 1);
    assert_eq!(
        state.follower_snapshot().status,
        routebot_core::FollowerStatus::Completed
    );
}

/// SQLite file in the temp dir, removed with its journal files on drop.
struct TempDatabaseFile(std::path::PathBuf);

impl TempDatabaseFile {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("routebot-test-{}.db", uuid::Uuid::new_v4())))
    }

    fn path(&self) -> String {
        self.0.to_string_lossy().to_string()
    }
}

impl Drop for TempDatabaseFile {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path(), suffix));
        }
    }
}

#[tokio::test]
async fn stored_routes_survive_restart() {
    let file = TempDatabaseFile::new();
    let mut config = test_config();
    config.database_path = file.path();

    let db = persistence::init_database(&config.database_path, 1)
        .await
        .expect("init db");
    let state = Arc::new(AppState::with_database(db.clone(), config.clone(), Vec::new()));
    let app = api::routes().with_state(state);
    app.clone()
        .oneshot(json_request("POST", "/v1/routes", line_route("harbour")))
        .await
        .unwrap();
    db.pool().close().await;

    let db = persistence::init_database(&config.database_path, 1)
        .await
        .expect("reopen db");
    let restarted = AppState::with_database(db.clone(), config, Vec::new());
    assert_eq!(restarted.load_from_database().await.unwrap(), 1);
    assert_eq!(restarted.graph().node_count(), 3);
    db.pool().close().await;
}
