use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use nosh::domain::config::ApiConfig;
use nosh::kernel::server::ApiState;
use nosh_database::Database;
use nosh_event_bus::EventBus;
use nosh_storage::Storage;
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_app() -> (Router, TempDir) {
    let temp = TempDir::new().unwrap();
    let db = Database::builder()
        .url("mem://")
        .session("nosh", "test")
        .init()
        .await
        .expect("in-memory database");
    let storage = Storage::builder().root(temp.path()).connect().await.expect("storage root");
    let events = EventBus::new();
    let cfg = ApiConfig::default();

    let slices = nosh::init(&cfg, &db, &events, &storage).await.expect("slice bootstrap");
    let state = slices
        .into_iter()
        .fold(
            ApiState::builder().config(cfg).db(db).events(events).storage(storage),
            |builder, slice| builder.register_slice(slice),
        )
        .build()
        .expect("state");

    let (router, _doc) = utoipa_axum::router::OpenApiRouter::new()
        .merge(nosh::server::router::location_router())
        .with_state(state)
        .split_for_parts();

    (router, temp)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn near_query_validates_coordinate_ranges() {
    let (app, _tmp) = test_app().await;

    let response = app
        .clone()
        .oneshot(get("/location/get?lat=120.0&lng=30.0&radius=500"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        app.oneshot(get("/location/get?lat=50.0&lng=-200.0&radius=500")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn near_query_rejects_non_positive_radius() {
    let (app, _tmp) = test_app().await;

    let response =
        app.clone().oneshot(get("/location/get?lat=50.0&lng=30.0&radius=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Negative and non-numeric radii fail extraction outright.
    let response =
        app.clone().oneshot(get("/location/get?lat=50.0&lng=30.0&radius=-5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        app.oneshot(get("/location/get?lat=50.0&lng=30.0&radius=lots")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn near_query_over_empty_collection_returns_ok() {
    let (app, _tmp) = test_app().await;

    let response =
        app.oneshot(get("/location/get?lat=50.0&lng=30.0&radius=500")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"[]");
}

#[tokio::test]
async fn inserted_location_is_found_nearby() {
    let (app, _tmp) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/location/new",
            r#"{"name":"Green Fork","vicinity":"12 Market St","lat":50.45,"lng":30.52,"tags":["Vegan"]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(get("/location/get?lat=50.4501&lng=30.52&radius=1000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("Green Fork"), "inserted venue should be within 1km: {body}");
    assert!(body.contains("distance"), "near query annotates distance");
}

#[tokio::test]
async fn insert_rejects_out_of_range_coordinates() {
    let (app, _tmp) = test_app().await;

    let response = app
        .oneshot(post_json("/location/new", r#"{"name":"Nowhere","lat":95.0,"lng":0.0}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
