use crate::Places;
use crate::store::MarkerStore;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nosh_derive::{api_handler, api_model};
use nosh_domain::constants::LOCATION_TAG;
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::Marker;
use nosh_kernel::server::ApiState;
use std::collections::BTreeSet;
use tracing::error;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

#[api_model]
/// Near-query parameters
struct LocationQuery {
    /// Latitude of the query center
    lat: f64,
    /// Longitude of the query center
    lng: f64,
    /// Radius in meters (positive integer)
    radius: u32,
}

#[api_model]
/// A stored venue
struct LocationRecord {
    /// Record id
    id: String,
    /// Venue name
    name: String,
    /// Human-readable address line
    vicinity: String,
    /// Latitude
    lat: f64,
    /// Longitude
    lng: f64,
    /// Dietary tags
    tags: Vec<String>,
    /// Distance from the query center, meters
    distance: Option<f64>,
}

impl From<Marker> for LocationRecord {
    fn from(marker: Marker) -> Self {
        Self {
            id: marker.id,
            name: marker.name,
            vicinity: marker.vicinity,
            lat: marker.coordinates.lat,
            lng: marker.coordinates.lng,
            tags: marker.tags.into_iter().collect(),
            distance: marker.distance,
        }
    }
}

#[api_model]
/// A new venue to insert
struct NewLocation {
    /// Venue name
    name: String,
    /// Human-readable address line
    #[serde(default)]
    vicinity: String,
    /// Latitude
    lat: f64,
    /// Longitude
    lng: f64,
    /// Dietary tags
    #[serde(default)]
    tags: Vec<String>,
}

#[api_model]
/// Error body
struct ErrorBody {
    /// What went wrong
    error: String,
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message.to_owned() })).into_response()
}

#[api_handler(
    get,
    path = "/location/get",
    responses(
        (status = OK, description = "Venues within the radius", body = [LocationRecord]),
        (status = BAD_REQUEST, description = "Malformed coordinates or radius", body = ErrorBody),
    ),
    tag = LOCATION_TAG,
)]
pub(crate) async fn location_get(
    State(state): State<ApiState>,
    Query(query): Query<LocationQuery>,
) -> Response {
    let center = GeoPoint::new(query.lat, query.lng);
    if !center.is_valid() {
        return bad_request("lat must be in [-90, 90] and lng in [-180, 180]");
    }
    if query.radius == 0 {
        return bad_request("radius must be a positive integer");
    }

    let places = match state.try_get_slice::<Places>() {
        Ok(places) => places,
        Err(err) => {
            error!(error = %err, "Places slice missing from state");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        },
    };

    match places.store.query_near(center, f64::from(query.radius), places.query_limit).await {
        Ok(markers) => {
            let records: Vec<LocationRecord> =
                markers.into_iter().map(LocationRecord::from).collect();
            Json(records).into_response()
        },
        Err(err) => {
            error!(error = %err, "Near query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

#[api_handler(
    post,
    path = "/location/new",
    responses(
        (status = CREATED, description = "Venue stored", body = LocationRecord),
        (status = BAD_REQUEST, description = "Malformed coordinates", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Unexpected storage failure"),
    ),
    tag = LOCATION_TAG,
)]
pub(crate) async fn location_new(
    State(state): State<ApiState>,
    Json(body): Json<NewLocation>,
) -> Response {
    let coordinates = GeoPoint::new(body.lat, body.lng);
    if !coordinates.is_valid() {
        return bad_request("lat must be in [-90, 90] and lng in [-180, 180]");
    }

    let places = match state.try_get_slice::<Places>() {
        Ok(places) => places,
        Err(err) => {
            error!(error = %err, "Places slice missing from state");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        },
    };

    let marker = Marker {
        id: String::new(),
        external_id: None,
        coordinates,
        name: body.name,
        vicinity: body.vicinity,
        tags: body.tags.into_iter().collect::<BTreeSet<_>>(),
        distance: None,
        is_new: false,
    };

    match places.store.create(marker).await {
        Ok(created) => {
            (StatusCode::CREATED, Json(LocationRecord::from(created))).into_response()
        },
        Err(err) => {
            error!(error = %err, "Location insert failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// The `/location` route set.
pub fn location_router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(location_get)).routes(routes!(location_new))
}
