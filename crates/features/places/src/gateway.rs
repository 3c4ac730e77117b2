//! One-shot radius search against the third-party places catalog.
//!
//! The provider is authoritative for discovery only; its failures are never
//! fatal. [`crate::query`] maps every error from here to an empty result set.

use crate::error::PlacesError;
use nosh_domain::geo::GeoPoint;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One venue as reported by the external catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPlace {
    /// Identity assigned by the provider.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vicinity: String,
    pub location: GeoPoint,
}

/// Port over the third-party places search.
pub trait ExternalPlaces: Debug + Send + Sync {
    /// Radius search around `center`. A non-OK provider status is an error
    /// here; the caller decides how to degrade.
    fn search<'a>(
        &'a self,
        center: GeoPoint,
        radius_m: f64,
        category: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ExternalPlace>, PlacesError>>;
}

/// Provider response envelope.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ExternalPlace>,
}

/// HTTP implementation of [`ExternalPlaces`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPlacesGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpPlacesGateway {
    /// Builds a gateway for the given provider base URL.
    ///
    /// # Errors
    /// Returns [`PlacesError::Provider`] if `base_url` is not a valid
    /// absolute URL.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, PlacesError> {
        let base_url = Url::parse(base_url).map_err(|e| PlacesError::Provider {
            message: e.to_string().into(),
            context: Some("Invalid provider base URL".into()),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PlacesError::Http { source: e, context: Some("Building client".into()) })?;

        Ok(Self { client, base_url, api_key })
    }
}

impl ExternalPlaces for HttpPlacesGateway {
    fn search<'a>(
        &'a self,
        center: GeoPoint,
        radius_m: f64,
        category: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ExternalPlace>, PlacesError>> {
        Box::pin(async move {
            let url = self.base_url.join("search").map_err(|e| PlacesError::Provider {
                message: e.to_string().into(),
                context: Some("Joining search path".into()),
            })?;

            let mut request = self.client.get(url).query(&[
                ("lat", center.lat.to_string()),
                ("lng", center.lng.to_string()),
                ("radius", radius_m.to_string()),
                ("category", category.to_owned()),
            ]);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await?;
            let status = response.status();
            if status != StatusCode::OK {
                return Err(PlacesError::Provider {
                    message: format!("Provider returned {status}").into(),
                    context: None,
                });
            }

            let body: SearchResponse = response.json().await?;
            debug!(results = body.results.len(), "Provider search completed");
            Ok(body.results)
        })
    }
}
