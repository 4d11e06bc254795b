//! HTTP implementation of the backend ports.

use super::dto::{ItemEnvelope, ListEnvelope};
use super::{AdvertiserApi, ApiFuture, AuthApi, RaffleApi};
use crate::config::ClientConfig;
use crate::error::{ApiError, extract_message};
use crate::storage::keys;
use crate::types::{
    Ad, AdvertiserProfile, AdvertiserSession, AuthSession, Country, Coupon, Credentials,
    Participation, ParticipationRequest, Raffle, RaffleFilters, RaffleId, RaffleInput, Region,
    Registration, UploadedImage, User,
};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use sorteohub_core::environment::KeyValueStore;
use std::fmt;
use std::sync::Arc;

/// Which stored token authorizes a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenScope {
    User,
    Advertiser,
}

/// SorteoHub backend client
///
/// Reads the bearer token from storage on every request, so a login or
/// logout performed by a store is picked up without rebuilding the client.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    storage: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the base URL cannot be parsed
    /// or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {e}", config.api_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "{} cannot be used as a base URL",
                config.api_url
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            storage,
        })
    }

    /// Base URL requests are resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidRequest("base URL has no path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn token(&self, scope: TokenScope) -> Option<String> {
        let key = match scope {
            TokenScope::User => keys::TOKEN,
            TokenScope::Advertiser => keys::ADVERTISER_TOKEN,
        };
        self.storage.get(key).filter(|token| !token.trim().is_empty())
    }

    /// Issue a request and decode the JSON response
    #[tracing::instrument(
        name = "api_request",
        skip(self, method, segments, customize),
        fields(method = %method, path = %segments.join("/"))
    )]
    async fn execute<T, F>(
        &self,
        method: Method,
        segments: &[&str],
        scope: TokenScope,
        customize: F,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let url = self.endpoint(segments)?;
        let mut request = self.http.request(method, url);
        if let Some(token) = self.token(scope) {
            request = request.bearer_auth(token);
        }

        let response = customize(request).send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request did not complete");
            ApiError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            let error = ApiError::from_status(status.as_u16(), extract_message(&body));
            tracing::warn!(status = status.as_u16(), error = %error, "Request rejected");
            return Err(error);
        }

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "Request succeeded");
        decode_body(&body)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        scope: TokenScope,
    ) -> Result<Vec<T>, ApiError> {
        let envelope: ListEnvelope<T> = self.execute(Method::GET, segments, scope, |r| r).await?;
        Ok(envelope.into_inner())
    }

    async fn get_item<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        scope: TokenScope,
    ) -> Result<T, ApiError> {
        let envelope: ItemEnvelope<T> = self.execute(Method::GET, segments, scope, |r| r).await?;
        Ok(envelope.into_inner())
    }

    /// `POST /participantes/:rifaId/participar`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails; a 4xx usually means an
    /// element was taken in the meantime.
    pub async fn participate(
        &self,
        raffle_id: &RaffleId,
        request: &ParticipationRequest,
    ) -> Result<Participation, ApiError> {
        let envelope: ItemEnvelope<Participation> = self
            .execute(
                Method::POST,
                &["participantes", raffle_id.as_str(), "participar"],
                TokenScope::User,
                |r| r.json(request),
            )
            .await?;
        Ok(envelope.into_inner())
    }

    /// `GET /participantes/mis-participaciones`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn my_participations(&self) -> Result<Vec<Participation>, ApiError> {
        self.get_list(&["participantes", "mis-participaciones"], TokenScope::User)
            .await
    }

    /// `GET /catalogos/paises`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn countries(&self) -> Result<Vec<Country>, ApiError> {
        self.get_list(&["catalogos", "paises"], TokenScope::User).await
    }

    /// `GET /catalogos/estados/:pais`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn states(&self, country: &str) -> Result<Vec<Region>, ApiError> {
        self.get_list(&["catalogos", "estados", country], TokenScope::User)
            .await
    }

    /// `POST /upload/image` (multipart field `image`)
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for an unusable MIME type, or an
    /// [`ApiError`] if the upload fails.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<UploadedImage, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        self.execute(Method::POST, &["upload", "image"], TokenScope::User, |r| {
            r.multipart(form)
        })
        .await
    }

    /// `GET /cupones`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn active_coupons(&self) -> Result<Vec<Coupon>, ApiError> {
        self.get_list(&["cupones"], TokenScope::User).await
    }

    /// `POST /cupones/:id/canjear`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn redeem_coupon(&self, coupon_id: &str) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .execute(
                Method::POST,
                &["cupones", coupon_id, "canjear"],
                TokenScope::User,
                |r| r,
            )
            .await?;
        Ok(())
    }

    /// `GET /ads/activos`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn active_ads(&self) -> Result<Vec<Ad>, ApiError> {
        self.get_list(&["ads", "activos"], TokenScope::User).await
    }
}

/// Decode a 2xx body; an empty body decodes as JSON `null`
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

impl RaffleApi for ApiClient {
    fn list_raffles(&self, filters: &RaffleFilters) -> ApiFuture<'_, Vec<Raffle>> {
        let query = filters.to_query();
        Box::pin(async move {
            let envelope: ListEnvelope<Raffle> = self
                .execute(Method::GET, &["rifas"], TokenScope::User, |r| r.query(&query))
                .await?;
            Ok(envelope.into_inner())
        })
    }

    fn my_raffles(&self) -> ApiFuture<'_, Vec<Raffle>> {
        Box::pin(async move { self.get_list(&["rifas", "my"], TokenScope::User).await })
    }

    fn get_raffle(&self, id: &RaffleId) -> ApiFuture<'_, Raffle> {
        let id = id.clone();
        Box::pin(async move { self.get_item(&["rifas", id.as_str()], TokenScope::User).await })
    }

    fn create_raffle(&self, input: &RaffleInput) -> ApiFuture<'_, Raffle> {
        let input = input.clone();
        Box::pin(async move {
            let envelope: ItemEnvelope<Raffle> = self
                .execute(Method::POST, &["rifas"], TokenScope::User, |r| r.json(&input))
                .await?;
            Ok(envelope.into_inner())
        })
    }

    fn update_raffle(&self, id: &RaffleId, input: &RaffleInput) -> ApiFuture<'_, Raffle> {
        let id = id.clone();
        let input = input.clone();
        Box::pin(async move {
            let envelope: ItemEnvelope<Raffle> = self
                .execute(
                    Method::PUT,
                    &["rifas", id.as_str()],
                    TokenScope::User,
                    |r| r.json(&input),
                )
                .await?;
            Ok(envelope.into_inner())
        })
    }

    fn delete_raffle(&self, id: &RaffleId) -> ApiFuture<'_, ()> {
        let id = id.clone();
        Box::pin(async move {
            let _: IgnoredAny = self
                .execute(Method::DELETE, &["rifas", id.as_str()], TokenScope::User, |r| r)
                .await?;
            Ok(())
        })
    }
}

impl AuthApi for ApiClient {
    fn register(&self, registration: &Registration) -> ApiFuture<'_, AuthSession> {
        let registration = registration.clone();
        Box::pin(async move {
            self.execute(
                Method::POST,
                &["auth", "register"],
                TokenScope::User,
                |r| r.json(&registration),
            )
            .await
        })
    }

    fn login(&self, credentials: &Credentials) -> ApiFuture<'_, AuthSession> {
        let credentials = credentials.clone();
        Box::pin(async move {
            self.execute(Method::POST, &["auth", "login"], TokenScope::User, |r| {
                r.json(&credentials)
            })
            .await
        })
    }

    fn me(&self) -> ApiFuture<'_, User> {
        Box::pin(async move { self.get_item(&["auth", "me"], TokenScope::User).await })
    }
}

impl AdvertiserApi for ApiClient {
    fn advertiser_login(&self, credentials: &Credentials) -> ApiFuture<'_, AdvertiserSession> {
        let credentials = credentials.clone();
        Box::pin(async move {
            self.execute(
                Method::POST,
                &["advertisers", "login"],
                TokenScope::Advertiser,
                |r| r.json(&credentials),
            )
            .await
        })
    }

    fn advertiser_me(&self) -> ApiFuture<'_, AdvertiserProfile> {
        Box::pin(async move {
            self.get_item(&["advertisers", "me"], TokenScope::Advertiser)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use sorteohub_testing::InMemoryKeyValueStore;

    fn client(storage: InMemoryKeyValueStore) -> ApiClient {
        let config = ClientConfig::new("http://localhost:5000/api").unwrap();
        ApiClient::new(&config, Arc::new(storage)).unwrap()
    }

    #[test]
    fn endpoints_are_appended_and_escaped() {
        let client = client(InMemoryKeyValueStore::new());
        let url = client.endpoint(&["catalogos", "estados", "El Salvador"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/catalogos/estados/El%20Salvador"
        );
    }

    #[test]
    fn tokens_are_scoped() {
        let storage = InMemoryKeyValueStore::with_entries([
            (keys::TOKEN, "user-token"),
            (keys::ADVERTISER_TOKEN, " "),
        ]);
        let client = client(storage);

        assert_eq!(client.token(TokenScope::User).as_deref(), Some("user-token"));
        assert_eq!(client.token(TokenScope::Advertiser), None);
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let unit: Result<(), ApiError> = decode_body("");
        assert!(unit.is_ok());

        let error = decode_body::<Vec<Raffle>>("<html>").unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::MalformedResponse);
    }
}
