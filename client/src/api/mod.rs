//! Backend access.
//!
//! Stores depend on the port traits below, never on [`ApiClient`] directly,
//! so reducers can be driven against in-memory fakes. [`ApiClient`] is the
//! production implementation over HTTP.

use crate::error::ApiError;
use crate::types::{
    AdvertiserProfile, AdvertiserSession, AuthSession, Credentials, Raffle, RaffleFilters,
    RaffleId, RaffleInput, Registration, User,
};
use std::future::Future;
use std::pin::Pin;

mod client;
mod dto;

pub use client::ApiClient;

/// Boxed future returned by the ports
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Raffle catalog and organizer CRUD
pub trait RaffleApi: Send + Sync {
    /// `GET /rifas`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn list_raffles(&self, filters: &RaffleFilters) -> ApiFuture<'_, Vec<Raffle>>;

    /// `GET /rifas/my`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn my_raffles(&self) -> ApiFuture<'_, Vec<Raffle>>;

    /// `GET /rifas/:id`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn get_raffle(&self, id: &RaffleId) -> ApiFuture<'_, Raffle>;

    /// `POST /rifas`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn create_raffle(&self, input: &RaffleInput) -> ApiFuture<'_, Raffle>;

    /// `PUT /rifas/:id`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn update_raffle(&self, id: &RaffleId, input: &RaffleInput) -> ApiFuture<'_, Raffle>;

    /// `DELETE /rifas/:id`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn delete_raffle(&self, id: &RaffleId) -> ApiFuture<'_, ()>;
}

/// User authentication
pub trait AuthApi: Send + Sync {
    /// `POST /auth/register`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn register(&self, registration: &Registration) -> ApiFuture<'_, AuthSession>;

    /// `POST /auth/login`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn login(&self, credentials: &Credentials) -> ApiFuture<'_, AuthSession>;

    /// `GET /auth/me` with the stored user token
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is missing or expired.
    fn me(&self) -> ApiFuture<'_, User>;
}

/// Advertiser session
pub trait AdvertiserApi: Send + Sync {
    /// `POST /advertisers/login`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    fn advertiser_login(&self, credentials: &Credentials) -> ApiFuture<'_, AdvertiserSession>;

    /// `GET /advertisers/me` with the stored advertiser token
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is missing or expired.
    fn advertiser_me(&self) -> ApiFuture<'_, AdvertiserProfile>;
}
