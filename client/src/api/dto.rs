//! Response envelopes.
//!
//! Endpoints are inconsistent about wrapping: some return the bare record or
//! array, others wrap it (`{"rifas": [...]}`, `{"data": {...}}`). These
//! types accept both and unwrap to the payload.

use serde::Deserialize;

/// A list, bare or wrapped
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped(WrappedList<T>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct WrappedList<T> {
    #[serde(
        alias = "items",
        alias = "rifas",
        alias = "participaciones",
        alias = "paises",
        alias = "estados",
        alias = "cupones",
        alias = "ads",
        alias = "anuncios"
    )]
    data: Vec<T>,
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_inner(self) -> Vec<T> {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped(WrappedList { data }) => data,
        }
    }
}

/// A single record, bare or wrapped
///
/// `Bare` is tried first: records carry an `_id` and may embed related
/// records (`usuario`, `rifa`) under the same keys a wrapper uses.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemEnvelope<T> {
    Bare(T),
    Wrapped(WrappedItem<T>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct WrappedItem<T> {
    #[serde(
        alias = "rifa",
        alias = "user",
        alias = "usuario",
        alias = "participacion",
        alias = "advertiser",
        alias = "anunciante"
    )]
    data: T,
}

impl<T> ItemEnvelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Bare(item) => item,
            Self::Wrapped(WrappedItem { data }) => data,
        }
    }
}
