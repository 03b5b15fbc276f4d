//! Identity context: who is making this request.
//!
//! The caller's address travels in the `x-caller-address` header. Mutations
//! extract [`Caller`], which insists on a real address; reads extract
//! [`Viewer`], which falls back to the anonymous zero address.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use ideas_types::Address;

use crate::error::RpcError;

pub const CALLER_HEADER: &str = "x-caller-address";

/// The authenticated author of a mutating request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(pub Address);

/// The identity a read is projected for; zero when anonymous.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Viewer(pub Address);

fn header_address(parts: &Parts) -> Result<Option<Address>, RpcError> {
    let Some(value) = parts.headers.get(CALLER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| RpcError::InvalidCaller("header is not valid text".into()))?;
    Address::parse(raw.trim())
        .map(Some)
        .map_err(|e| RpcError::InvalidCaller(e.to_string()))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let address = header_address(parts)?.ok_or(RpcError::MissingCaller)?;
        if address.is_zero() {
            return Err(RpcError::InvalidCaller(
                "the zero address cannot perform mutations".into(),
            ));
        }
        Ok(Caller(address))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(header_address(parts)?.unwrap_or_else(Address::zero)))
    }
}
