//! Requester metadata for open tracking

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::state::AppState;
use crate::tracking::RequestMetadata;

/// `X-Forwarded-For` request header
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// IP address and user agent of the client making the request
///
/// The IP comes from the connection (`ConnectInfo`), or from the first
/// `X-Forwarded-For` hop when [`AppState::trust_forwarded_for`] is set and
/// the header parses. Missing values are `None`; this extractor never
/// rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMetadata(pub RequestMetadata);

impl FromRequestParts<AppState> for ClientMetadata {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let forwarded = if state.trust_forwarded_for {
            forwarded_for(&parts.headers)
        } else {
            None
        };

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(Self(RequestMetadata {
            ip: forwarded.or(peer),
            user_agent,
        }))
    }
}

/// First hop of `X-Forwarded-For`, if it is an IP address
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
