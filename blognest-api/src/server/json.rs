use crate::server::ServerError;
use axum::{Json as AxumJson, extract::FromRequest};

/// Body extractor whose rejection replies with the standard envelope instead
/// of axum's plain-text default. Responses are rendered by [`Reply`] and
/// [`ServerError`] directly, so this is extraction-only.
///
/// [`Reply`]: crate::server::Reply
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);
