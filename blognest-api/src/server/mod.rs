use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::{TypedHeader, typed_header::TypedHeaderRejection};
use banners::BannerHost;
use blognest_common::model::{
    Id,
    auth::{PasswordHashError, TokenIssueError, TokenKeys, TokenVerifyError},
    community::CommunityMarker,
    post::PostMarker,
    user::UserMarker,
};
use blognest_db::client::{DbClient, DbError};
use headers::ContentType;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
pub mod banners;
mod json;
mod routes;

#[cfg(test)]
mod tests;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub token_keys: TokenKeys,
    pub banners: BannerHost,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("Provided token was invalid: {0}")]
    InvalidToken(#[from] TokenVerifyError),
    #[error("Access Denied")]
    AccessDenied,
    #[error("The {0} field must not be empty")]
    MissingField(&'static str),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("The tags parameter must name at least one tag")]
    MissingTags,
    #[error("User already exists with this email")]
    EmailTaken,
    #[error("You have already liked this post")]
    AlreadyLiked,
    #[error("You have not liked this post")]
    NotLiked,
    #[error("You have already reported this post")]
    AlreadyReported,
    #[error("You have not reported this post")]
    NotReported,
    #[error("The admin cannot leave their own community")]
    AdminCannotLeave,
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Community with id {0} was not found.")]
    CommunityByIdNotFound(Id<CommunityMarker>),
    #[error("The password could not be hashed: {0}")]
    PasswordHash(#[from] PasswordHashError),
    #[error("A token could not be issued: {0}")]
    TokenIssue(#[from] TokenIssueError),
    #[error(transparent)]
    Database(#[from] DbError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::CommunityByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ServerError::AccessDenied => StatusCode::FORBIDDEN,
            ServerError::PathRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::MissingField(_)
            | ServerError::PasswordMismatch
            | ServerError::InvalidCredentials
            | ServerError::MissingTags
            | ServerError::EmailTaken
            | ServerError::AlreadyLiked
            | ServerError::NotLiked
            | ServerError::AlreadyReported
            | ServerError::NotReported
            | ServerError::AdminCannotLeave => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::PasswordHash(_)
            | ServerError::TokenIssue(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The stable machine-readable code carried in error envelopes.
    fn code(&self) -> &'static str {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::CommunityByIdNotFound(_) => "not_found",
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                "unauthorized"
            }
            ServerError::InvalidToken(_) => "unauthorized",
            ServerError::AccessDenied => "access_denied",
            ServerError::InvalidCredentials => "invalid_credentials",
            ServerError::PathRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::MissingField(_)
            | ServerError::PasswordMismatch
            | ServerError::MissingTags => "validation",
            ServerError::EmailTaken
            | ServerError::AlreadyLiked
            | ServerError::NotLiked
            | ServerError::AlreadyReported
            | ServerError::NotReported
            | ServerError::AdminCannotLeave => "conflict",
            ServerError::JsonResponse(_)
            | ServerError::PasswordHash(_)
            | ServerError::TokenIssue(_)
            | ServerError::Database(_) => "internal",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A successful reply: a status code and an envelope around the data.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Reply<T = ()> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl Reply {
    /// A bare acknowledgement without data.
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message, None)
    }
}

impl<T> Reply<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: true,
                message: message.into(),
                data,
                error: None,
            },
        }
    }
}

/// Renders an envelope as the response body. Error envelopes are plain
/// strings and booleans, so the fallback arm cannot re-enter itself.
fn envelope_response<T: Serialize>(status: StatusCode, envelope: &Envelope<T>) -> Response {
    match serde_json::to_vec(envelope) {
        Ok(body) => (status, TypedHeader(ContentType::json()), body).into_response(),
        Err(error) => ServerError::JsonResponse(error).into_response(),
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        envelope_response(self.status, &self.envelope)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // The detail stays in the log.
            "Something went wrong".to_owned()
        } else {
            self.to_string()
        };

        let envelope = Envelope::<()> {
            success: false,
            message,
            data: None,
            error: Some(self.code().to_owned()),
        };

        envelope_response(status, &envelope)
    }
}
