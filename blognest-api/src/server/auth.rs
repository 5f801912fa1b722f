use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use blognest_common::model::{
    Id,
    auth::{TokenIdentity, TokenKeys},
    user::{Role, UserMarker},
};
use headers::{Authorization, authorization::Bearer};

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

async fn verify_token<S>(parts: &mut Parts, state: &S) -> Result<TokenIdentity, ServerError>
where
    TokenKeys: FromRef<S>,
    S: Send + Sync,
{
    let header = AuthorizationHeader::from_request_parts(parts, state)
        .await
        .map_err(ServerError::InvalidAuthorizationHeader)?;

    let identity = TokenKeys::from_ref(state).verify(header.token())?;

    Ok(identity)
}

/// Extractor gating a route to regular users.
///
/// The gate is a strict role comparison, so admin tokens do not pass it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    TokenKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = verify_token(parts, state).await?;

        if identity.role != Role::User {
            return Err(ServerError::AccessDenied);
        }

        Ok(Self {
            id: identity.user_id,
        })
    }
}

/// Extractor gating a route to administrators.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedAdmin;

impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    TokenKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = verify_token(parts, state).await?;

        if identity.role != Role::Admin {
            return Err(ServerError::AccessDenied);
        }

        Ok(Self)
    }
}
