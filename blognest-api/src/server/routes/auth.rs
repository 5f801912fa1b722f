use crate::server::{Reply, Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blognest_common::model::{
    auth::{TokenIdentity, TokenKeys, hash_password, verify_password},
    user::{Login, NewUser, Signup, User},
};
use blognest_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(signup).typed_post(login)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/auth/signup", rejection(ServerError))]
struct SignupPath();

async fn signup(
    SignupPath(): SignupPath,
    State(db_client): State<Arc<DbClient>>,
    Json(signup): Json<Signup>,
) -> Result<Reply<User>> {
    if signup.first_name.trim().is_empty() {
        return Err(ServerError::MissingField("firstName"));
    }
    if signup.last_name.trim().is_empty() {
        return Err(ServerError::MissingField("lastName"));
    }
    if signup.password.is_empty() {
        return Err(ServerError::MissingField("password"));
    }
    if signup.password != signup.confirm_password {
        return Err(ServerError::PasswordMismatch);
    }

    let user = NewUser {
        first_name: signup.first_name,
        last_name: signup.last_name,
        email: signup.email,
        password_hash: hash_password(&signup.password)?,
        role: signup.role,
    };

    let id = db_client
        .create_user(&user)
        .await?
        .ok_or(ServerError::EmailTaken)?;

    let user = User {
        id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        role: user.role,
        created_at: id.created_at_unix(),
    };

    Ok(Reply::created("User registered successfully", user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/auth/login", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct LoginData {
    token: String,
    user: User,
}

async fn login(
    LoginPath(): LoginPath,
    State(db_client): State<Arc<DbClient>>,
    State(token_keys): State<TokenKeys>,
    Json(login): Json<Login>,
) -> Result<Reply<LoginData>> {
    // Unknown emails and wrong passwords reply identically, so the endpoint
    // does not reveal which accounts exist.
    let credentials = db_client
        .fetch_credentials(&login.email)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !verify_password(&login.password, &credentials.password_hash) {
        return Err(ServerError::InvalidCredentials);
    }

    let token = token_keys.issue(TokenIdentity {
        user_id: credentials.user_id,
        role: credentials.role,
    })?;

    let user = db_client
        .fetch_user(credentials.user_id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(credentials.user_id))?;

    Ok(Reply::ok("Login successful", LoginData { token, user }))
}
