use crate::server::{self, ServerState, banners::BannerHost};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use blognest_common::model::{Id, auth::TokenKeys, user::Role};
use blognest_common::snowflake::NodeId;
use blognest_db::client::DbClient;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_SECRET: &[u8] = b"blognest-test-secret";
const PASSWORD: &str = "hunter22";

async fn test_app() -> Router {
    let db_client = DbClient::connect("sqlite::memory:", NodeId::new_unchecked(0))
        .await
        .unwrap();

    let state = ServerState {
        db_client: Arc::new(db_client),
        token_keys: TokenKeys::from_secret(TEST_SECRET),
        banners: BannerHost::new(None, None),
    };

    server::routes().with_state(state)
}

fn request(method: Method, path: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();

    (status, body)
}

async fn signup(app: &Router, first_name: &str, email: &str, role: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(&json!({
                "firstName": first_name,
                "lastName": "Tester",
                "email": email,
                "password": PASSWORD,
                "confirmPassword": PASSWORD,
                "role": role,
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn login(app: &Router, email: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(&json!({ "email": email, "password": PASSWORD })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    body
}

async fn user_token(app: &Router, email: &str) -> String {
    signup(app, "Norma", email, "user").await;
    let body = login(app, email).await;

    body["data"]["token"].as_str().unwrap().to_owned()
}

async fn admin_token(app: &Router, email: &str) -> String {
    signup(app, "Agnes", email, "admin").await;
    let body = login(app, email).await;

    body["data"]["token"].as_str().unwrap().to_owned()
}

async fn create_post(app: &Router, token: &str, title: &str, body: &Value) -> Value {
    let mut payload = json!({
        "title": title,
        "banner": "https://images.example/banner.png",
        "content": "Some words worth reading.",
    });
    for (key, value) in body.as_object().unwrap() {
        payload[key] = value.clone();
    }

    let (status, body) = send(
        app,
        request(
            Method::PUT,
            "/api/post/createpost",
            Some(token),
            Some(&payload),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn signup_returns_the_created_user() {
    let app = test_app().await;

    let body = signup(&app, "Norma", "norma@example.com", "user").await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("User registered successfully"));
    assert_eq!(body["data"]["firstName"], json!("Norma"));
    assert_eq!(body["data"]["email"], json!("norma@example.com"));
    assert_eq!(body["data"]["role"], json!("user"));
    assert!(body["data"]["id"].is_u64());
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn signup_rejects_mismatched_passwords() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(&json!({
                "firstName": "Norma",
                "lastName": "Tester",
                "email": "norma@example.com",
                "password": "one",
                "confirmPassword": "two",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Passwords do not match"));
    assert_eq!(body["error"], json!("validation"));
}

#[tokio::test]
async fn signup_rejects_blank_fields() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(&json!({
                "firstName": "   ",
                "lastName": "Tester",
                "email": "norma@example.com",
                "password": PASSWORD,
                "confirmPassword": PASSWORD,
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("The firstName field must not be empty"));
    assert_eq!(body["error"], json!("validation"));
}

#[tokio::test]
async fn duplicate_emails_conflict() {
    let app = test_app().await;

    signup(&app, "Norma", "norma@example.com", "user").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(&json!({
                "firstName": "Other",
                "lastName": "Tester",
                "email": "norma@example.com",
                "password": PASSWORD,
                "confirmPassword": PASSWORD,
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("User already exists with this email"));
    assert_eq!(body["error"], json!("conflict"));
}

#[tokio::test]
async fn login_issues_a_verifiable_token() {
    let app = test_app().await;

    let created = signup(&app, "Norma", "norma@example.com", "user").await;
    let body = login(&app, "norma@example.com").await;

    assert_eq!(body["message"], json!("Login successful"));
    assert_eq!(body["data"]["user"]["id"], created["data"]["id"]);

    let token = body["data"]["token"].as_str().unwrap();
    let identity = TokenKeys::from_secret(TEST_SECRET).verify(token).unwrap();

    assert_eq!(identity.role, Role::User);
    assert_eq!(
        identity.user_id,
        Id::from(created["data"]["id"].as_u64().unwrap())
    );
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = test_app().await;

    signup(&app, "Norma", "norma@example.com", "user").await;

    let (wrong_password_status, wrong_password) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(&json!({ "email": "norma@example.com", "password": "nope" })),
        ),
    )
    .await;
    let (unknown_email_status, unknown_email) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(&json!({ "email": "ghost@example.com", "password": PASSWORD })),
        ),
    )
    .await;

    assert_eq!(wrong_password_status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_email_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password["message"], json!("Invalid credentials"));
    assert_eq!(wrong_password["error"], json!("invalid_credentials"));
}

#[tokio::test]
async fn missing_and_garbage_tokens_are_unauthorized() {
    let app = test_app().await;

    let (missing_status, missing) = send(
        &app,
        request(Method::GET, "/api/user/getuserposts", None, None),
    )
    .await;
    let (garbage_status, garbage) = send(
        &app,
        request(
            Method::GET,
            "/api/user/getuserposts",
            Some("not-a-token"),
            None,
        ),
    )
    .await;

    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing["error"], json!("unauthorized"));
    assert_eq!(garbage_status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage["error"], json!("unauthorized"));
}

#[tokio::test]
async fn admin_tokens_do_not_pass_user_gates() {
    let app = test_app().await;

    let token = admin_token(&app, "agnes@example.com").await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/user/getuserposts", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Access Denied"));
    assert_eq!(body["error"], json!("access_denied"));
}

#[tokio::test]
async fn user_tokens_do_not_pass_the_admin_gate() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/admin/reportedposts", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("access_denied"));
}

#[tokio::test]
async fn unknown_routes_reply_with_the_envelope() {
    let app = test_app().await;

    let (status, body) = send(&app, request(Method::GET, "/api/nope", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn created_posts_show_in_the_feed() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    let created = create_post(&app, &token, "Hello", &json!({ "tags": ["intro"] })).await;

    assert_eq!(created["message"], json!("Post created successfully"));

    let (status, body) = send(&app, request(Method::GET, "/api/post/getallpost", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], json!("Hello"));
    assert_eq!(posts[0]["tags"], json!(["intro"]));
    assert_eq!(posts[0]["author"]["firstName"], json!("Norma"));
}

#[tokio::test]
async fn drafts_stay_out_of_the_feed_until_published() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    let created = create_post(&app, &token, "Draft", &json!({ "isDraft": true })).await;

    assert_eq!(created["message"], json!("Draft saved successfully"));

    let (_, feed) = send(&app, request(Method::GET, "/api/post/getallpost", None, None)).await;
    assert_eq!(feed["data"].as_array().unwrap().len(), 0);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/post/publishdraft",
            Some(&token),
            Some(&json!({ "postId": created["data"]["id"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, feed) = send(&app, request(Method::GET, "/api/post/getallpost", None, None)).await;
    assert_eq!(feed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_the_author_publishes_a_draft() {
    let app = test_app().await;

    let author = user_token(&app, "norma@example.com").await;
    let other = user_token(&app, "other@example.com").await;
    let created = create_post(&app, &author, "Draft", &json!({ "isDraft": true })).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/post/publishdraft",
            Some(&other),
            Some(&json!({ "postId": created["data"]["id"] })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("access_denied"));
}

#[tokio::test]
async fn posts_require_an_existing_community() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/post/createpost",
            Some(&token),
            Some(&json!({
                "title": "Orphan",
                "banner": "https://images.example/banner.png",
                "content": "Words.",
                "communityId": 1,
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn likes_round_trip_and_repeats_conflict() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    let created = create_post(&app, &token, "Likeable", &json!({})).await;
    let body = json!({ "postId": created["data"]["id"] });

    let (status, liked) = send(
        &app,
        request(Method::POST, "/api/posts/addlike", Some(&token), Some(&body)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["data"]["likes"], json!(1));

    let (status, repeat) = send(
        &app,
        request(Method::POST, "/api/posts/addlike", Some(&token), Some(&body)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(repeat["message"], json!("You have already liked this post"));
    assert_eq!(repeat["error"], json!("conflict"));

    let (status, unliked) = send(
        &app,
        request(Method::POST, "/api/posts/removelike", Some(&token), Some(&body)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unliked["data"]["likes"], json!(0));

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/posts/removelike", Some(&token), Some(&body)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reports_carry_the_tally_and_statuses_follow() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    let created = create_post(&app, &token, "Suspicious", &json!({})).await;
    let post_id = &created["data"]["id"];

    let (status, reported) = send(
        &app,
        request(
            Method::POST,
            "/api/posts/reportpost",
            Some(&token),
            Some(&json!({ "postId": post_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reported["data"]["reportCount"], json!(1));
    assert_eq!(reported["data"]["isValid"], json!(true));

    let (_, report_status) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/posts/reportstatus/{post_id}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(report_status["data"]["reported"], json!(true));

    let (_, like_status) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/posts/likestatus/{post_id}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(like_status["data"]["liked"], json!(false));
}

#[tokio::test]
async fn tag_search_filters_and_requires_tags() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    create_post(&app, &token, "Rusty", &json!({ "tags": ["rust", "systems"] })).await;
    create_post(&app, &token, "Tasty", &json!({ "tags": ["cooking"] })).await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/post/getbytags?tags=rust,gardening", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], json!("Rusty"));

    let (status, body) = send(&app, request(Method::GET, "/api/post/getbytags", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("validation"));

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/post/getbytags?tags=%20,%20", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn community_post_listing_hides_drafts_and_404s_unknown_communities() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;

    let (status, created) = send(
        &app,
        request(
            Method::PUT,
            "/api/community/createcommunity",
            Some(&token),
            Some(&json!({
                "name": "rustaceans",
                "description": "All things crabs",
                "banner": "https://images.example/crab.png",
                "category": "tech",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let community_id = &created["data"]["id"];

    create_post(&app, &token, "Published", &json!({ "communityId": community_id })).await;
    create_post(
        &app,
        &token,
        "Hidden",
        &json!({ "communityId": community_id, "isDraft": true }),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/post/getcommunityposts/{community_id}"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], json!("Published"));

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/post/getcommunityposts/1", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn single_post_lookup_wraps_the_post_in_a_list() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    let created = create_post(&app, &token, "Solo", &json!({})).await;
    let post_id = &created["data"]["id"];

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/api/post/getpost/{post_id}"), None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], json!("Solo"));
}

#[tokio::test]
async fn malformed_path_ids_are_rejected() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/post/getpost/not-a-number", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("validation"));
}

#[tokio::test]
async fn deleted_posts_disappear() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    let created = create_post(&app, &token, "Doomed", &json!({})).await;
    let post_id = &created["data"]["id"];

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            "/api/post/deletepost",
            Some(&token),
            Some(&json!({ "postId": post_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/api/post/getpost/{post_id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn impressions_need_no_token() {
    let app = test_app().await;

    let token = user_token(&app, "norma@example.com").await;
    let created = create_post(&app, &token, "Viewed", &json!({})).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/post/addimpression",
            None,
            Some(&json!({ "postId": created["data"]["id"] })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["impressions"], json!(1));
}

#[tokio::test]
async fn community_membership_and_admin_rules() {
    let app = test_app().await;

    let admin = user_token(&app, "admin@example.com").await;
    let member = user_token(&app, "member@example.com").await;

    let (status, created) = send(
        &app,
        request(
            Method::PUT,
            "/api/community/createcommunity",
            Some(&admin),
            Some(&json!({
                "name": "rustaceans",
                "description": "All things crabs",
                "banner": "https://images.example/crab.png",
                "category": "tech",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["members"].as_array().unwrap().len(), 1);
    let community_id = &created["data"]["id"];

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/community/joinCommunity",
            Some(&member),
            Some(&json!({ "communityId": community_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/community/getcommunity/{community_id}"),
            None,
            None,
        ),
    )
    .await;
    let listing = detail["data"].as_array().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0]["members"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/community/leaveCommunity",
            Some(&admin),
            Some(&json!({ "communityId": community_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("The admin cannot leave their own community")
    );

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/community/updatename",
            Some(&member),
            Some(&json!({ "communityId": community_id, "name": "hijacked" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("access_denied"));

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            "/api/community/deletecommunity",
            Some(&admin),
            Some(&json!({ "communityId": community_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/community/getcommunity/{community_id}"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
