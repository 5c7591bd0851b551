use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use linkbio::config::Config;
use linkbio::net::http::router;
use linkbio::{Registry, Repos};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let config = Config {
        admin_emails: vec!["root@example.com".into()],
        ..Config::default()
    };
    router(Arc::new(Registry::new(Repos::memory(), Arc::new(config))))
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn signup(app: &Router, email: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn username_check_reports_feedback() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/username/check?username=John%20Doe", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sanitized"], "john-doe");
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["preview"], "123l.ink/john-doe");
    assert_eq!(body["available"], true);
    assert_eq!(
        body["transformation"],
        "Automatically converted to lowercase, spaces replaced with dashes"
    );

    let (_, body) = call(&app, "GET", "/api/username/check?username=admin", None, None).await;
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["message"], "This username is reserved and cannot be used");
}

#[tokio::test]
async fn profile_and_links_flow() {
    let app = app();
    let token = signup(&app, "ada@example.com").await;

    let (status, _) = call(&app, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, profile) = call(
        &app,
        "POST",
        "/api/profile",
        Some(&token),
        Some(json!({ "username": "Ada Lovelace", "display_name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["username"], "ada-lovelace");

    for (title, url) in [("Blog", "ada.example.com"), ("Notes", "https://notes.example.com")] {
        let (status, _) = call(
            &app,
            "POST",
            "/api/links",
            Some(&token),
            Some(json!({ "title": title, "url": url })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, links) = call(
        &app,
        "POST",
        "/api/links/reorder",
        Some(&token),
        Some(json!({ "from": 1, "to": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(links[0]["title"], "Notes");

    let (status, page) = call(&app, "GET", "/api/profiles/ada-lovelace", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["profile"]["display_name"], "Ada");
    assert_eq!(page["links"][1]["url"], "https://ada.example.com");

    let (status, _) = call(
        &app,
        "PATCH",
        "/api/profile",
        Some(&token),
        Some(json!({ "bio": "First programmer" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, saved) = call(&app, "POST", "/api/profile/flush", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["bio"], "First programmer");
}

#[tokio::test]
async fn setup_form_is_prefilled_from_name_or_email() {
    let app = app();
    let token = signup(&app, "grace_h@example.com").await;

    let (status, body) = call(&app, "GET", "/api/profile/suggestion", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sanitized"], "grace-h");
    assert_eq!(body["available"], true);
    assert_eq!(body["preview"], "123l.ink/grace-h");

    let (_, body) = call(
        &app,
        "GET",
        "/api/profile/suggestion?name=Grace%20Hopper",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["sanitized"], "grace-hopper");

    let (status, _) = call(&app, "GET", "/api/profile/suggestion", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // leaving the username blank takes the suggestion
    let (status, profile) = call(&app, "POST", "/api/profile", Some(&token), Some(json!({ "username": " " }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["username"], "grace-h");

    let (_, body) = call(&app, "GET", "/api/profile/suggestion", Some(&token), None).await;
    assert_eq!(body["available"], false);
}

#[tokio::test]
async fn requests_without_session_are_rejected() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = call(&app, "GET", "/api/links", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_endpoints_require_allow_listed_email() {
    let app = app();
    let user = signup(&app, "ada@example.com").await;
    let root = signup(&app, "root@example.com").await;

    let (status, body) = call(&app, "GET", "/api/admin/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let (status, users) = call(&app, "GET", "/api/admin/users", Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    let ada_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "ada@example.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = call(&app, "DELETE", &format!("/api/admin/users/{ada_id}"), Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // the deleted user's session is gone as well
    let (status, _) = call(&app, "GET", "/api/profile", Some(&user), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_redirects_and_sets_cookie() {
    let app = app();
    let (_, grant) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "ada@example.com", "password": "secret1" })),
    )
    .await;
    let code = grant["code"].as_str().unwrap();

    let req = Request::builder()
        .uri(format!("/auth/callback?code={code}&flow=signup"))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        res.headers()[header::LOCATION],
        "https://123l.ink/auth/setup-profile"
    );
    assert!(res.headers().contains_key(header::SET_COOKIE));

    let req = Request::builder()
        .uri("/auth/callback?next=https://evil.example")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.headers()[header::LOCATION], "https://123l.ink/");

    // a decoded newline would make the header unsendable
    let req = Request::builder()
        .uri("/auth/callback?next=/a%0D%0ASet-Cookie:%20x=1")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()[header::LOCATION], "https://123l.ink/");
}

#[tokio::test]
async fn sitemap_is_xml() {
    let app = app();
    let req = Request::builder().uri("/sitemap.xml").body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/xml");
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(xml.contains("<loc>https://123l.ink/auth/setup-profile</loc>"));
}
