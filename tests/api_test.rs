// Integration tests for the REST endpoints under /api
//
// Every request goes through the full router: session lookup, permission
// checks, projection and error rendering.

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::app::body_json;
use helpers::{ArticleBuilder, CategoryBuilder, TestApp, UserBuilder};
use serde_json::json;

/// Staff admin plus two ordinary authors, all with password "password123"
struct Fixture {
    app: TestApp,
    admin: blogger::storage::User,
    alice: blogger::storage::User,
    bob: blogger::storage::User,
}

impl Fixture {
    async fn new() -> Self {
        let app = TestApp::new().await;
        let db = app.db.connection();
        let admin = UserBuilder::new("admin").staff().create(db).await;
        let alice = UserBuilder::new("alice")
            .with_email("alice@example.com")
            .create(db)
            .await;
        let bob = UserBuilder::new("bob").create(db).await;
        Self {
            app,
            admin,
            alice,
            bob,
        }
    }
}

#[tokio::test]
async fn test_staff_manage_categories() {
    let fx = Fixture::new().await;
    let admin = fx.app.login("admin", "password123").await;
    let alice = fx.app.login("alice", "password123").await;

    let created = fx
        .app
        .request(
            Method::POST,
            "/api/categories/",
            Some(json!({"name": "Tech"})),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let category = body_json(created).await;
    assert_eq!(category["name"], "Tech");
    assert_eq!(category["articles"], json!([]));

    let denied = fx
        .app
        .request(
            Method::POST,
            "/api/categories/",
            Some(json!({"name": "Travel"})),
            Some(&alice),
        )
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert!(body_json(denied).await["detail"].is_string());

    let anonymous = fx
        .app
        .request(
            Method::POST,
            "/api/categories/",
            Some(json!({"name": "Travel"})),
            None,
        )
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let duplicate = fx
        .app
        .request(
            Method::POST,
            "/api/categories/",
            Some(json!({"name": "Tech"})),
            Some(&admin),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(duplicate).await["name"].is_array());

    let uri = format!("/api/categories/{}/", category["id"]);
    let deleted = fx
        .app
        .request(Method::DELETE, &uri, None, Some(&admin))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(fx.app.get(&uri, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_filter_is_case_insensitive() {
    let fx = Fixture::new().await;
    let db = fx.app.db.connection();
    for name in ["Tech", "Biotechnology", "Travel"] {
        CategoryBuilder::new(name).create(db, &fx.admin).await;
    }

    let response = fx.app.get("/api/categories/?name=TECH", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let names: Vec<_> = body_json(response)
        .await
        .as_array()
        .expect("Expected a list")
        .iter()
        .map(|c| c["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Tech", "Biotechnology"]);

    let none = fx.app.get("/api/categories/?name=%25", None).await;
    assert_eq!(body_json(none).await, json!([]));
}

#[tokio::test]
async fn test_list_is_reduced_and_detail_is_full() {
    let fx = Fixture::new().await;
    let db = fx.app.db.connection();
    let tech = CategoryBuilder::new("Tech").create(db, &fx.admin).await;
    let article = ArticleBuilder::new("Rust in production", &tech)
        .with_body("Ownership all the way down.")
        .create(db, &fx.alice)
        .await;

    let list = body_json(fx.app.get("/api/articles/", None).await).await;
    assert_eq!(
        list,
        json!([{"id": article.id, "title": "Rust in production", "author": fx.alice.id}])
    );

    let detail = body_json(
        fx.app
            .get(&format!("/api/articles/{}/", article.id), None)
            .await,
    )
    .await;
    assert_eq!(detail["body"], "Ownership all the way down.");
    assert_eq!(detail["category"], tech.id);
    assert!(detail["created_at"].is_i64());
    assert!(detail["updated_at"].is_i64());

    let categories = body_json(fx.app.get("/api/categories/", None).await).await;
    assert_eq!(categories, json!([{"id": tech.id, "name": "Tech"}]));
    let category = body_json(
        fx.app
            .get(&format!("/api/categories/{}/", tech.id), None)
            .await,
    )
    .await;
    assert_eq!(category["articles"], json!([article.id]));
}

#[tokio::test]
async fn test_article_author_is_the_requester() {
    let fx = Fixture::new().await;
    let tech = CategoryBuilder::new("Tech")
        .create(fx.app.db.connection(), &fx.admin)
        .await;
    let alice = fx.app.login("alice", "password123").await;

    let response = fx
        .app
        .request(
            Method::POST,
            "/api/articles/",
            Some(json!({
                "title": "Hello",
                "body": "First post",
                "category": tech.id,
                "author": fx.bob.id
            })),
            Some(&alice),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let article = body_json(response).await;
    assert_eq!(article["author"], fx.alice.id);
}

#[tokio::test]
async fn test_anonymous_cannot_create_article() {
    let fx = Fixture::new().await;
    let tech = CategoryBuilder::new("Tech")
        .create(fx.app.db.connection(), &fx.admin)
        .await;

    let response = fx
        .app
        .request(
            Method::POST,
            "/api/articles/",
            Some(json!({"title": "Hello", "body": "x", "category": tech.id})),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_article_validation_errors() {
    let fx = Fixture::new().await;
    let alice = fx.app.login("alice", "password123").await;

    let response = fx
        .app
        .request(
            Method::POST,
            "/api/articles/",
            Some(json!({"title": "", "category": 999})),
            Some(&alice),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let errors = body_json(response).await;
    assert!(errors["title"].is_array());
    assert_eq!(errors["body"], json!(["This field is required."]));
    assert_eq!(
        errors["category"],
        json!(["Invalid pk \"999\" - object does not exist."])
    );

    let malformed = fx
        .app
        .request(
            Method::POST,
            "/api/articles/",
            Some(json!("not an object")),
            Some(&alice),
        )
        .await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(malformed).await["non_field_errors"].is_array());
}

#[tokio::test]
async fn test_only_author_may_change_article() {
    let fx = Fixture::new().await;
    let db = fx.app.db.connection();
    let tech = CategoryBuilder::new("Tech").create(db, &fx.admin).await;
    let article = ArticleBuilder::new("Mine", &tech).create(db, &fx.alice).await;
    let uri = format!("/api/articles/{}/", article.id);

    let alice = fx.app.login("alice", "password123").await;
    let bob = fx.app.login("bob", "password123").await;
    let admin = fx.app.login("admin", "password123").await;

    let patch = json!({"title": "Edited"});
    for cookie in [&bob, &admin] {
        let denied = fx
            .app
            .request(Method::PATCH, &uri, Some(patch.clone()), Some(cookie))
            .await;
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }
    let anonymous = fx
        .app
        .request(Method::PATCH, &uri, Some(patch.clone()), None)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let edited = fx
        .app
        .request(Method::PATCH, &uri, Some(patch), Some(&alice))
        .await;
    assert_eq!(edited.status(), StatusCode::OK);
    let edited = body_json(edited).await;
    assert_eq!(edited["title"], "Edited");
    assert_eq!(edited["body"], "Lorem ipsum dolor sit amet.");

    // PUT replaces, so omitted fields are required
    let incomplete = fx
        .app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"title": "Only title"})),
            Some(&alice),
        )
        .await;
    assert_eq!(incomplete.status(), StatusCode::BAD_REQUEST);

    let bob_delete = fx.app.request(Method::DELETE, &uri, None, Some(&bob)).await;
    assert_eq!(bob_delete.status(), StatusCode::FORBIDDEN);
    let alice_delete = fx
        .app
        .request(Method::DELETE, &uri, None, Some(&alice))
        .await;
    assert_eq!(alice_delete.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_missing_article_is_not_found_before_owner_check() {
    let fx = Fixture::new().await;
    let bob = fx.app.login("bob", "password123").await;

    let missing = fx
        .app
        .request(
            Method::PATCH,
            "/api/articles/4242/",
            Some(json!({"title": "x"})),
            Some(&bob),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let garbage = fx.app.get("/api/articles/not-a-number/", None).await;
    assert_eq!(garbage.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authors_are_read_only() {
    let fx = Fixture::new().await;
    let db = fx.app.db.connection();
    let tech = CategoryBuilder::new("Tech").create(db, &fx.admin).await;
    let article = ArticleBuilder::new("Hello", &tech).create(db, &fx.alice).await;
    let admin = fx.app.login("admin", "password123").await;

    let post = fx
        .app
        .request(
            Method::POST,
            "/api/authors/",
            Some(json!({"username": "mallory"})),
            Some(&admin),
        )
        .await;
    assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);

    let uri = format!("/api/authors/{}/", fx.alice.id);
    let delete = fx.app.request(Method::DELETE, &uri, None, Some(&admin)).await;
    assert_eq!(delete.status(), StatusCode::METHOD_NOT_ALLOWED);

    let filtered = body_json(fx.app.get("/api/authors/?username=LIC", None).await).await;
    assert_eq!(filtered, json!([{"id": fx.alice.id, "username": "alice"}]));

    let detail = body_json(fx.app.get(&uri, None).await).await;
    assert_eq!(detail["email"], "alice@example.com");
    assert_eq!(detail["articles"], json!([article.id]));
    assert!(detail.get("password_hash").is_none());

    assert_eq!(
        fx.app.get("/api/authors/9999/", None).await.status(),
        StatusCode::NOT_FOUND
    );
}
