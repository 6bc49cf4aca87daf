use super::error::*;
use super::handler;
use crate::application_port::AuthService;
use crate::domain_model::UserId;
use crate::server::Server;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::path!("auth" / "signup")
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    // Path before method so an unknown verb on /countries is a 405, not a 404.
    let upsert_country = countries()
        .and(warp::post())
        .and(with_verification(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.country_status_service.clone()))
        .and_then(handler::upsert_country);

    let list_countries = countries()
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(warp::query::<handler::OwnerQuery>())
        .and(with(server.country_status_service.clone()))
        .and_then(handler::list_countries);

    let set_country_status = countries()
        .and(warp::put())
        .and(with_verification(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.country_status_service.clone()))
        .and_then(handler::set_country_status);

    let delete_country = countries()
        .and(warp::delete())
        .and(with_verification(server.auth_service.clone()))
        .and(warp::query::<handler::DeleteCountryQuery>())
        .and(with(server.country_status_service.clone()))
        .and_then(handler::delete_country);

    signup
        .or(login)
        .or(upsert_country)
        .or(list_countries)
        .or(set_country_status)
        .or(delete_country)
}

fn countries() -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::path("countries").and(warp::path::end())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth_service = auth_service.clone();
        async move {
            let Some(token) = header.as_deref().and_then(bearer_token) else {
                return Err(reject::custom(ApiError::from(ApiErrorCode::InvalidToken)));
            };
            let user_id = auth_service
                .verify_token(token.trim())
                .await
                .map_err(ApiError::from)
                .map_err(reject::custom)?;
            Ok(user_id)
        }
    })
}

/// The auth scheme name is case-insensitive; the credentials are not.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

#[cfg(test)]
mod tests {
    use crate::api;
    use crate::server::Server;
    use crate::test_support::test_auth_settings;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use warp::Filter;
    use warp::http::StatusCode;

    fn app() -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible>
    + Clone
    + 'static {
        let server = Server::in_memory(&test_auth_settings()).unwrap();
        api::app(Arc::new(server))
    }

    fn body(resp: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    async fn signup<F>(app: &F, username: &str) -> (String, i64)
    where
        F: Filter + 'static,
        F::Extract: warp::Reply + Send,
    {
        let resp = warp::test::request()
            .method("POST")
            .path("/auth/signup")
            .json(&json!({"username": username, "password": "pw"}))
            .reply(app)
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body(&resp);
        (
            body["token"].as_str().unwrap().to_string(),
            body["userId"].as_i64().unwrap(),
        )
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_in_place() {
        let app = app();
        let (token, user_id) = signup(&app, "alice").await;
        let bearer = format!("Bearer {token}");

        let created = warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"userId": user_id, "isoCode": "JPN", "status": "visited", "countryName": "Japan"}))
            .reply(&app)
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = body(&created);
        assert_eq!(created["isoCode"], "JPN");
        assert_eq!(created["status"], "visited");
        assert_eq!(created["userId"], user_id);

        let updated = warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"isoCode": "jpn", "status": "planned", "countryName": "Japan"}))
            .reply(&app)
            .await;
        assert_eq!(updated.status(), StatusCode::OK);
        let updated = body(&updated);
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["status"], "planned");

        let listed = warp::test::request()
            .method("GET")
            .path(&format!("/countries?userId={user_id}"))
            .header("authorization", &bearer)
            .reply(&app)
            .await;
        assert_eq!(listed.status(), StatusCode::OK);
        assert_eq!(
            body(&listed),
            json!([{"id": created["id"], "userId": user_id, "isoCode": "JPN", "name": "Japan", "status": "planned"}])
        );
    }

    #[tokio::test]
    async fn put_changes_status_by_id() {
        let app = app();
        let (token, _) = signup(&app, "alice").await;
        let bearer = format!("Bearer {token}");

        let created = warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"isoCode": "KEN", "status": "planned"}))
            .reply(&app)
            .await;
        let id = body(&created)["id"].clone();

        let updated = warp::test::request()
            .method("PUT")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"id": id, "status": "visited"}))
            .reply(&app)
            .await;
        assert_eq!(updated.status(), StatusCode::OK);
        assert_eq!(body(&updated)["status"], "visited");

        let missing = warp::test::request()
            .method("PUT")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"id": 9999, "status": "visited"}))
            .reply(&app)
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&missing)["error"], "NotFound");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let app = app();
        let (token, _) = signup(&app, "alice").await;
        let bearer = format!("Bearer {token}");

        let created = warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"isoCode": "FRA", "status": "visited"}))
            .reply(&app)
            .await;
        let id = body(&created)["id"].as_i64().unwrap();

        for _ in 0..2 {
            let resp = warp::test::request()
                .method("DELETE")
                .path(&format!("/countries?id={id}"))
                .header("authorization", &bearer)
                .reply(&app)
                .await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }

        let listed = warp::test::request()
            .method("GET")
            .path("/countries")
            .header("authorization", &bearer)
            .reply(&app)
            .await;
        assert_eq!(body(&listed), json!([]));
    }

    #[tokio::test]
    async fn unsupported_method_is_405() {
        let app = app();
        let (token, _) = signup(&app, "alice").await;

        let resp = warp::test::request()
            .method("PATCH")
            .path("/countries")
            .header("authorization", format!("Bearer {token}"))
            .reply(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body(&resp)["error"], "MethodNotAllowed");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let resp = warp::test::request()
            .method("GET")
            .path("/nowhere")
            .reply(&app())
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn country_routes_need_a_token() {
        let app = app();

        let missing = warp::test::request()
            .method("GET")
            .path("/countries")
            .reply(&app)
            .await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&missing)["error"], "InvalidToken");

        let garbage = warp::test::request()
            .method("GET")
            .path("/countries")
            .header("authorization", "Bearer not-a-jwt")
            .reply(&app)
            .await;
        assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn naming_another_user_is_forbidden() {
        let app = app();
        let (token, user_id) = signup(&app, "alice").await;
        let bearer = format!("Bearer {token}");

        let post = warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"userId": user_id + 1, "isoCode": "JPN", "status": "visited"}))
            .reply(&app)
            .await;
        assert_eq!(post.status(), StatusCode::FORBIDDEN);

        let list = warp::test::request()
            .method("GET")
            .path(&format!("/countries?userId={}", user_id + 1))
            .header("authorization", &bearer)
            .reply(&app)
            .await;
        assert_eq!(list.status(), StatusCode::FORBIDDEN);
        assert_eq!(body(&list)["error"], "Forbidden");
    }

    #[tokio::test]
    async fn users_see_only_their_own_rows() {
        let app = app();
        let (alice, _) = signup(&app, "alice").await;
        let (bob, _) = signup(&app, "bob").await;

        warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", format!("Bearer {alice}"))
            .json(&json!({"isoCode": "NOR", "status": "visited"}))
            .reply(&app)
            .await;

        let listed = warp::test::request()
            .method("GET")
            .path("/countries")
            .header("authorization", format!("Bearer {bob}"))
            .reply(&app)
            .await;
        assert_eq!(body(&listed), json!([]));
    }

    #[tokio::test]
    async fn bad_country_input_is_a_validation_error() {
        let app = app();
        let (token, _) = signup(&app, "alice").await;
        let bearer = format!("Bearer {token}");

        for payload in [
            json!({"status": "visited"}),
            json!({"isoCode": "JPN"}),
            json!({"isoCode": "JPN", "status": "someday"}),
            json!({"isoCode": "JAPAN", "status": "visited"}),
        ] {
            let resp = warp::test::request()
                .method("POST")
                .path("/countries")
                .header("authorization", &bearer)
                .json(&payload)
                .reply(&app)
                .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body(&resp)["error"], "ValidationError");
        }

        let no_id = warp::test::request()
            .method("DELETE")
            .path("/countries")
            .header("authorization", &bearer)
            .reply(&app)
            .await;
        assert_eq!(no_id.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let app = app();
        signup(&app, "alice").await;

        let resp = warp::test::request()
            .method("POST")
            .path("/auth/signup")
            .json(&json!({"username": "alice", "password": "other"}))
            .reply(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&resp)["error"], "DuplicateUsername");
    }

    #[tokio::test]
    async fn signup_without_password_is_a_validation_error() {
        let resp = warp::test::request()
            .method("POST")
            .path("/auth/signup")
            .json(&json!({"username": "alice"}))
            .reply(&app())
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&resp)["error"], "ValidationError");
    }

    #[tokio::test]
    async fn login_failures_look_the_same() {
        let app = app();
        signup(&app, "alice").await;

        let wrong_password = warp::test::request()
            .method("POST")
            .path("/auth/login")
            .json(&json!({"username": "alice", "password": "nope"}))
            .reply(&app)
            .await;
        let unknown_user = warp::test::request()
            .method("POST")
            .path("/auth/login")
            .json(&json!({"username": "mallory", "password": "nope"}))
            .reply(&app)
            .await;

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&wrong_password), body(&unknown_user));
    }

    #[tokio::test]
    async fn login_returns_a_working_token() {
        let app = app();
        let (_, user_id) = signup(&app, "alice").await;

        let resp = warp::test::request()
            .method("POST")
            .path("/auth/login")
            .json(&json!({"username": "alice", "password": "pw"}))
            .reply(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let session = body(&resp);
        assert_eq!(session["userId"], user_id);

        let listed = warp::test::request()
            .method("GET")
            .path("/countries")
            .header(
                "authorization",
                format!("Bearer {}", session["token"].as_str().unwrap()),
            )
            .reply(&app)
            .await;
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn put_accepts_an_id_sent_as_a_string() {
        let app = app();
        let (token, user_id) = signup(&app, "alice").await;
        let bearer = format!("Bearer {token}");

        let created = warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"isoCode": "KEN", "status": "planned"}))
            .reply(&app)
            .await;
        let id = body(&created)["id"].as_i64().unwrap();

        let updated = warp::test::request()
            .method("PUT")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"id": id.to_string(), "status": "visited", "userId": user_id.to_string()}))
            .reply(&app)
            .await;
        assert_eq!(updated.status(), StatusCode::OK);
        assert_eq!(body(&updated)["id"], id);
        assert_eq!(body(&updated)["status"], "visited");

        let garbled = warp::test::request()
            .method("PUT")
            .path("/countries")
            .header("authorization", &bearer)
            .json(&json!({"id": "one", "status": "visited"}))
            .reply(&app)
            .await;
        assert_eq!(garbled.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&garbled)["message"], "id must be an integer");
    }

    #[tokio::test]
    async fn malformed_body_gets_a_fixed_message() {
        let app = app();
        let (token, _) = signup(&app, "alice").await;

        let resp = warp::test::request()
            .method("POST")
            .path("/countries")
            .header("authorization", format!("Bearer {token}"))
            .json(&json!({"isoCode": 5, "status": "visited"}))
            .reply(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&resp),
            json!({"error": "ValidationError", "message": "malformed request body"})
        );
    }

    #[tokio::test]
    async fn auth_scheme_is_case_insensitive() {
        let app = app();
        let (token, _) = signup(&app, "alice").await;

        for scheme in ["bearer", "BEARER", "Bearer"] {
            let resp = warp::test::request()
                .method("GET")
                .path("/countries")
                .header("authorization", format!("{scheme} {token}"))
                .reply(&app)
                .await;
            assert_eq!(resp.status(), StatusCode::OK, "{scheme}");
        }

        let basic = warp::test::request()
            .method("GET")
            .path("/countries")
            .header("authorization", format!("Basic {token}"))
            .reply(&app)
            .await;
        assert_eq!(basic.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_splits_scheme_from_credentials() {
        assert_eq!(super::bearer_token("bearer abc.def"), Some("abc.def"));
        assert_eq!(super::bearer_token("Token abc"), None);
        assert_eq!(super::bearer_token("Bearer"), None);
    }
}
