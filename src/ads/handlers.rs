use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    ads::{
        dto::{AdDto, AdResponse, IMAGE_URL_FIELD},
        options::{Options, OptionsError},
        repo_types::Ad,
        services::AdError,
    },
    auth::{extractors::AuthUser, middleware::require_auth},
    error::ApiError,
    state::AppState,
};

/// `/ads` is public; `/ads/` and `/publish` sit behind the bearer gate.
pub fn ad_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/ads/", get(list_owned))
        .route("/publish", post(publish))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/ads", get(list_public))
        .merge(protected)
}

impl From<AdError> for ApiError {
    fn from(err: AdError) -> Self {
        match err {
            AdError::NotFound => ApiError::NotFound(err.to_string()),
            AdError::SaveFailed(_) | AdError::Persistence(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<OptionsError> for ApiError {
    fn from(err: OptionsError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[instrument(skip(state))]
pub async fn list_public(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<AdResponse>>, ApiError> {
    let options = Options::from_query(&params)?;
    let ads = state.ads.list(&options).await?;
    Ok(Json(ads.iter().map(AdResponse::from).collect()))
}

#[instrument(
    skip(state, identity),
    fields(user_id = %identity.id, username = ?identity.username)
)]
pub async fn list_owned(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<AdResponse>>, ApiError> {
    let options = Options::from_query(&params)?;
    let ads = state.ads.list(&options).await?;

    let body = ads
        .iter()
        .map(|ad| {
            let mut resp = AdResponse::from(ad);
            resp.process_owner(ad, identity.id);
            resp
        })
        .collect();
    Ok(Json(body))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn publish(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<AdDto>, JsonRejection>,
) -> Result<(StatusCode, Json<AdResponse>), ApiError> {
    let Json(payload) = payload?;

    let mut errors = payload.validate().err().unwrap_or_default();
    // The URL is only fetched once it is well formed.
    if !errors.contains_key(IMAGE_URL_FIELD) {
        if let Err(e) = state.images.inspect(&payload.image_url).await {
            errors.insert(IMAGE_URL_FIELD.to_string(), e.to_string());
        }
    }
    if !errors.is_empty() {
        warn!(fields = ?errors.keys().collect::<Vec<_>>(), "publish validation failed");
        return Err(ApiError::Validation(errors));
    }

    let author = state
        .users
        .get_by_id(identity.id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let ad = Ad::new(
        payload.title,
        payload.text,
        payload.image_url,
        payload.price,
        &author,
    );
    state.ads.create(&ad).await?;

    Ok((StatusCode::CREATED, Json(AdResponse::from(&ad))))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Method, Request,
        },
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{app::build_app, images::services::StubImageInspector};

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, token);
        }
        let body = match body {
            Some(v) => {
                req = req.header(CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response {
        send(app, Method::GET, uri, token, None).await
    }

    async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response {
        send(app, Method::POST, uri, token, Some(body)).await
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Registers a user and returns the full `Authorization` header value.
    async fn register(app: &Router, username: &str) -> String {
        let creds = json!({ "username": username, "password": "Secr3t!23" });
        let res = post(app, "/api/register", None, creds).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        res.headers()[AUTHORIZATION].to_str().unwrap().to_owned()
    }

    fn ad_body(title: &str, price: f64) -> Value {
        json!({
            "title": title,
            "text": "Friendly cat looking for a new home.",
            "image_url": "https://example.com/cat.jpg",
            "price": price,
        })
    }

    #[tokio::test]
    async fn publish_then_list_marks_only_own_ads() {
        let app = build_app(AppState::fake());
        let alice = register(&app, "alice").await;
        let bob = register(&app, "bob").await;

        let res = post(&app, "/api/publish", Some(&alice), ad_body("Tabby cat", 100.0)).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = json_body(res).await;
        assert_eq!(created["username"], "alice");
        assert_eq!(created["title"], "Tabby cat");
        assert!(created.get("is_owner").is_none());

        let res = post(&app, "/api/publish", Some(&bob), ad_body("Ginger cat", 200.0)).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let uri = "/api/ads/?page=1&sort_by=price&order_by=1";
        let res = get(&app, uri, Some(&alice)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let listed = json_body(res).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
        assert_eq!(listed[0]["username"], "alice");
        assert_eq!(listed[0]["is_owner"], json!(true));
        assert_eq!(listed[1]["username"], "bob");
        assert_eq!(listed[1]["is_owner"], json!(false));

        let res = get(&app, "/api/ads?page=1", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let listed = json_body(res).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
        assert!(listed
            .as_array()
            .unwrap()
            .iter()
            .all(|ad| ad.get("is_owner").is_none()));
    }

    #[tokio::test]
    async fn single_author_sees_own_ad() {
        let app = build_app(AppState::fake());
        let alice = register(&app, "alice").await;

        let res = post(&app, "/api/publish", Some(&alice), ad_body("Tabby cat", 1500.5)).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = json_body(res).await;
        assert_eq!(created["price"], json!(1500.5));
        assert!(created.get("is_owner").is_none());

        let res = get(&app, "/api/ads/?page=1", Some(&alice)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let listed = json_body(res).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["is_owner"], json!(true));
        assert_eq!(listed[0]["username"], "alice");
    }

    #[tokio::test]
    async fn gated_routes_require_a_token() {
        let app = build_app(AppState::fake());

        let res = get(&app, "/api/ads/?page=1", None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(res).await,
            json!({ "error": "no authorization header in request" })
        );

        let res = post(
            &app,
            "/api/publish",
            Some("Bearer nonsense"),
            ad_body("Tabby cat", 1.0),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_listing_is_not_found() {
        let app = build_app(AppState::fake());
        let res = get(&app, "/api/ads?page=1", None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await, json!({ "error": "ads not found" }));
    }

    #[tokio::test]
    async fn bad_listing_options_are_bad_requests() {
        let app = build_app(AppState::fake());

        let res = get(&app, "/api/ads", None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(res).await,
            json!({ "error": "page must be greater than 0" })
        );

        let res = get(&app, "/api/ads?page=1&min_price=300&max_price=50", None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = get(&app, "/api/ads?page=1&min_price=300&max_price=0", None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = get(&app, "/api/ads?page=9223372036854775807", None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await, json!({ "error": "page is too large" }));
    }

    #[tokio::test]
    async fn publish_reports_field_errors() {
        let app = build_app(AppState::fake());
        let alice = register(&app, "alice").await;

        let body = json!({ "title": "cat", "image_url": "not a url", "price": 10 });
        let res = post(&app, "/api/publish", Some(&alice), body).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res).await;
        assert_eq!(body["errors"]["title"], "title must be at least 5 characters");
        assert_eq!(body["errors"]["text"], "text is required");
        assert_eq!(
            body["errors"]["image_url"],
            "image_url must be a valid http(s) url"
        );
        assert!(body["errors"].get("price").is_none());
    }

    #[tokio::test]
    async fn rejected_image_is_reported_under_image_url() {
        let app = build_app(AppState::fake_with_images(Arc::new(
            StubImageInspector::rejecting(),
        )));
        let alice = register(&app, "alice").await;

        let res = post(&app, "/api/publish", Some(&alice), ad_body("Tabby cat", 100.0)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res).await;
        assert_eq!(
            body["errors"]["image_url"],
            "error - invalid image format: unknown image format"
        );
    }
}
