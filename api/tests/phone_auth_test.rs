mod common;

use std::time::Duration;

use actix_web::{http::header, http::StatusCode, test};
use serde_json::json;

use common::{read_json, session_path, test_config, test_state, CODE, PHONE};
use ds_api::create_app;

macro_rules! app {
    ($state:expr) => {
        test::init_service(create_app($state.clone())).await
    };
}

macro_rules! open_session {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/phone-auth/sessions")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = read_json(resp).await;
        body["data"]["session_id"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn test_create_session() {
    let state = test_state(test_config());
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/phone-auth/sessions")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = read_json(resp).await;
    let id = body["data"]["session_id"].as_str().unwrap();
    assert_eq!(body["data"]["status"], "awaiting-submission");
    assert_eq!(body["data"]["cooldown_remaining"], 0);
    assert_eq!(body["data"]["auto_capture_supported"], false);
    assert_eq!(
        body["data"]["bot_check_container"],
        format!("recaptcha-container-signup:{}", id)
    );
    assert_eq!(state.session_count(), 1);
}

#[actix_web::test]
async fn test_send_code_then_verify() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["resend_after"], 60);
    assert_eq!(body["data"]["phone_number"], "+91****3210");
    assert_eq!(body["data"]["auto_capture"], false);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/verify"))
        .set_json(json!({ "code": CODE }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["verified"], true);
    assert_eq!(body["data"]["identity"]["phone_number"], PHONE);
    assert_eq!(body["data"]["redirect_to"], "/select-role");
    assert_eq!(body["message"], "Phone verified successfully!");

    // The verified session is discarded along with its widget
    assert_eq!(state.session_count(), 0);
    assert!(!state
        .bot_check()
        .is_rendered(&format!("recaptcha-container-signup:{}", id)));
    let req = test::TestRequest::get().uri(&session_path(&id, "")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_wrong_code_then_right_code() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/verify"))
        .set_json(json!({ "code": "000000" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["error"], "VERIFICATION_CODE_INVALID");
    assert_eq!(body["message"], "Invalid code. Please try again.");

    let req = test::TestRequest::get().uri(&session_path(&id, "")).to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["rejected_attempts"], 1);

    // The same rejected code is not sent to the provider again
    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/verify"))
        .set_json(json!({ "code": "000000" }))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["verified"], false);
    assert_eq!(body["data"]["skipped"], "duplicate-code");

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/verify"))
        .set_json(json!({ "code": CODE }))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["verified"], true);
}

#[actix_web::test]
async fn test_resend_blocked_during_cooldown() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .insert_header((header::ACCEPT_LANGUAGE, "hi-IN,hi;q=0.9"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = read_json(resp).await;
    assert_eq!(body["error"], "COOLDOWN_ACTIVE");
    let remaining = body["details"]["remaining_seconds"].as_u64().unwrap();
    assert!(remaining > 0 && remaining <= 60);
    assert_eq!(
        body["message"],
        format!("कृपया प्रतीक्षा करें। आप {} सेकंड में कोड फिर से भेज सकते हैं।", remaining)
    );
}

#[actix_web::test]
async fn test_dispatch_failure_still_starts_cooldown() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": "+15555550100" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(resp).await;
    assert_eq!(body["error"], "DISPATCH_FAILED");
    assert_eq!(body["message"], "Failed to send code. Please try again later.");

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[actix_web::test]
async fn test_missing_phone_number() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": "  " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(resp).await["error"], "PHONE_REQUIRED");
}

#[actix_web::test]
async fn test_verify_before_requesting_code() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/verify"))
        .set_json(json!({ "code": CODE }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(read_json(resp).await["error"], "NO_ACTIVE_CHALLENGE");
}

#[actix_web::test]
async fn test_reload_keeps_cooldown() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // The client reloads and restores its session id
    let req = test::TestRequest::post()
        .uri("/api/v1/phone-auth/sessions")
        .set_json(json!({ "session_id": id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["session_id"], id.as_str());
    assert_eq!(body["data"]["status"], "awaiting-submission");
    assert!(body["data"]["cooldown_remaining"].as_u64().unwrap() > 0);
    assert_eq!(state.session_count(), 1);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[actix_web::test]
async fn test_selected_role_decides_redirect() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::put()
        .uri(&session_path(&id, "/role"))
        .set_json(json!({ "role": "driver" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        read_json(resp).await["data"]["redirect_to"],
        "/driver/complete-profile?verified=true"
    );

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/verify"))
        .set_json(json!({ "code": CODE }))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["redirect_to"], "/driver/complete-profile?verified=true");
}

#[actix_web::test]
async fn test_code_input_confirms_at_full_length() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&session_path(&id, "/code-input"))
        .set_json(json!({ "value": "123" }))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["verified"], false);
    assert_eq!(body["data"]["skipped"], "incomplete");

    let req = test::TestRequest::put()
        .uri(&session_path(&id, "/code-input"))
        .set_json(json!({ "value": "123 456" }))
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["verified"], true);
}

#[actix_web::test]
async fn test_change_phone_returns_to_entry() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .set_json(json!({ "phone": PHONE }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/change-phone"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["data"]["status"], "awaiting-submission");
    assert_eq!(body["data"]["has_challenge"], false);
    assert!(body["data"]["cooldown_remaining"].as_u64().unwrap() > 0);
}

#[actix_web::test]
async fn test_delete_session() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::delete().uri(&session_path(&id, "")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri(&session_path(&id, "")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(resp).await["error"], "SESSION_NOT_FOUND");

    let req = test::TestRequest::delete().uri(&session_path(&id, "")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_malformed_body_is_validation_error() {
    let state = test_state(test_config());
    let app = app!(state);
    let id = open_session!(app);

    let req = test::TestRequest::post()
        .uri(&session_path(&id, "/code"))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"phone\": 42")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(resp).await["error"], "VALIDATION_ERROR");
}

#[actix_web::test]
async fn test_health_and_unknown_route() {
    let state = test_state(test_config());
    let app = app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["status"], "healthy");

    let req = test::TestRequest::get()
        .uri("/api/v2/nothing")
        .insert_header((header::ACCEPT_LANGUAGE, "or"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(resp).await["message"], "ଅନୁରୋଧିତ ସମ୍ବଳ ମିଳିଲା ନାହିଁ।");
}

#[actix_web::test]
async fn test_idle_sessions_are_evicted() {
    let state = test_state(test_config());
    let app = app!(state);
    let idle = open_session!(app);

    assert_eq!(state.evict_idle(Duration::from_secs(60)).await, 0);
    assert_eq!(state.session_count(), 1);

    tokio::time::sleep(Duration::from_millis(30)).await;
    let active = open_session!(app);
    assert_eq!(state.evict_idle(Duration::from_millis(20)).await, 1);
    assert_eq!(state.session_count(), 1);
    assert!(!state
        .bot_check()
        .is_rendered(&format!("recaptcha-container-signup:{}", idle)));

    let req = test::TestRequest::get().uri(&session_path(&idle, "")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = test::TestRequest::get().uri(&session_path(&active, "")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
