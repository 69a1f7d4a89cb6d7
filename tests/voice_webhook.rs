//! Markup endpoints driven through the router without a listener.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use leadcall_gateway::{AppState, routes};

use common::{acme, test_config, wait_for_removal};

async fn post_form(state: &Arc<AppState>, uri: &str, form: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(state, request).await
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, String) {
    let response = routes::voice::app(state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    if status.is_success() {
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/xml")
        );
    }
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

const START_URI: &str =
    "/voice/start?businessName=Acme&productCategory=Widgets&brandName=Acme%20Co";

#[tokio::test]
async fn test_start_greets_and_gathers() {
    let state = AppState::assemble(test_config(), None, None).unwrap();
    let (status, body) = post_form(&state, START_URI, "CallSid=CA42&From=%2B15550001111").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#));
    assert!(
        body.contains(r#"<Say voice="Polly.Joanna">Hi! This is Acme Co calling about Widgets."#)
    );
    assert!(body.contains(r#"action="/voice/handle""#));
    assert!(body.contains("I didn&apos;t hear a response. Are you still there?"));
    assert!(body.ends_with("<Redirect>/voice/handle</Redirect></Response>"));

    let session = state.registry.get("CA42").unwrap();
    assert_eq!(session.context(), &acme());
    assert_eq!(session.conversation().await.history().len(), 1);
}

#[tokio::test]
async fn test_handle_runs_turns_until_hangup() {
    let state = AppState::assemble(test_config(), None, None).unwrap();
    post_form(&state, START_URI, "CallSid=CA43").await;

    let (status, body) = post_form(
        &state,
        "/voice/handle",
        "CallSid=CA43&SpeechResult=Yes%2C+tell+me+more&Confidence=0.92",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Great! Let me tell you a bit more"));
    assert!(body.contains(
        r#"hints="yes,no,price,pricing,cost,owner,manager,later,call back,not interested,busy""#
    ));
    assert!(body.contains("I didn&apos;t hear anything. Let me try again."));
    assert!(!body.contains("<Hangup/>"));

    let (_, body) = post_form(
        &state,
        "/voice/handle",
        "CallSid=CA43&SpeechResult=Can+I+talk+to+the+owner&Confidence=0.88",
    )
    .await;
    assert!(body.contains("senior team members reaches out"));
    assert!(body.ends_with(r#"<Pause length="1"/><Hangup/></Response>"#));

    // end grace is zero in tests
    assert!(wait_for_removal(&state.registry, "CA43", Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_silence_exhausts_retries() {
    let state = AppState::assemble(test_config(), None, None).unwrap();
    post_form(&state, START_URI, "CallSid=CA44").await;

    // gather timed out: the fallback redirect posts without a speech result
    let (_, first) = post_form(&state, "/voice/handle", "CallSid=CA44").await;
    assert!(first.contains("Could you repeat that for me?"));
    assert!(!first.contains("<Hangup/>"));

    let (_, second) = post_form(&state, "/voice/handle", "CallSid=CA44&SpeechResult=").await;
    assert!(!second.contains("<Hangup/>"));

    let (_, third) = post_form(&state, "/voice/handle", "CallSid=CA44").await;
    assert!(third.contains("<Hangup/>"));
}

#[tokio::test]
async fn test_handle_for_unknown_call_and_escaping() {
    let state = AppState::assemble(test_config(), None, None).unwrap();
    let (status, body) = post_form(
        &state,
        "/voice/handle",
        "CallSid=CA45&SpeechResult=how+much+%3Cb%3E&Confidence=0.9",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("competitive pricing"));
    assert!(!body.contains("<b>"));
    assert!(state.registry.contains("CA45"));
}

#[tokio::test]
async fn test_stream_entry_markup() {
    let mut config = test_config();
    config.public_url = Some("https://calls.example.com/".to_string());
    let state = AppState::assemble(config, None, None).unwrap();

    let (status, body) = post_form(
        &state,
        "/voice/stream-twiml?businessName=Smith%20%26%20Sons&productCategory=Roofing&brandName=Smith",
        "CallSid=CA46",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(
        r#"<Stream url="wss://calls.example.com/voice/media-stream?businessName=Smith+%26+Sons&amp;productCategory=Roofing&amp;brandName=Smith">"#
    ));
    assert!(body.contains(r#"<Parameter name="businessName" value="Smith &amp; Sons" />"#));
    assert!(body.contains(r#"<Parameter name="brandName" value="Smith" />"#));
}

#[tokio::test]
async fn test_relay_entry_uses_host_header() {
    let state = AppState::assemble(test_config(), None, None).unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/voice/relay-twiml?brandName=Acme%20Co")
        .header(header::HOST, "abc.ngrok.app")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<ConversationRelay url="wss://abc.ngrok.app/voice/relay?"#));
    assert!(body.contains(r#"<Parameter name="brandName" value="Acme Co" />"#));
    assert!(body.contains(r#"<Parameter name="businessName" value="your business" />"#));

    let request = Request::builder()
        .method("GET")
        .uri("/voice/relay-twiml")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Host header"));
}

#[tokio::test]
async fn test_status_callback_is_acknowledged() {
    let state = AppState::assemble(test_config(), None, None).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/voice/status")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("CallSid=CA47&CallStatus=no-answer&CallDuration=0"))
        .unwrap();
    let response = routes::voice::app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
