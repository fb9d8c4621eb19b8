//! End-to-end behaviour of `JsonRpcServer::serve`
//!
//! Covers single calls, notifications, batches and deadlines through the public
//! API only, comparing responses as JSON values.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use json_rpc_dispatch::prelude::*;

fn echo_result(params: Value) -> Value {
    json!({ "EchoResult": params })
}

async fn wait(_ctx: CallContext, params: Value) -> JsonRpcResult<Value> {
    let ms = params.as_u64().unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(json!("ok"))
}

fn server(timeout: Duration) -> JsonRpcServer {
    JsonRpcServer::builder()
        .default_timeout(timeout)
        .method("echo", |_ctx, params| async move { Ok(echo_result(params)) })
        .method("wait", wait)
        .method("custom", |_ctx, _params| async move {
            Err(JsonRpcErrorObject::new(4001, "quota exceeded")
                .with_data(json!({"limit": 10}))
                .into())
        })
        .method("typed", |_ctx, params| async move {
            let [a, b]: [f64; 2] = decode_params(params)?;
            Ok(json!(a + b))
        })
        .build()
}

async fn serve(server: &JsonRpcServer, payload: &str) -> Option<Value> {
    server
        .serve(payload.as_bytes())
        .await
        .map(|bytes| serde_json::from_slice(&bytes).expect("response must be valid JSON"))
}

#[tokio::test]
async fn id_is_integer() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"{ "jsonrpc": "2.0", "method": "echo", "params": "hi", "id": 1 }"#).await;
    assert_eq!(
        rsp,
        Some(json!({"id": 1, "jsonrpc": "2.0", "result": {"EchoResult": "hi"}}))
    );
}

#[tokio::test]
async fn id_is_string() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"{ "jsonrpc": "2.0", "method": "echo", "params": "hi", "id": "1" }"#).await;
    assert_eq!(
        rsp,
        Some(json!({"id": "1", "jsonrpc": "2.0", "result": {"EchoResult": "hi"}}))
    );
}

#[tokio::test]
async fn explicit_null_id_is_answered() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"{ "jsonrpc": "2.0", "method": "echo", "params": 1, "id": null }"#).await;
    assert_eq!(
        rsp,
        Some(json!({"id": null, "jsonrpc": "2.0", "result": {"EchoResult": 1}}))
    );
}

#[tokio::test]
async fn notification_has_no_response() {
    let server = server(Duration::ZERO);
    let rsp = server
        .serve(br#"{ "jsonrpc": "2.0", "method": "echo", "params": "hi" }"#)
        .await;
    assert!(rsp.is_none());
}

#[tokio::test]
async fn notification_still_runs_and_stays_silent_on_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let server = JsonRpcServer::builder()
        .method("record", move |_ctx, _params| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(JsonRpcProcessingError::handler("side effect failed"))
            }
        })
        .build();

    let rsp = server.serve(br#"{"jsonrpc": "2.0", "method": "record"}"#).await;
    assert!(rsp.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn method_is_not_defined() {
    let server = server(Duration::ZERO);
    let rsp = server
        .serve_str(r#"{"jsonrpc":"2.0","method":"missing","params":"hi","id":1}"#)
        .await;
    assert_eq!(
        rsp.as_deref(),
        Some(r#"{"id":1,"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"}}"#)
    );
}

#[tokio::test]
async fn echo_scenario_is_byte_exact() {
    let server = JsonRpcServer::builder()
        .method("echo", |_ctx, params| async move { Ok(params) })
        .build();
    let rsp = server
        .serve_str(r#"{"jsonrpc":"2.0","method":"echo","params":"hi","id":1}"#)
        .await;
    assert_eq!(rsp.as_deref(), Some(r#"{"id":1,"jsonrpc":"2.0","result":"hi"}"#));
}

#[tokio::test]
async fn invalid_json() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, "{qqqq}").await;
    assert_eq!(
        rsp,
        Some(json!({
            "id": null,
            "jsonrpc": "2.0",
            "error": {"code": -32700, "message": "Parse error"}
        }))
    );
}

#[tokio::test]
async fn invalid_utf8_is_a_parse_error() {
    let server = server(Duration::ZERO);
    let rsp = server
        .serve(b"{\"jsonrpc\": \"2.0\", \"method\": \"\xff\", \"id\": 1}")
        .await
        .map(|bytes| serde_json::from_slice::<Value>(&bytes).unwrap());
    assert_eq!(rsp.unwrap()["error"]["code"], json!(-32700));
}

#[tokio::test]
async fn invalid_request() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"{"a": 1}"#).await;
    assert_eq!(
        rsp,
        Some(json!({
            "id": null,
            "jsonrpc": "2.0",
            "error": {"code": -32600, "message": "Invalid request"}
        }))
    );
}

#[tokio::test]
async fn invalid_request_hides_supplied_id() {
    let server = server(Duration::ZERO);
    for payload in [
        r#"{"jsonrpc": "1.0", "method": "echo", "id": 7}"#,
        r#"{"jsonrpc": "2.0", "method": "", "id": 7}"#,
        r#"{"method": "echo", "id": 7}"#,
    ] {
        let rsp = serve(&server, payload).await.expect("invalid calls always get a response");
        assert_eq!(rsp["id"], Value::Null, "payload {}", payload);
        assert_eq!(rsp["error"]["code"], json!(-32600), "payload {}", payload);
    }
}

#[tokio::test]
async fn custom_errors_pass_through() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"{"jsonrpc": "2.0", "method": "custom", "id": 2}"#).await;
    assert_eq!(
        rsp,
        Some(json!({
            "id": 2,
            "jsonrpc": "2.0",
            "error": {"code": 4001, "message": "quota exceeded", "data": {"limit": 10}}
        }))
    );
}

#[tokio::test]
async fn handlers_can_report_invalid_params() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"{"jsonrpc": "2.0", "method": "typed", "params": [1, 2], "id": 1}"#).await;
    assert_eq!(rsp.unwrap()["result"], json!(3.0));

    let rsp = serve(&server, r#"{"jsonrpc": "2.0", "method": "typed", "params": "x", "id": 1}"#).await;
    let rsp = rsp.unwrap();
    assert_eq!(rsp["error"]["code"], json!(-32602));
    assert_eq!(rsp["error"]["message"], json!("Invalid Params"));
}

#[tokio::test(start_paused = true)]
async fn should_not_timeout() {
    let server = server(Duration::from_millis(5));
    let rsp = serve(&server, r#"{ "jsonrpc": "2.0", "method": "wait", "params": 1, "id": "1" }"#).await;
    assert_eq!(rsp, Some(json!({"id": "1", "jsonrpc": "2.0", "result": "ok"})));
}

#[tokio::test(start_paused = true)]
async fn should_timeout() {
    let server = server(Duration::from_millis(5));
    let rsp = serve(&server, r#"{ "jsonrpc": "2.0", "method": "wait", "params": 100, "id": "1" }"#).await;
    assert_eq!(
        rsp,
        Some(json!({
            "id": "1",
            "jsonrpc": "2.0",
            "error": {"code": -32000, "message": "context deadline exceeded"}
        }))
    );
}

#[tokio::test]
async fn batch_success() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"[{ "jsonrpc": "2.0", "method": "echo", "params": "hi", "id": 1 }]"#).await;
    assert_eq!(
        rsp,
        Some(json!([{"id": 1, "jsonrpc": "2.0", "result": {"EchoResult": "hi"}}]))
    );
}

#[tokio::test]
async fn empty_batch_is_a_single_invalid_request() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, "[]").await;
    assert_eq!(
        rsp,
        Some(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32600, "message": "Invalid request"},
            "id": null
        }))
    );
}

#[tokio::test]
async fn batch_elements_are_validated_individually() {
    let server = server(Duration::ZERO);
    let rsp = serve(
        &server,
        r#"[
            1,
            { "method": "echo" },
            { "jsonrpc": "2.0", "method": "echo", "params": "hi", "id": "1" }
        ]"#,
    )
    .await;
    assert_eq!(
        rsp,
        Some(json!([
            {"jsonrpc": "2.0", "error": {"code": -32700, "message": "Parse error"}, "id": null},
            {"jsonrpc": "2.0", "error": {"code": -32600, "message": "Invalid request"}, "id": null},
            {"jsonrpc": "2.0", "result": {"EchoResult": "hi"}, "id": "1"}
        ]))
    );
}

#[tokio::test(start_paused = true)]
async fn batch_one_timeout_one_success() {
    let server = server(Duration::from_millis(5));
    let rsp = serve(
        &server,
        r#"[
            { "jsonrpc": "2.0", "method": "wait", "params": 100, "id": "1" },
            { "jsonrpc": "2.0", "method": "wait", "params": 1, "id": "2" }
        ]"#,
    )
    .await;
    assert_eq!(
        rsp,
        Some(json!([
            {"id": "1", "jsonrpc": "2.0", "error": {"code": -32000, "message": "context deadline exceeded"}},
            {"id": "2", "jsonrpc": "2.0", "result": "ok"}
        ]))
    );
}

#[tokio::test(start_paused = true)]
async fn batch_preserves_input_order_and_runs_concurrently() {
    let server = server(Duration::ZERO);
    let started = tokio::time::Instant::now();
    let rsp = serve(
        &server,
        r#"[
            { "jsonrpc": "2.0", "method": "wait", "params": 50, "id": 0 },
            { "jsonrpc": "2.0", "method": "wait", "params": 1, "id": 1 },
            { "jsonrpc": "2.0", "method": "wait", "params": 30, "id": 2 }
        ]"#,
    )
    .await
    .unwrap();

    let ids: Vec<Value> = rsp
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
    // bounded by the slowest element, not the sum
    assert!(started.elapsed() < Duration::from_millis(81));
}

#[tokio::test]
async fn batch_one_notification_one_success() {
    let server = server(Duration::ZERO);
    let rsp = serve(
        &server,
        r#"[
            { "jsonrpc": "2.0", "method": "echo", "params": 100 },
            { "jsonrpc": "2.0", "method": "echo", "params": 1, "id": "2" }
        ]"#,
    )
    .await;
    assert_eq!(
        rsp,
        Some(json!([{"id": "2", "jsonrpc": "2.0", "result": {"EchoResult": 1}}]))
    );
}

#[tokio::test]
async fn batch_of_notifications_is_absent() {
    let server = server(Duration::ZERO);
    let rsp = server
        .serve(
            br#"[
                { "jsonrpc": "2.0", "method": "echo", "params": 100 },
                { "jsonrpc": "2.0", "method": "echo", "params": 1 }
            ]"#,
        )
        .await;
    assert!(rsp.is_none());
}

#[tokio::test]
async fn panicking_element_does_not_affect_siblings() {
    let server = JsonRpcServer::builder()
        .method("boom", |_ctx, _params| async move {
            if true {
                panic!("handler exploded");
            }
            Ok(Value::Null)
        })
        .method("echo", |_ctx, params| async move { Ok(params) })
        .build();

    let rsp = serve(
        &server,
        r#"[
            { "jsonrpc": "2.0", "method": "boom", "id": 1 },
            { "jsonrpc": "2.0", "method": "echo", "params": "fine", "id": 2 }
        ]"#,
    )
    .await
    .unwrap();

    let responses = rsp.as_array().unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(
        responses[0],
        json!({
            "id": 1,
            "jsonrpc": "2.0",
            "error": {"code": -32000, "message": "handler panicked: handler exploded"}
        })
    );
    assert_eq!(responses[1], json!({"id": 2, "jsonrpc": "2.0", "result": "fine"}));
}

#[tokio::test]
async fn panicking_single_call_still_gets_a_response() {
    let server = JsonRpcServer::builder()
        .method("boom", |_ctx, _params| async move {
            if true {
                panic!("x");
            }
            Ok(Value::Null)
        })
        .build();

    let rsp = serve(&server, r#"{"jsonrpc": "2.0", "method": "boom", "id": 7}"#).await;
    assert_eq!(
        rsp,
        Some(json!({
            "id": 7,
            "jsonrpc": "2.0",
            "error": {"code": -32000, "message": "handler panicked: x"}
        }))
    );
}

#[tokio::test]
async fn array_batch_elements_are_parse_errors() {
    let server = server(Duration::ZERO);
    let rsp = serve(&server, r#"[[1, "2.0", "echo", "hi"], []]"#).await;
    let parse_error = json!({
        "id": null,
        "jsonrpc": "2.0",
        "error": {"code": -32700, "message": "Parse error"}
    });
    assert_eq!(rsp, Some(json!([parse_error.clone(), parse_error])));
}

#[tokio::test]
async fn null_version_or_method_is_invalid_request() {
    let server = server(Duration::ZERO);
    for payload in [
        r#"{"jsonrpc": null, "method": "echo", "id": 1}"#,
        r#"{"jsonrpc": "2.0", "method": null, "id": 1}"#,
    ] {
        let rsp = serve(&server, payload).await.expect("invalid calls always get a response");
        assert_eq!(rsp["id"], Value::Null, "payload {}", payload);
        assert_eq!(rsp["error"]["code"], json!(-32600), "payload {}", payload);
    }
}

#[test]
fn response_round_trip() {
    let messages = [
        JsonRpcMessage::success(RequestId::from(1), json!({"EchoResult": "hi"})),
        JsonRpcMessage::error(JsonRpcError::method_not_found(RequestId::from("a"))),
        JsonRpcMessage::error(JsonRpcError::parse_error()),
    ];
    for message in messages {
        let encoded = serde_json::to_vec(&message).unwrap();
        let decoded: JsonRpcMessage = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, message);
    }
}
