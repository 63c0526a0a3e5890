use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowwatch_api::{ApiError, WorkflowBackend, WorkflowClient};
use flowwatch_types::{ConsoleConfig, HandlerState, RunId, WorkflowOutput};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    content_type: &'static str,
    chunks: Vec<(u64, Vec<u8>)>,
    /// Close the connection without the final chunk terminator.
    truncated: bool,
}

#[derive(Clone, Debug)]
struct RecordedRequest {
    method: String,
    path: String,
    body: String,
}

type Routes = HashMap<String, Vec<ScriptedResponse>>;

struct ScriptedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    /// Routes are keyed by `"METHOD /path"`; repeated requests walk the
    /// route's responses and stick to the last one.
    async fn new(routes: Vec<(&str, Vec<ScriptedResponse>)>) -> Self {
        let routes: Arc<Routes> = Arc::new(
            routes
                .into_iter()
                .map(|(route, responses)| (route.to_string(), responses))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener.local_addr().expect("resolved local listener address");

        let handle = tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                loop {
                    let Ok((socket, _)) = listener.accept().await else {
                        break;
                    };
                    let routes = Arc::clone(&routes);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        serve_one(socket, routes, requests).await;
                    });
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            handle,
        }
    }

    fn client(&self) -> WorkflowClient {
        let config = ConsoleConfig {
            result_poll_attempts: 3,
            result_poll_interval_ms: 10,
            ..ConsoleConfig::default().with_base_url(&self.base_url)
        };
        WorkflowClient::new(&config).expect("client")
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn json_response(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        content_type: "application/json",
        chunks: vec![(0, body.as_bytes().to_vec())],
        truncated: false,
    }
}

fn ndjson_response(chunks: &[&[u8]]) -> ScriptedResponse {
    ScriptedResponse {
        status: 200,
        content_type: "application/x-ndjson",
        chunks: chunks.iter().map(|chunk| (5, chunk.to_vec())).collect(),
        truncated: false,
    }
}

async fn serve_one(mut socket: TcpStream, routes: Arc<Routes>, requests: Arc<Mutex<Vec<RecordedRequest>>>) {
    let Ok(request) = read_request(&mut socket).await else {
        return;
    };
    let route = format!("{} {}", request.method, request.path);
    let response = {
        let mut recorded = requests.lock().expect("requests lock poisoned");
        let seen = recorded
            .iter()
            .filter(|r| r.method == request.method && r.path == request.path)
            .count();
        recorded.push(request);
        routes
            .get(&route)
            .and_then(|responses| responses.get(seen).or_else(|| responses.last()))
            .cloned()
            .unwrap_or_else(|| json_response(404, r#"{"detail":"Not Found"}"#))
    };

    let headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        response.status,
        status_reason(response.status),
        response.content_type,
    );
    if socket.write_all(headers.as_bytes()).await.is_err() {
        return;
    }
    for (delay_ms, bytes) in response.chunks {
        if delay_ms > 0 {
            sleep(Duration::from_millis(delay_ms)).await;
        }
        let prefix = format!("{:X}\r\n", bytes.len());
        if socket.write_all(prefix.as_bytes()).await.is_err()
            || socket.write_all(&bytes).await.is_err()
            || socket.write_all(b"\r\n").await.is_err()
        {
            return;
        }
        let _ = socket.flush().await;
    }
    if !response.truncated {
        let _ = socket.write_all(b"0\r\n\r\n").await;
    }
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut raw = Vec::new();
    let mut buffer = [0_u8; 2048];
    let header_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        raw.extend_from_slice(&buffer[..n]);
        if let Some(pos) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while raw.len() < header_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buffer[..n]);
    }
    let body = String::from_utf8_lossy(&raw[header_end..]).to_string();
    Ok(RecordedRequest { method, path, body })
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[tokio::test]
async fn start_run_posts_start_event_and_returns_handler_id() {
    let server = ScriptedServer::new(vec![(
        "POST /workflows/research/run-nowait",
        vec![json_response(200, r#"{"handler_id":"abc123","status":"started"}"#)],
    )])
    .await;

    let run_id = server
        .client()
        .start_run("research", &json!({"topic": "rust"}))
        .await
        .expect("run should start");
    assert_eq!(run_id, RunId::from("abc123"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_str(&requests[0].body).expect("json body");
    assert_eq!(body["start_event"], json!(r#"{"topic":"rust"}"#));
    assert_eq!(body["context"], json!({}));
    assert_eq!(body["kwargs"], json!({}));
}

#[tokio::test]
async fn start_run_without_handler_id_is_a_start_failure() {
    let server = ScriptedServer::new(vec![(
        "POST /workflows/research/run-nowait",
        vec![json_response(200, r#"{"status":"started"}"#)],
    )])
    .await;

    let error = server
        .client()
        .start_run("research", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(error, ApiError::MissingHandlerId));
}

#[tokio::test]
async fn start_run_reports_unknown_workflow_status() {
    let server = ScriptedServer::new(vec![]).await;

    let error = server
        .client()
        .start_run("missing flow", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(error, ApiError::Status { status: 404, .. }));
    assert_eq!(server.requests()[0].path, "/workflows/missing%20flow/run-nowait");
}

#[tokio::test]
async fn event_stream_yields_body_chunks_in_order() {
    let server = ScriptedServer::new(vec![(
        "GET /events/abc123",
        vec![ndjson_response(&[
            br#"{"qualified_name":"StepStarted","value":{"step":"fetch"}}"#,
            b"\n{\"qualified_name\":\"StepDone\",",
            b"\"value\":{\"msg\":\"ok\"}}\n",
        ])],
    )])
    .await;

    let mut stream = server
        .client()
        .open_events(&RunId::from("abc123"))
        .await
        .expect("stream should open");
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.expect("chunk"));
    }
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "{\"qualified_name\":\"StepStarted\",\"value\":{\"step\":\"fetch\"}}\n{\"qualified_name\":\"StepDone\",\"value\":{\"msg\":\"ok\"}}\n"
    );
}

#[tokio::test]
async fn event_stream_for_unknown_handler_fails_to_open() {
    let server = ScriptedServer::new(vec![(
        "GET /events/nope",
        vec![json_response(404, r#"{"detail":"Handler not found"}"#)],
    )])
    .await;

    let result = server.client().open_events(&RunId::from("nope")).await;
    assert!(matches!(result, Err(ApiError::Status { status: 404, .. })));
}

#[tokio::test]
async fn event_stream_error_body_cut_short_is_a_network_error() {
    let server = ScriptedServer::new(vec![(
        "GET /events/abc123",
        vec![ScriptedResponse {
            truncated: true,
            ..json_response(500, r#"{"detail":"bo"#)
        }],
    )])
    .await;

    let result = server.client().open_events(&RunId::from("abc123")).await;
    match result {
        Err(error @ ApiError::Network { .. }) => {
            assert!(error.is_transport());
            assert!(error.to_string().contains("/events/abc123"));
        }
        Err(other) => panic!("expected a network error, got {other:?}"),
        Ok(_) => panic!("expected the stream to fail to open"),
    }
}

#[tokio::test]
async fn result_failure_becomes_error_output() {
    let server = ScriptedServer::new(vec![(
        "GET /results/abc123",
        vec![json_response(500, r#"{"detail":"boom"}"#)],
    )])
    .await;

    let output = server.client().fetch_result(&RunId::from("abc123")).await;
    assert_eq!(
        output.to_json(),
        json!({"error": "Error while fetching workflow data: [500] {\"detail\":\"boom\"}"})
    );
}

#[tokio::test]
async fn result_is_polled_while_not_ready() {
    let server = ScriptedServer::new(vec![(
        "GET /results/abc123",
        vec![
            json_response(202, "{}"),
            json_response(200, r#"{"result":{"answer":"done"}}"#),
        ],
    )])
    .await;

    let output = server.client().fetch_result(&RunId::from("abc123")).await;
    assert_eq!(output, WorkflowOutput::Result(json!({"answer": "done"})));
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn result_gives_up_after_configured_attempts() {
    let server = ScriptedServer::new(vec![("GET /results/abc123", vec![json_response(202, "{}")])]).await;

    let output = server.client().fetch_result(&RunId::from("abc123")).await;
    assert!(output.is_error());
    assert!(output.to_json()["error"].as_str().unwrap().contains("not ready after 3 attempts"));
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn listing_endpoints_decode_server_payloads() {
    let server = ScriptedServer::new(vec![
        ("GET /workflows", vec![json_response(200, r#"{"workflows":["research","summarize"]}"#)]),
        ("GET /health", vec![json_response(200, r#"{"status":"healthy"}"#)]),
        (
            "GET /handlers",
            vec![json_response(
                200,
                r#"{"handlers":[{"handler_id":"abc123","status":"completed","result":{"answer":1},"error":null},{"handler_id":"def456","status":"running","result":null,"error":null}]}"#,
            )],
        ),
    ])
    .await;
    let client = server.client();

    assert_eq!(client.list_workflows().await.unwrap(), vec!["research", "summarize"]);
    assert!(client.health().await.unwrap().is_healthy());
    let handlers = client.list_handlers().await.unwrap();
    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers[0].status, HandlerState::Completed);
    assert_eq!(handlers[1].status, HandlerState::Running);
}
