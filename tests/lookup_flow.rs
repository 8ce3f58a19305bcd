//! End-to-end protocol flows driven through a scripted transport.

use std::sync::{Arc, Mutex};

use aes::Aes128;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use async_trait::async_trait;
use numlookup_rs::{
    DispatchError, LookupClient, LookupConfig, LookupError, LookupRequest, UpstreamResponse,
    UpstreamTransport,
};
use url::Url;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;

fn config() -> LookupConfig {
    LookupConfig::new(Url::parse("https://upstream.test/uploads/abc/web.php?i=1").unwrap())
}

fn row(label: &str, value: &str) -> String {
    format!(
        "<div class=\"row\"><div class=\"label\">{label}</div><div class=\"value\">{value}</div></div>"
    )
}

/// Challenge page whose embedded triple decrypts to `token_bytes`.
fn challenge_page(token_bytes: &[u8]) -> String {
    let key = [0x41u8; 16];
    let iv = [0x42u8; 16];
    let ciphertext =
        Aes128CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(token_bytes);
    format!(
        "<html><body><script type=\"text/javascript\">\
         var a=toNumbers(\"{}\"),b=toNumbers(\"{}\"),c=toNumbers(\"{}\");\
         document.cookie=\"__test=\"+toHex(slowAES.decrypt(c,2,a,b))+\"; path=/\";\
         </script></body></html>",
        hex::encode(key),
        hex::encode(iv),
        hex::encode(ciphertext),
    )
}

fn json_response(body: &str) -> UpstreamResponse {
    UpstreamResponse::new(200, body.as_bytes().to_vec())
}

fn html_response(body: &str) -> UpstreamResponse {
    UpstreamResponse::new(200, body.as_bytes().to_vec())
}

/// Pops canned responses in order and records every request it saw.
struct StubTransport {
    responses: Mutex<Vec<UpstreamResponse>>,
    requests: Mutex<Vec<LookupRequest>>,
}

impl StubTransport {
    fn new(responses: Vec<UpstreamResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn recorded(&self) -> Vec<LookupRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamTransport for StubTransport {
    async fn send(&self, request: &LookupRequest) -> Result<UpstreamResponse, DispatchError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop()
            .expect("no more stub responses"))
    }
}

/// Fails every exchange, as a timed-out or refused connection would.
struct FailingTransport;

#[async_trait]
impl UpstreamTransport for FailingTransport {
    async fn send(&self, _request: &LookupRequest) -> Result<UpstreamResponse, DispatchError> {
        Err(DispatchError::Transport("connection reset by peer".into()))
    }
}

fn client_with(transport: Arc<dyn UpstreamTransport>) -> LookupClient {
    LookupClient::builder(config())
        .with_transport(transport)
        .build()
        .unwrap()
}

#[tokio::test]
async fn direct_data_on_first_attempt_succeeds() {
    let reply = serde_json::json!({ "reply": row("Name", "John") }).to_string();
    let transport = Arc::new(StubTransport::new(vec![json_response(&reply)]));
    let client = client_with(transport.clone());

    let records = client.lookup("9876543210", None).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name"), Some("John"));

    let requests = transport.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].subject, "9876543210");
    assert_eq!(requests[0].session_token, None);
}

#[tokio::test]
async fn challenge_then_data_retries_once_with_solved_cookie() {
    let replies = serde_json::json!({
        "replies": [row("Name", "John"), row("Name", "Jane")]
    })
    .to_string();
    let transport = Arc::new(StubTransport::new(vec![
        html_response(&challenge_page(&[0xab, 0xc1, 0x23])),
        json_response(&replies),
    ]));
    let client = client_with(transport.clone());

    let records = client.lookup("9876543210", None).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("name"), Some("John"));
    assert_eq!(records[1].get("name"), Some("Jane"));

    let requests = transport.recorded();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].session_token, None);
    assert_eq!(requests[1].session_token.as_deref(), Some("abc123"));
    assert_eq!(config().cookie_header("abc123"), "__test=abc123");
}

#[tokio::test]
async fn stored_token_rides_the_first_attempt() {
    let reply = serde_json::json!({ "reply": row("Name", "John") }).to_string();
    let transport = Arc::new(StubTransport::new(vec![json_response(&reply)]));
    let client = client_with(transport.clone());

    client.lookup("9876543210", Some("cafe01")).await.unwrap();

    let requests = transport.recorded();
    assert_eq!(requests[0].session_token.as_deref(), Some("cafe01"));
}

#[tokio::test]
async fn unsolvable_challenge_is_a_typed_failure() {
    // Two hex arguments only; the page cannot yield a triple.
    let page = "<script>var a=toNumbers(\"aabb\"),b=toNumbers(\"ccdd\");</script>";
    let transport = Arc::new(StubTransport::new(vec![html_response(page)]));
    let client = client_with(transport.clone());

    let err = client.lookup("9876543210", None).await.unwrap_err();

    assert!(matches!(err, LookupError::ChallengeUnsolvable(_)));
    assert_eq!(err.kind(), "challenge_unsolvable");
    assert_eq!(transport.recorded().len(), 1);
}

#[tokio::test]
async fn unexpected_envelope_shape_is_a_typed_failure() {
    let transport = Arc::new(StubTransport::new(vec![json_response(
        r#"{"ok": true, "results": []}"#,
    )]));
    let client = client_with(transport.clone());

    let err = client.lookup("9876543210", None).await.unwrap_err();

    assert!(matches!(err, LookupError::UnexpectedShape));
    assert_eq!(err.kind(), "unexpected_shape");
    assert_eq!(transport.recorded().len(), 1);
}

#[tokio::test]
async fn two_consecutive_challenges_stop_after_two_attempts() {
    let transport = Arc::new(StubTransport::new(vec![
        html_response(&challenge_page(b"first")),
        html_response(&challenge_page(b"again")),
    ]));
    let client = client_with(transport.clone());

    let err = client.lookup("9876543210", None).await.unwrap_err();

    assert!(matches!(err, LookupError::RetryExhausted));
    assert_eq!(transport.recorded().len(), 2);
}

#[tokio::test]
async fn malformed_body_after_retry_is_retry_exhausted() {
    let transport = Arc::new(StubTransport::new(vec![
        html_response(&challenge_page(&[0x01, 0x02])),
        json_response(r#"{"unexpected": 1}"#),
    ]));
    let client = client_with(transport.clone());

    let err = client.lookup("9876543210", None).await.unwrap_err();

    assert!(matches!(err, LookupError::RetryExhausted));
    assert_eq!(transport.recorded().len(), 2);
}

#[tokio::test]
async fn dispatch_failure_is_terminal_and_distinct() {
    let client = client_with(Arc::new(FailingTransport));

    let err = client.lookup("9876543210", None).await.unwrap_err();

    assert!(matches!(err, LookupError::DispatchFailed(_)));
    assert_eq!(err.kind(), "dispatch_failed");
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn empty_reply_list_is_an_empty_success() {
    let transport = Arc::new(StubTransport::new(vec![json_response(r#"{"replies": []}"#)]));
    let client = client_with(transport);

    let records = client.lookup("9876543210", None).await.unwrap();
    assert!(records.is_empty());
}

#[test]
#[ignore = "Requires network access and a live endpoint in NUMLOOKUP_ENDPOINT"]
fn live_lookup_smoke() {
    let endpoint = std::env::var("NUMLOOKUP_ENDPOINT").expect("set NUMLOOKUP_ENDPOINT");
    let subject = std::env::var("NUMLOOKUP_SUBJECT").unwrap_or_else(|_| "9876543210".to_string());

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let client = LookupClient::new(LookupConfig::new(Url::parse(&endpoint).unwrap())).unwrap();

    match runtime.block_on(client.lookup(&subject, None)) {
        Ok(records) => {
            println!("{} record(s)", records.len());
            for record in &records {
                for (key, value) in record.iter() {
                    println!("  {key}: {value}");
                }
            }
        }
        Err(err) => println!("lookup failed ({}): {err}", err.kind()),
    }
}
