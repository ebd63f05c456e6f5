use services::tutor::OpenAiConfig;
use services::{OpenAiTutor, TutorError, TutorResponder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serves one canned response and hands back the raw request, body included.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        let head_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break request.len();
            }
        };
        let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while request.len() < head_end + length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
    });

    (format!("http://{addr}/v1/"), rx)
}

fn tutor(base_url: String) -> OpenAiTutor {
    OpenAiTutor::new(OpenAiConfig {
        base_url,
        api_key: "sk-test".into(),
        model: "tutor-mini".into(),
    })
}

#[tokio::test]
async fn reply_reads_the_first_choice() {
    let body = r#"{"choices":[{"message":{"content":"  **Props** flow down.  "}}]}"#;
    let (base_url, request) = serve_once("200 OK", body).await;

    let reply = tutor(base_url)
        .reply("Components", "How do props work?")
        .await
        .unwrap();
    assert_eq!(reply, "**Props** flow down.");

    let request = request.await.unwrap();
    let lowered = request.to_ascii_lowercase();
    assert!(lowered.starts_with("post /v1/chat/completions "));
    assert!(lowered.contains("authorization: bearer sk-test"));
    assert!(request.contains(r#""model":"tutor-mini""#));
    assert!(request.contains("How do props work?"));
    assert!(request.contains(r#"teaching the lesson \"Components\""#));
}

#[tokio::test]
async fn error_status_is_reported() {
    let (base_url, _request) =
        serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#).await;

    let err = tutor(base_url).reply("Components", "hi").await.unwrap_err();
    assert!(matches!(err, TutorError::HttpStatus(status) if status.as_u16() == 429));
}

#[tokio::test]
async fn blank_completion_is_an_empty_response() {
    let body = r#"{"choices":[{"message":{"content":"   "}}]}"#;
    let (base_url, _request) = serve_once("200 OK", body).await;

    let err = tutor(base_url).greeting("Components").await.unwrap_err();
    assert!(matches!(err, TutorError::EmptyResponse));
}
