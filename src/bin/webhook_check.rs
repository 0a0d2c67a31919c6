//! One-shot webhook check.
//!
//! POSTs the four sample payloads (command, message, photo, document) to a
//! webhook URL given as the first argument or via N8N_WEBHOOK_URL, prints
//! each outcome, and exits non-zero unless every request got a 2xx.

use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

const TIMEOUT_SECS: u64 = 10;

fn sample_payloads() -> Vec<(&'static str, Value)> {
    let timestamp = Utc::now().to_rfc3339();
    vec![
        (
            "Start Command",
            json!({
                "type": "command",
                "command": "start",
                "user_id": 123456789,
                "username": "testuser",
                "first_name": "Test",
                "last_name": "User",
                "timestamp": timestamp,
            }),
        ),
        (
            "Text Message",
            json!({
                "type": "message",
                "message_id": 1,
                "text": "Hello, this is a test message from the bot!",
                "user_id": 123456789,
                "username": "testuser",
                "first_name": "Test",
                "last_name": "User",
                "chat_id": 987654321,
                "timestamp": timestamp,
            }),
        ),
        (
            "Photo Message",
            json!({
                "type": "photo",
                "message_id": 2,
                "photo_file_id": "BAADBAADrwADBREAAWuWASFAtyS5v0MaAg",
                "caption": "Test photo caption",
                "user_id": 123456789,
                "username": "testuser",
                "first_name": "Test",
                "last_name": "User",
                "chat_id": 987654321,
                "timestamp": timestamp,
            }),
        ),
        (
            "Document Message",
            json!({
                "type": "document",
                "message_id": 3,
                "document_file_id": "BAADBAADrwADBREAAWuWASFAtyS5v0MaAg",
                "document_name": "test_document.pdf",
                "document_mime_type": "application/pdf",
                "caption": "Test document caption",
                "user_id": 123456789,
                "username": "testuser",
                "first_name": "Test",
                "last_name": "User",
                "chat_id": 987654321,
                "timestamp": timestamp,
            }),
        ),
    ]
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let url = match std::env::args()
        .nth(1)
        .or_else(|| std::env::var("N8N_WEBHOOK_URL").ok())
    {
        Some(url) if !url.is_empty() => url,
        _ => {
            eprintln!("Usage: webhook_check <url>  (or set N8N_WEBHOOK_URL)");
            return ExitCode::FAILURE;
        }
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Testing webhook: {url}");
    println!("{}", "-".repeat(50));

    let cases = sample_payloads();
    let mut passed = 0;

    for (name, payload) in &cases {
        match client.post(&url).json(payload).send().await {
            Ok(response) => {
                let status = response.status();
                let ok = status.is_success();
                println!("{} {name} ({status})", if ok { "PASS" } else { "FAIL" });
                if ok {
                    passed += 1;
                }
                match response.text().await {
                    Ok(body) if !body.is_empty() => println!("  response: {body}"),
                    Ok(_) => println!("  empty response body"),
                    Err(e) => println!("  failed to read body: {e}"),
                }
            }
            Err(e) => println!("FAIL {name}: {e}"),
        }
    }

    println!("{}", "-".repeat(50));
    println!("{passed}/{} checks passed", cases.len());

    if passed == cases.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
