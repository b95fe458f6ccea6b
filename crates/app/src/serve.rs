use std::io::{Cursor, Read};

use hintline_engine::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tiny_http::{Method, StatusCode};
use tokio::runtime::Runtime;

use crate::error::{AppError, AppResult};

/// Per-turn failure text; handler errors never surface as HTTP errors, only
/// as this string with a 200.
const APOLOGY_RESPONSE: &str = "Sorry, I had trouble with that. Can you try rephrasing?";

#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ClearPayload {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint_index: Option<usize>,
    session_id: String,
}

/// Minimal single-route chat endpoint. Requests are handled sequentially on
/// the accept loop; per-session turn ordering is the client's contract.
pub fn run(runtime: &Runtime, engine: &Engine, port: u16) -> AppResult<()> {
    let address = format!("127.0.0.1:{port}");
    let server = tiny_http::Server::http(address.as_str()).map_err(|source| AppError::BindServer {
        stage: "bind-http-server",
        address: address.clone(),
        message: source.to_string(),
    })?;
    tracing::info!(%address, "chat endpoint listening");

    for mut request in server.incoming_requests() {
        let response = route(runtime, engine, &mut request);
        if let Err(error) = request.respond(response) {
            tracing::warn!(error = %error, "failed to write http response");
        }
    }

    Ok(())
}

fn route(
    runtime: &Runtime,
    engine: &Engine,
    request: &mut tiny_http::Request,
) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let method = request.method().clone();
    let url = request.url().to_string();

    match (method, url.as_str()) {
        (Method::Post, "/api/chat") => handle_chat(runtime, engine, request),
        (Method::Post, "/api/clear") => handle_clear(runtime, engine, request),
        _ => {
            tracing::debug!(%url, "unknown route");
            json_response(json!({}).to_string(), 404)
        }
    }
}

fn handle_chat(
    runtime: &Runtime,
    engine: &Engine,
    request: &mut tiny_http::Request,
) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let Some(body) = read_body(request) else {
        return apology_response();
    };

    let payload = match serde_json::from_str::<ChatPayload>(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(error = %error, "chat payload did not parse");
            return apology_response();
        }
    };

    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let turn = runtime.block_on(engine.process_turn(&session_id, payload.message.trim()));
    let reply = ChatReply {
        response: turn.text,
        hint_index: turn.hint_index,
        session_id,
    };

    match serde_json::to_string(&reply) {
        Ok(body) => json_response(body, 200),
        Err(error) => {
            tracing::warn!(error = %error, "failed to serialize chat reply");
            apology_response()
        }
    }
}

fn handle_clear(
    runtime: &Runtime,
    engine: &Engine,
    request: &mut tiny_http::Request,
) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let Some(body) = read_body(request) else {
        return apology_response();
    };

    let payload = serde_json::from_str::<ClearPayload>(&body).unwrap_or(ClearPayload {
        session_id: None,
    });

    if let Some(session_id) = payload.session_id.filter(|id| !id.trim().is_empty()) {
        runtime.block_on(engine.clear_session(&session_id));
        tracing::info!(%session_id, "session cleared");
    }

    json_response(json!({"status": "cleared"}).to_string(), 200)
}

fn read_body(request: &mut tiny_http::Request) -> Option<String> {
    let mut body = String::new();
    if let Err(error) = request.as_reader().read_to_string(&mut body) {
        tracing::warn!(error = %error, "failed to read request body");
        return None;
    }
    Some(body)
}

fn apology_response() -> tiny_http::Response<Cursor<Vec<u8>>> {
    json_response(json!({"response": APOLOGY_RESPONSE}).to_string(), 200)
}

fn json_response(body: String, status: u16) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let mut response = tiny_http::Response::from_string(body).with_status_code(StatusCode(status));
    if let Ok(header) = "Content-Type: application/json".parse::<tiny_http::Header>() {
        response = response.with_header(header);
    }
    response
}
