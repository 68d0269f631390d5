use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};
use sessiongate::prelude::*;
use sessiongate::telemetry::init_tracing;
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Accounts and storage
// ---------------------------------------------------------------------------

struct Account {
    password: &'static str,
    permissions: &'static [&'static str],
}

fn accounts() -> HashMap<&'static str, Account> {
    HashMap::from([
        ("ada", Account { password: "lovelace", permissions: &["notes:read", "notes:write"] }),
        ("guest", Account { password: "guest", permissions: &["notes:read"] }),
    ])
}

/// Notes per user. Stands in for whatever storage a real service talks to.
type Notebook = Arc<Mutex<HashMap<String, Vec<String>>>>;

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

struct NotebookLogin {
    accounts: HashMap<&'static str, Account>,
}

impl NotebookLogin {
    fn account(&self, request: &Request) -> Option<&Account> {
        self.accounts.get(request.param_str("user")?)
    }
}

impl LoginHandler for NotebookLogin {
    async fn authenticate(&self, request: &Request) -> Result<bool, HandlerError> {
        Ok(self
            .account(request)
            .is_some_and(|a| request.param_str("password") == Some(a.password)))
    }

    fn seed(&self, request: &Request, session: &SessionHandle) -> Result<(), HandlerError> {
        let user = request
            .param_str("user")
            .ok_or_else(|| HandlerError::failed("user missing"))?;
        session.set_attribute("user", json!(user))?;
        Ok(())
    }

    fn resolve_permissions(&self, request: &Request) -> Result<Vec<String>, HandlerError> {
        let account = self
            .account(request)
            .ok_or_else(|| HandlerError::failed("account vanished"))?;
        Ok(account.permissions.iter().map(|p| p.to_string()).collect())
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

struct NotebookOps {
    notebook: Notebook,
}

impl OperationHandler for NotebookOps {
    async fn process(&self, request: &Request, session: Option<&SessionHandle>) -> Result<Response, HandlerError> {
        let user = session
            .and_then(|s| s.attribute_str("user"))
            .ok_or_else(|| HandlerError::failed("session carries no user"))?;

        match request.method.as_str() {
            "add_note" => {
                let Some(text) = request.param_str("text") else {
                    return Ok(Response::error("text is required"));
                };
                let mut notebook = self.notebook.lock().await;
                let notes = notebook.entry(user).or_default();
                notes.push(text.to_string());
                Ok(Response::success(json!({ "count": notes.len() })))
            }
            "list_notes" => {
                let notebook = self.notebook.lock().await;
                let notes = notebook.get(&user).cloned().unwrap_or_default();
                Ok(Response::success(json!(notes)))
            }
            "export_notes" => {
                let notebook = self.notebook.lock().await;
                let body = notebook.get(&user).map(|n| n.join("\n")).unwrap_or_default();
                Ok(Response::binary(format!("{user}-notes.txt"), body.into_bytes()))
            }
            other => Ok(Response::error(format!("unknown method {other}"))),
        }
    }

    fn check_permissions(&self, permissions: &[String], request: &Request) -> bool {
        let needed = match request.method.as_str() {
            "add_note" => "notes:write",
            _ => "notes:read",
        };
        permissions.iter().any(|p| p == needed)
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

struct Service {
    gateway: Gateway,
    login: LoginDispatcher<NotebookLogin>,
    ops: AuthDispatcher<NotebookOps>,
}

fn service(config: GatewayConfig) -> Service {
    let gateway = Gateway::builder().config(config).build();
    let login = gateway.login(NotebookLogin { accounts: accounts() });
    let ops = gateway.operation(NotebookOps {
        notebook: Arc::default(),
    });
    Service { gateway, login, ops }
}

fn envelope(id: &str, method: &str, session_id: Option<&str>, payload: Value) -> RequestParams {
    let mut request = Request::new(id, method).with_payload(payload);
    request.session_id = session_id.map(str::to_owned);
    let text = serde_json::to_string(&request).unwrap_or_default();
    RequestParams::with_request(text)
}

fn show(label: &str, sink: &BufferedResponse) {
    match sink.body_text() {
        Some(body) if sink.content_type() == Some(JsonCodec.content_type()) => {
            println!("{label}: {body}");
        }
        Some(body) => println!("{label}: attachment {:?} ({} bytes)\n{body}", sink.header("Content-Disposition"), body.len()),
        None => println!("{label}: <no response>"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info,sessiongate=debug");

    let svc = service(GatewayConfig::default());

    let mut sink = BufferedResponse::new();
    svc.login
        .dispatch(&envelope("1", "login", None, json!({ "user": "ada", "password": "nope" })), &mut sink)
        .await;
    show("bad login", &sink);

    let mut sink = BufferedResponse::new();
    svc.login
        .dispatch(&envelope("2", "login", None, json!({ "user": "ada", "password": "lovelace" })), &mut sink)
        .await;
    show("login", &sink);
    let body = sink.body_text().ok_or("login wrote nothing")?;
    let session_id = sessiongate::protocol::decode_response(&JsonCodec, body)?
        .session_id()
        .ok_or("login refused")?
        .to_string();

    for (id, text) in [("3", "buy milk"), ("4", "call Charles")] {
        let mut sink = BufferedResponse::new();
        svc.ops
            .dispatch(&envelope(id, "add_note", Some(&session_id), json!({ "text": text })), &mut sink)
            .await;
        show("add_note", &sink);
    }

    let mut sink = BufferedResponse::new();
    svc.ops
        .dispatch(&envelope("5", "list_notes", Some(&session_id), Value::Null), &mut sink)
        .await;
    show("list_notes", &sink);

    let mut sink = BufferedResponse::new();
    svc.ops
        .dispatch(&envelope("6", "export_notes", Some(&session_id), Value::Null), &mut sink)
        .await;
    show("export_notes", &sink);

    let mut sink = BufferedResponse::new();
    svc.ops
        .dispatch(&envelope("7", "list_notes", Some("forged"), Value::Null), &mut sink)
        .await;
    show("forged session", &sink);

    tracing::info!(live_sessions = svc.gateway.store().len(), "demo finished");
    svc.gateway.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessiongate::protocol::decode_response;

    fn parse(sink: &BufferedResponse) -> Response {
        decode_response(&JsonCodec, sink.body_text().unwrap()).unwrap()
    }

    async fn login(svc: &Service, user: &str, password: &str) -> Response {
        let mut sink = BufferedResponse::new();
        svc.login
            .dispatch(&envelope("l", "login", None, json!({ "user": user, "password": password })), &mut sink)
            .await;
        parse(&sink)
    }

    async fn op(svc: &Service, session_id: &str, method: &str, payload: Value) -> BufferedResponse {
        let mut sink = BufferedResponse::new();
        svc.ops
            .dispatch(&envelope("o", method, Some(session_id), payload), &mut sink)
            .await;
        sink
    }

    #[tokio::test]
    async fn test_notebook_add_then_list_returns_notes() {
        let svc = service(GatewayConfig::default());
        let session = login(&svc, "ada", "lovelace").await;
        let sid = session.session_id().unwrap();

        op(&svc, sid, "add_note", json!({ "text": "buy milk" })).await;
        let listed = parse(&op(&svc, sid, "list_notes", Value::Null).await);

        assert_eq!(listed.status(), Status::Success);
        assert_eq!(listed.payload(), Some(&json!(["buy milk"])));
    }

    #[tokio::test]
    async fn test_notebook_guest_cannot_write() {
        let svc = service(GatewayConfig::default());
        let session = login(&svc, "guest", "guest").await;

        let sink = op(&svc, session.session_id().unwrap(), "add_note", json!({ "text": "x" })).await;

        assert_eq!(parse(&sink).error_message(), Some(ACCESS_DENIED_MESSAGE));
    }

    #[tokio::test]
    async fn test_notebook_export_is_attachment() {
        let svc = service(GatewayConfig::default());
        let session = login(&svc, "ada", "lovelace").await;
        let sid = session.session_id().unwrap();
        op(&svc, sid, "add_note", json!({ "text": "a" })).await;
        op(&svc, sid, "add_note", json!({ "text": "b" })).await;

        let sink = op(&svc, sid, "export_notes", Value::Null).await;

        assert_eq!(sink.header("Content-Disposition"), Some("attachment; filename=\"ada-notes.txt\""));
        assert_eq!(sink.body_text(), Some("a\nb"));
    }

    #[tokio::test]
    async fn test_notebook_wrong_password_is_refused() {
        let svc = service(GatewayConfig::default());
        let response = login(&svc, "ada", "nope").await;
        assert_eq!(response.status(), Status::Error);
        assert!(svc.gateway.store().is_empty());
    }
}
