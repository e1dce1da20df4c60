#![allow(dead_code, clippy::unwrap_used)]

//! Shared fixtures: a scripted stand-in for the agent binary and an
//! in-process stand-in for its local REST API.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

/// Write an executable shell script standing in for the agent binary.
#[cfg(unix)]
pub fn write_fake_agent(dir: &Path, script: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("ngrok");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Script for an agent that reports `version`, records its pid, prints a
/// ready line bound to `addr`, then idles until signalled.
#[cfg(unix)]
pub fn ready_agent_script(version: &str, addr: &str, pid_file: &Path) -> String {
    format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "ngrok version {version}"
  exit 0
fi
echo $$ > "{pid_file}"
echo 't=2024-01-01T00:00:00+0000 lvl=info msg="starting tunnel session"'
echo 't=2024-01-01T00:00:01+0000 lvl=info msg="starting web service" obj=web addr={addr}'
exec sleep 600
"#,
        pid_file = pid_file.display(),
    )
}

/// In-process stand-in for the agent's local API: tunnel CRUD plus the
/// traffic-inspector listing, with two captured requests pre-seeded.
pub struct FakeAgentApi {
    /// Listen address, `127.0.0.1:<port>`.
    pub addr: String,
}

impl FakeAgentApi {
    /// Start the fixture on an ephemeral port; it dies with the process.
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_string();
        let tunnels: Arc<Mutex<HashMap<String, Value>>> = Arc::new(Mutex::new(HashMap::new()));
        std::thread::spawn(move || serve(&server, &tunnels));
        Self { addr }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn serve(server: &tiny_http::Server, tunnels: &Arc<Mutex<HashMap<String, Value>>>) {
    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();
        let (path, query) = split_query(&url);

        if method == tiny_http::Method::Post && path == "/api/tunnels" {
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let requested: Value = serde_json::from_str(&body).unwrap();
            let tunnel = tunnel_from_request(&requested);
            let name = tunnel["name"].as_str().unwrap_or_default().to_string();
            tunnels.lock().unwrap().insert(name, tunnel.clone());
            respond_json(request, 201, &tunnel);
        } else if method == tiny_http::Method::Get && path == "/api/tunnels" {
            let list: Vec<Value> = tunnels.lock().unwrap().values().cloned().collect();
            respond_json(request, 200, &json!({ "tunnels": list }));
        } else if method == tiny_http::Method::Delete && path.starts_with("/api/tunnels/") {
            let raw = &path["/api/tunnels/".len()..];
            let name = urlencoding::decode(raw)
                .unwrap_or_else(|_| raw.into())
                .to_string();
            if tunnels.lock().unwrap().remove(&name).is_some() {
                respond_empty(request, 204);
            } else {
                respond_json(request, 404, &json!({ "error": "tunnel not found" }));
            }
        } else if method == tiny_http::Method::Get && path == "/api/requests/http" {
            let filter = query.get("tunnel_name").cloned();
            let requests: Vec<Value> = captured_requests()
                .into_iter()
                .filter(|r| {
                    filter
                        .as_deref()
                        .is_none_or(|f| r["tunnel_name"].as_str() == Some(f))
                })
                .collect();
            respond_json(request, 200, &json!({ "requests": requests }));
        } else if method == tiny_http::Method::Get && path == "/api/headers" {
            let value = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("x-burrow-test"))
                .map(|h| h.value.as_str().to_string());
            respond_json(request, 200, &json!({ "x-burrow-test": value }));
        } else {
            respond_json(request, 404, &json!({ "error": "not found" }));
        }
    }
}

/// Build the created-tunnel body the way the agent would.
fn tunnel_from_request(requested: &Value) -> Value {
    let name = requested["name"].as_str().unwrap_or_default();
    let proto = requested["proto"].as_str().unwrap_or("http");
    let addr = requested["addr"].as_str().unwrap_or_default();
    let addr = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://localhost:{addr}")
    };
    let host = uuid::Uuid::new_v4().simple().to_string();
    json!({
        "name": name,
        "uri": format!("/api/tunnels/{}", urlencoding::encode(name)),
        "public_url": format!("{proto}://{host}.ngrok.test"),
        "proto": proto,
        "config": { "addr": addr, "inspect": true },
    })
}

fn captured_requests() -> Vec<Value> {
    vec![
        json!({
            "id": "req_1",
            "tunnel_name": "tunnel (1)",
            "remote_addr": "127.0.0.1",
            "duration": 3,
        }),
        json!({
            "id": "req_2",
            "tunnel_name": "tunnel (1) (http)",
            "remote_addr": "127.0.0.1",
            "duration": 5,
        }),
    ]
}

fn split_query(url: &str) -> (String, HashMap<String, String>) {
    match url.split_once('?') {
        Some((path, qs)) => {
            let mut map = HashMap::new();
            for pair in qs.split('&') {
                if let Some((k, v)) = pair.split_once('=') {
                    map.insert(
                        urlencoding::decode(k).unwrap_or_else(|_| k.into()).to_string(),
                        urlencoding::decode(v).unwrap_or_else(|_| v.into()).to_string(),
                    );
                }
            }
            (path.to_string(), map)
        }
        None => (url.to_string(), HashMap::new()),
    }
}

fn respond_json(request: tiny_http::Request, status: u16, body: &Value) {
    let response = tiny_http::Response::from_string(body.to_string())
        .with_status_code(tiny_http::StatusCode(status))
        .with_header(
            tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .unwrap(),
        );
    let _ = request.respond(response);
}

fn respond_empty(request: tiny_http::Request, status: u16) {
    let _ = request.respond(tiny_http::Response::empty(tiny_http::StatusCode(status)));
}
