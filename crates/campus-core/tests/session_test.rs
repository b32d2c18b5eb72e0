// End-to-end session tests: a channel-backed socket transport feeding
// frames, wiremock standing in for the incident API.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use campus_api::websocket::{Connection, Transport};
use campus_core::{
    ClientConfig, ConnectionState, Controller, HistoryStore, JsonFileHistory, ListBody,
    MemoryHistory, Severity,
};

// ── Channel transport ───────────────────────────────────────────────

#[derive(Clone, Default)]
struct ChannelTransport {
    pending: Arc<Mutex<VecDeque<mpsc::UnboundedReceiver<String>>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl ChannelTransport {
    /// Queue one connection; frames sent on the returned handle arrive on it.
    fn accept(&self) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.lock().unwrap().push_back(rx);
        tx
    }
}

struct ChannelConnection {
    rx: mpsc::UnboundedReceiver<String>,
}

impl Transport for ChannelTransport {
    type Conn = ChannelConnection;

    async fn open(&self, url: &Url) -> Result<Self::Conn, campus_api::Error> {
        self.urls.lock().unwrap().push(url.to_string());
        let next = self.pending.lock().unwrap().pop_front();
        next.map(|rx| ChannelConnection { rx })
            .ok_or_else(|| campus_api::Error::WebSocketConnect("refused".into()))
    }
}

impl Connection for ChannelConnection {
    async fn next_text(&mut self) -> Option<Result<String, campus_api::Error>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) {}
}

// ── Helpers ─────────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

fn config(server: &MockServer) -> ClientConfig {
    let api = format!("{}/dev", server.uri()).parse().unwrap();
    let mut config = ClientConfig::new(api, "wss://ws.example.edu/dev", "ana@uni.edu");
    config.settle_delay = Duration::from_millis(20);
    config.mutation_refresh_delay = Duration::from_millis(20);
    config
}

fn controller(
    config: ClientConfig,
    transport: &ChannelTransport,
    history: Arc<dyn HistoryStore>,
) -> Controller<ChannelTransport> {
    Controller::with_transport(config, transport.clone(), history, None).unwrap()
}

async fn wait_until<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("condition not reached in time")
        .unwrap();
}

async fn mount_list(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/dev/incidentes"))
        .and(header("x-user-email", "ana@uni.edu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn list_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == "/dev/incidentes")
        .count()
}

const ASSIGNED: &str = r#"{"action":"estado_change","incidente_id":"42","titulo":"Leak",
    "old_estado":"pendiente","new_estado":"asignado","mensaje":"Assigned to Walter",
    "timestamp":"2024-11-16T10:15:00"}"#;

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn state_change_notifies_and_refetches() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        json!([{ "id": "42", "titulo": "Leak", "estado": "asignado" }]),
    )
    .await;

    let transport = ChannelTransport::default();
    let socket = transport.accept();
    let session = controller(config(&server), &transport, Arc::new(MemoryHistory::new()));

    let mut connection = session.connection_state();
    let mut list = session.list();
    let mut toasts = session.toasts();

    session.start().await.unwrap();
    wait_until(&mut connection, ConnectionState::is_open).await;
    wait_until(&mut list, |s| s.version >= 1).await;
    assert_eq!(
        transport.urls.lock().unwrap().clone(),
        vec!["wss://ws.example.edu/dev?email=ana%40uni.edu".to_owned()]
    );

    socket.send(ASSIGNED.to_owned()).unwrap();
    wait_until(&mut toasts, |t| t.len() == 1).await;
    wait_until(&mut list, |s| s.version >= 2).await;

    let toast = session.toasts().borrow().first().cloned().unwrap();
    assert_eq!(toast.notification.kind, Severity::Warning);
    assert_eq!(toast.notification.subject_id, "42");
    assert_eq!(session.history().len(), 1);
    assert_eq!(list_requests(&server).await, 2);

    let ListBody::Rows(rows) = session.list_view().body else {
        panic!("expected rows");
    };
    assert_eq!(rows[0].status.as_deref(), Some("asignado"));

    session.stop().await;
    assert_eq!(session.current_connection_state(), ConnectionState::Idle);
}

#[tokio::test]
async fn scan_body_with_stringified_numbers_renders_after_state_change() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        json!({
            "Items": [
                { "id": "42", "titulo": "Leak", "estado": "asignado",
                  "veces_reportado": "0", "piso": "2",
                  "Fecha_creacion": "2024-11-16T10:00:00" },
                { "id": "43", "titulo": "Door", "estado": "pendiente",
                  "veces_reportado": "4",
                  "Fecha_creacion": "2024-11-15T09:00:00" }
            ],
            "Count": "2",
            "ScannedCount": "2"
        }),
    )
    .await;

    let transport = ChannelTransport::default();
    let socket = transport.accept();
    let session = controller(config(&server), &transport, Arc::new(MemoryHistory::new()));

    let mut connection = session.connection_state();
    let mut list = session.list();
    session.start().await.unwrap();
    wait_until(&mut connection, ConnectionState::is_open).await;
    wait_until(&mut list, |s| s.version >= 1).await;

    socket.send(ASSIGNED.to_owned()).unwrap();
    wait_until(&mut list, |s| s.version >= 2).await;

    let view = session.list_view();
    assert!(view.error.is_none(), "unexpected error: {:?}", view.error);
    let ListBody::Rows(rows) = view.body else {
        panic!("expected rows");
    };
    let counts: Vec<(&str, Option<u32>)> = rows
        .iter()
        .map(|i| (i.id.as_str(), i.report_count))
        .collect();
    assert_eq!(counts, vec![("42", Some(0)), ("43", Some(4))]);

    session.stop().await;
}

#[tokio::test]
async fn malformed_frames_change_nothing() {
    let server = MockServer::start().await;
    mount_list(&server, json!([])).await;

    let transport = ChannelTransport::default();
    let socket = transport.accept();
    let session = controller(config(&server), &transport, Arc::new(MemoryHistory::new()));

    let mut list = session.list();
    session.start().await.unwrap();
    wait_until(&mut list, |s| s.version >= 1).await;

    socket.send("not json".to_owned()).unwrap();
    socket.send(r#"{"action":"estado_change"}"#.to_owned()).unwrap();
    socket.send(r#"{"action":"ping"}"#.to_owned()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(session.toasts().borrow().is_empty());
    assert!(session.history().is_empty());
    assert_eq!(list_requests(&server).await, 1);
    assert!(session.current_connection_state().is_open());

    session.stop().await;
}

#[tokio::test]
async fn fetch_failure_is_inline_and_channel_stays_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/incidentes"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "scan failed" })))
        .mount(&server)
        .await;

    let transport = ChannelTransport::default();
    let _socket = transport.accept();
    let session = controller(config(&server), &transport, Arc::new(MemoryHistory::new()));

    let mut connection = session.connection_state();
    let mut list = session.list();
    session.start().await.unwrap();

    wait_until(&mut list, |s| s.error.is_some()).await;
    wait_until(&mut connection, ConnectionState::is_open).await;

    let view = session.list_view();
    assert!(view.error.unwrap().contains("scan failed"));

    session.stop().await;
}

#[tokio::test]
async fn creation_notice_triggers_refresh() {
    let server = MockServer::start().await;
    mount_list(&server, json!({ "incidents": [] })).await;

    let transport = ChannelTransport::default();
    let socket = transport.accept();
    let session = controller(config(&server), &transport, Arc::new(MemoryHistory::new()));

    let mut list = session.list();
    session.start().await.unwrap();
    wait_until(&mut list, |s| s.version >= 1).await;

    socket
        .send(r#"{"action":"new_incidente","item":{"id":"n1"}}"#.to_owned())
        .unwrap();
    wait_until(&mut list, |s| s.version >= 2).await;

    assert!(session.toasts().borrow().is_empty());
    session.stop().await;
}

#[tokio::test]
async fn completing_refreshes_after_delay() {
    let server = MockServer::start().await;
    mount_list(&server, json!([])).await;
    Mock::given(method("PUT"))
        .and(path("/dev/incidentes/42/completar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "estado": "resuelto" })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ChannelTransport::default();
    let _socket = transport.accept();
    let session = controller(config(&server), &transport, Arc::new(MemoryHistory::new()));

    let mut list = session.list();
    session.start().await.unwrap();
    wait_until(&mut list, |s| s.version >= 1).await;

    session.complete_incident("42").await.unwrap();
    wait_until(&mut list, |s| s.version >= 2).await;

    session.stop().await;
}

#[tokio::test]
async fn history_persists_across_sessions() {
    let server = MockServer::start().await;
    mount_list(&server, json!([])).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let transport = ChannelTransport::default();
    let socket = transport.accept();
    let first = controller(
        config(&server),
        &transport,
        Arc::new(JsonFileHistory::new(&path)),
    );
    let mut toasts = first.toasts();
    first.start().await.unwrap();
    socket.send(ASSIGNED.to_owned()).unwrap();
    wait_until(&mut toasts, |t| !t.is_empty()).await;
    first.stop().await;

    let second = controller(
        config(&server),
        &ChannelTransport::default(),
        Arc::new(JsonFileHistory::new(&path)),
    );
    let history = second.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].incident_id, "42");
    assert_eq!(history[0].new_state, "asignado");
}

#[tokio::test]
async fn stopped_controller_cannot_restart() {
    let server = MockServer::start().await;
    mount_list(&server, json!([])).await;

    let transport = ChannelTransport::default();
    let session = controller(config(&server), &transport, Arc::new(MemoryHistory::new()));
    session.stop().await;
    assert!(session.start().await.is_err());
}
