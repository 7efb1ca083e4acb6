#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use analysis_engine::EngineProcess;
use rand::{rngs::StdRng, SeedableRng};
use server::config::Config;
use server::settings::Settings;
use server::state::{AnalysisState, AppState};
use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
pub const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";

/// Scripted UCI engine on an in-memory pipe.
///
/// Answers the handshake, and replies to every `go` with `script`. The
/// join handle yields every command the engine received.
pub fn fake_engine(
    name: &str,
    is_maia: bool,
    script: &[&str],
) -> (EngineProcess, JoinHandle<Vec<String>>) {
    scripted_engine(name, is_maia, "go", script)
}

/// Engine that searches until told to `stop`, then replies with `script`
pub fn stalling_engine(name: &str, script: &[&str]) -> (EngineProcess, JoinHandle<Vec<String>>) {
    scripted_engine(name, false, "stop", script)
}

fn scripted_engine(
    name: &str,
    is_maia: bool,
    trigger: &'static str,
    script: &[&str],
) -> (EngineProcess, JoinHandle<Vec<String>>) {
    let (ours, theirs) = duplex(64 * 1024);
    let (read, write) = split(ours);
    let engine = EngineProcess::from_io(name, is_maia, write, read);

    let script: Vec<String> = script.iter().map(|l| l.to_string()).collect();
    let handle = tokio::spawn(async move {
        let (peer_read, mut peer_write) = split(theirs);
        let mut lines = BufReader::new(peer_read).lines();
        let mut seen = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            let reply = match line.as_str() {
                "uci" => "id name Fake\nuciok\n".to_string(),
                "isready" => "readyok\n".to_string(),
                "quit" => {
                    seen.push(line);
                    break;
                }
                cmd if cmd.split_whitespace().next() == Some(trigger) => {
                    let mut out = script.join("\n");
                    out.push('\n');
                    out
                }
                _ => String::new(),
            };
            seen.push(line);
            if !reply.is_empty() && peer_write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
        seen
    });

    (engine, handle)
}

pub struct TestServer {
    pub base: String,
    pub addr: SocketAddr,
    pub state: AppState,
    pub orchestrator: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Stop the orchestrator and wait for it to quit its engines
    pub async fn shutdown(self) {
        self.state
            .inputs
            .send(server::orchestrator::OrchestratorInput::Shutdown)
            .await
            .expect("orchestrator already stopped");
        timeout(Duration::from_secs(2), self.orchestrator)
            .await
            .expect("orchestrator did not stop")
            .expect("orchestrator panicked");
    }
}

pub fn test_config() -> Config {
    Config {
        poll_interval: Duration::from_millis(5),
        ..Config::default()
    }
}

/// Start the full server on an ephemeral port
pub async fn spawn_server(engines: Vec<EngineProcess>, settings: Settings) -> TestServer {
    spawn_server_with(engines, settings, test_config()).await
}

pub async fn spawn_server_with(
    engines: Vec<EngineProcess>,
    settings: Settings,
    config: Config,
) -> TestServer {
    let analysis = AnalysisState::new(StdRng::seed_from_u64(7));
    let (state, orchestrator) = server::start(engines, settings, analysis, &config);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    let app = server::router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    TestServer {
        base: format!("http://{addr}"),
        addr,
        state,
        orchestrator,
    }
}

/// Collect outbound lines until `done` matches one, or fail after two seconds
pub async fn collect_until(
    rx: &mut broadcast::Receiver<String>,
    done: impl Fn(&str) -> bool,
) -> Vec<String> {
    let mut seen = Vec::new();
    let finished = timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(line) => {
                    let finished = done(&line);
                    seen.push(line);
                    if finished {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await;
    assert!(finished.is_ok(), "Timed out waiting for commands, saw {seen:?}");
    seen
}

/// Everything broadcast so far, without waiting
pub fn drain(rx: &mut broadcast::Receiver<String>) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(line) => seen.push(line),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    seen
}
