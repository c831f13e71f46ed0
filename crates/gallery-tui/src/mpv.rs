/// mpv IPC driver with separated reader/writer tasks.
///
/// Architecture:
///
/// ```text
///   MpvDriver::spawn() + MpvDriver::connect()
///         │
///         ├── writer_task   ← receives MpvRequest via mpsc, serialises → socket
///         └── reader_task   ← reads JSON lines from socket
///                                ├── response (has request_id) → matched oneshot::Sender
///                                └── event                     → event_tx channel
/// ```
///
/// Public API:
///   - `MpvHandle`: cheaply cloneable.  `send(cmd)` returns a `Future<Value>`.
///   - `MpvDriver`: owns the process; respawned lazily when it died.
///     `spawn` is synchronous, `connect` waits for the socket off the caller's task.
///   - `EntryTagger`: maps mpv playlist entries back to player generations.
///
/// Platform notes:
/// - Unix:   Unix domain sockets
/// - Windows: Named pipes  \\.\pipe\<name>
use gallery_core::player::PlayerEvent;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

// ── global request-id counter ─────────────────────────────────────────────────

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

/// Synthetic event pushed by the reader when the IPC connection ends.
pub const IPC_CLOSED_EVENT: &str = "ipc-closed";

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

// ── internal channel types ────────────────────────────────────────────────────

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An mpv event that arrived unsolicited (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// Returns the event name, e.g. "end-file", "start-file", "file-loaded".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    pub fn playlist_entry_id(&self) -> Option<i64> {
        self.raw.get("playlist_entry_id")?.as_i64()
    }

    /// True when mpv is gone (quit from its own window, crashed, socket closed).
    pub fn is_disconnect(&self) -> bool {
        matches!(self.event_name(), Some("shutdown") | Some(IPC_CLOSED_EVENT))
    }
}

// ── public handle ─────────────────────────────────────────────────────────────

/// Cloneable handle to the mpv writer task.  Use `send()` to fire a command
/// and await the response.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process and manages (re)connection.
pub struct MpvDriver {
    pub socket_name: String,
    process: Option<tokio::process::Child>,
    binary: Option<PathBuf>,
    pub volume: f32,
}

impl MpvDriver {
    pub fn new(binary: Option<PathBuf>, volume: f32) -> Self {
        Self {
            socket_name: gallery_core::platform::mpv_socket_name(),
            process: None,
            binary,
            volume,
        }
    }

    pub fn process_alive(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    if let Some(code) = status.code() {
                        warn!("mpv process exited with code: {}", code);
                    } else {
                        warn!("mpv process terminated by signal");
                    }
                    false
                }
                Err(e) => {
                    warn!("mpv process_alive check failed: {}", e);
                    false
                }
            }
        } else {
            false
        }
    }

    /// Kill the process if running.
    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn command(&self) -> anyhow::Result<tokio::process::Command> {
        let mpv_binary = gallery_core::platform::find_mpv_binary(self.binary.as_ref())
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let vol_arg = format!(
            "--volume={}",
            (self.volume * 100.0).clamp(0.0, 100.0).round() as i64
        );
        let mut cmd = tokio::process::Command::new(&mpv_binary);
        cmd.arg("--idle=yes")
            .arg("--force-window=no")
            .arg("--keep-open=no")
            .arg("--pause")
            .arg(gallery_core::platform::mpv_socket_arg())
            .arg("--quiet")
            .arg(vol_arg)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .kill_on_drop(true);
        Ok(cmd)
    }

    // ── spawn / reconnect ─────────────────────────────────────────────────────

    /// Start a fresh mpv process, killing any previous one. Returns as soon
    /// as the process exists; `connect` waits for its IPC endpoint.
    pub fn spawn(&mut self) -> anyhow::Result<()> {
        if let Some(mut p) = self.process.take() {
            let _ = p.start_kill();
        }

        #[cfg(unix)]
        let _ = std::fs::remove_file(&self.socket_name);

        info!("mpv: spawning new process");
        let mut cmd = self.command()?;
        #[cfg(unix)]
        {
            let stderr_path = gallery_core::platform::data_dir().join("mpv-stderr.log");
            let stderr_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&stderr_path)?;
            info!("mpv: logging stderr to {:?}", stderr_path);
            cmd.stderr(stderr_file);
        }
        #[cfg(windows)]
        cmd.stderr(std::process::Stdio::null());

        let child = cmd.spawn()?;
        info!("mpv: spawned process with pid {:?}", child.id());
        self.process = Some(child);
        Ok(())
    }

    /// Wait for the IPC socket of a just-spawned process and connect to it.
    /// Owns its arguments so it can run on its own task.
    #[cfg(unix)]
    pub async fn connect(
        socket_name: String,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        let socket_path = PathBuf::from(socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(Self::start_io_tasks(BufReader::new(read_half), write_half, event_tx))
    }

    #[cfg(windows)]
    pub async fn connect(
        socket_name: String,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        let pipe_path = format!(r"\\.\pipe\{}", socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            match ClientOptions::new().open(&pipe_path) {
                Ok(client) => {
                    info!("mpv: connected to named pipe");
                    let (read_half, write_half) = tokio::io::split(client);
                    return Ok(Self::start_io_tasks(
                        BufReader::new(read_half),
                        write_half,
                        event_tx,
                    ));
                }
                Err(_) => continue,
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }

    fn start_io_tasks<R, W>(
        reader: BufReader<R>,
        writer: W,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> MpvHandle
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
        W: tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        // pending map: req_id → reply channel.  Shared between writer (inserts) and reader (resolves).
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

        tokio::spawn(writer_task(writer, cmd_rx, pending.clone()));
        tokio::spawn(reader_task(reader, pending, event_tx));

        MpvHandle { tx: cmd_tx }
    }
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    // This is a command response: route to pending request
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            debug!("mpv reader: response req={} ok", req_id);
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error").to_string();
                            debug!("mpv reader: response req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    } else {
                        debug!("mpv reader: response for unknown req={}", req_id);
                    }
                } else {
                    debug!("mpv reader: event {}", trimmed);
                    let _ = event_tx.send(MpvEvent { raw: val }).await;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, &format!("mpv IPC read error: {}", e)).await;
                break;
            }
        }
    }
    let _ = event_tx
        .send(MpvEvent {
            raw: json!({ "event": IPC_CLOSED_EVENT }),
        })
        .await;
}

async fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register reply channel before writing so reader can match it
        {
            let mut map = pending.lock().await;
            map.insert(req.req_id, req.reply);
        }
        debug!(
            "mpv writer: send req={} payload={}",
            req.req_id,
            req.payload.trim()
        );
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── convenience wrappers ──────────────────────────────────────────────────────

impl MpvHandle {
    /// Replace the current source with `url`, paused. Returns mpv's
    /// playlist entry id for the new file when the mpv version reports it.
    pub async fn load_paused(&self, url: &str) -> anyhow::Result<Option<i64>> {
        self.send(json!(["set_property", "pause", true])).await?;
        debug!("mpv: sending loadfile command for url={}", url);
        let resp = self.send(json!(["loadfile", url, "replace"])).await?;
        debug!("mpv: loadfile response: {:?}", resp);
        Ok(resp["data"]["playlist_entry_id"].as_i64())
    }

    pub async fn play(&self) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", false])).await?;
        Ok(())
    }

    /// Pause, drop the source and its buffers.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let _ = self.send(json!(["set_property", "pause", true])).await;
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    pub async fn quit(&self) {
        let _ = self.send(json!(["quit"])).await;
    }
}

// ── generation tagging ────────────────────────────────────────────────────────

/// Translates raw mpv events into player callbacks carrying the generation of
/// the `Load` that produced them.
///
/// `loadfile` replies carry the new playlist entry id (mpv ≥ 0.38); older
/// versions don't, so such loads queue their generation and bind to the
/// next `start-file` that names an unknown entry.
#[derive(Debug, Default)]
pub struct EntryTagger {
    by_entry: HashMap<i64, u64>,
    unbound: VecDeque<u64>,
    current_entry: Option<i64>,
}

impl EntryTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which generation a `loadfile` was issued for.
    pub fn register(&mut self, entry_id: Option<i64>, generation: u64) {
        match entry_id {
            Some(id) => {
                self.by_entry.insert(id, generation);
            }
            None => self.unbound.push_back(generation),
        }
    }

    /// Forget everything (mpv was restarted and entry ids start over).
    pub fn reset(&mut self) {
        self.by_entry.clear();
        self.unbound.clear();
        self.current_entry = None;
    }

    pub fn translate(&mut self, event: &MpvEvent) -> Option<PlayerEvent> {
        match event.event_name()? {
            "start-file" => {
                let entry = event.playlist_entry_id()?;
                if !self.by_entry.contains_key(&entry) {
                    if let Some(generation) = self.unbound.pop_front() {
                        self.by_entry.insert(entry, generation);
                    }
                }
                self.current_entry = Some(entry);
                None
            }
            "file-loaded" => {
                let generation = *self.by_entry.get(&self.current_entry?)?;
                Some(PlayerEvent::DataReady { generation })
            }
            "end-file" => {
                let entry = event.playlist_entry_id().or(self.current_entry)?;
                if self.current_entry == Some(entry) {
                    self.current_entry = None;
                }
                let generation = self.by_entry.remove(&entry)?;
                if event.raw.get("reason").and_then(|r| r.as_str()) == Some("error") {
                    let reason = event
                        .raw
                        .get("file_error")
                        .and_then(|r| r.as_str())
                        .unwrap_or("unknown error")
                        .to_string();
                    Some(PlayerEvent::LoadFailed { generation, reason })
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
