//! Scripted stand-in for an FRR daemon's VTY socket.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use vty_core::StatusCode;
use vty_core::frame::encode_response;

type Handler = dyn Fn(&str) -> (Vec<u8>, StatusCode) + Send + Sync;

/// A fake daemon listening on a Unix socket.
pub struct FakeDaemon {
    pub path: PathBuf,
    commands: Arc<Mutex<Vec<Vec<u8>>>>,
    task: JoinHandle<()>,
}

impl FakeDaemon {
    /// Listen at `path`, answering each command with `handler(cmd)`.
    ///
    /// Responses are written `chunk` bytes at a time.
    pub fn spawn<F>(path: &Path, chunk: usize, handler: F) -> Self
    where
        F: Fn(&str) -> (Vec<u8>, StatusCode) + Send + Sync + 'static,
    {
        let listener = UnixListener::bind(path).expect("Failed to bind fake daemon socket");
        let commands = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let log = commands.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let log = log.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    serve(stream, chunk, handler, log).await;
                });
            }
        });

        Self {
            path: path.to_path_buf(),
            commands,
            task,
        }
    }

    /// Daemon that answers everything with `CMD_SUCCESS` and empty output,
    /// except `do write terminal`, which returns `running`.
    pub fn with_running_config(path: &Path, running: &str) -> Self {
        let running = running.as_bytes().to_vec();
        Self::spawn(path, 4096, move |cmd| match cmd {
            "do write terminal" => (running.clone(), StatusCode::Success),
            _ => (Vec::new(), StatusCode::Success),
        })
    }

    /// Commands received so far, across all connections.
    pub fn commands(&self) -> Vec<String> {
        self.raw_commands()
            .iter()
            .map(|cmd| String::from_utf8_lossy(cmd).into_owned())
            .collect()
    }

    /// Commands exactly as they arrived on the socket, without the NUL.
    #[allow(dead_code)]
    pub fn raw_commands(&self) -> Vec<Vec<u8>> {
        self.commands.lock().unwrap().clone()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: UnixStream, chunk: usize, handler: Arc<Handler>, log: Arc<Mutex<Vec<Vec<u8>>>>) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        pending.extend_from_slice(&buf[..n]);

        while let Some(pos) = pending.iter().position(|b| *b == 0) {
            let raw: Vec<u8> = pending.drain(..=pos).take(pos).collect();
            let cmd = String::from_utf8_lossy(&raw).into_owned();
            log.lock().unwrap().push(raw);

            let (plaintext, status) = handler(&cmd);
            let encoded = encode_response(&plaintext, status);
            for piece in encoded.chunks(chunk.max(1)) {
                if stream.write_all(piece).await.is_err() {
                    return;
                }
                if chunk < encoded.len() {
                    // Give the client a chance to see the partial response.
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}
