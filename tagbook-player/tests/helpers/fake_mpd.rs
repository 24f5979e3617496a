//! Minimal MPD server for client tests
//!
//! Accepts connections on a local port, greets like MPD and answers each
//! request line with a canned response chosen by command name. Unscripted
//! commands get a bare `OK`. Every request line is recorded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const GREETING: &str = "OK MPD 0.23.5\n";

/// `status` body of an idle daemon with an empty queue
pub const IDLE_STATUS: &str = "volume: 50\nrepeat: 0\nrandom: 0\nsingle: 0\nconsume: 0\n\
playlist: 1\nplaylistlength: 0\nmixrampdb: 0.000000\nstate: stop\nOK\n";

fn default_responses() -> HashMap<String, String> {
    [
        ("update", "updating_db: 1\nOK\n"),
        ("addid", "Id: 1\nOK\n"),
        ("status", IDLE_STATUS),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug)]
pub struct FakeMpdServer {
    pub port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    responses: Arc<Mutex<HashMap<String, String>>>,
    connections: Arc<Mutex<usize>>,
    task: JoinHandle<()>,
}

impl FakeMpdServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(default_responses()));
        let connections = Arc::new(Mutex::new(0));

        let task = {
            let requests = Arc::clone(&requests);
            let responses = Arc::clone(&responses);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    *connections.lock().unwrap() += 1;
                    let requests = Arc::clone(&requests);
                    let responses = Arc::clone(&responses);
                    tokio::spawn(async move {
                        let (read, mut write) = stream.into_split();
                        let mut lines = BufReader::new(read).lines();
                        if write.write_all(GREETING.as_bytes()).await.is_err() {
                            return;
                        }
                        while let Ok(Some(line)) = lines.next_line().await {
                            requests.lock().unwrap().push(line.clone());
                            let name = line.split_whitespace().next().unwrap_or("").to_string();
                            if name == "close" {
                                return;
                            }
                            let response = responses
                                .lock()
                                .unwrap()
                                .get(&name)
                                .cloned()
                                .unwrap_or_else(|| "OK\n".to_string());
                            if response == "HANGUP" {
                                return;
                            }
                            if response == "SILENCE" {
                                continue;
                            }
                            if write.write_all(response.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                    });
                }
            })
        };

        Self {
            port,
            requests,
            responses,
            connections,
            task,
        }
    }

    /// Answer `command` with `response` (must include the terminator line)
    ///
    /// `HANGUP` closes the connection instead; `SILENCE` never answers.
    pub fn respond(&self, command: &str, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), response.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        *self.connections.lock().unwrap()
    }
}

impl Drop for FakeMpdServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
