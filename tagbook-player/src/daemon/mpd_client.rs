//! MPD client
//!
//! Wraps the blocking `mpd` crate client. Each request runs on the blocking
//! pool and is bounded twice: by socket read/write timeouts, and by a tokio
//! timeout around the whole call. A timed-out or dropped connection is
//! discarded and re-established on the next call, so a daemon restart only
//! costs the poll cycles that happen while it is down.

use super::{AudioDaemon, AudioFile, DaemonState, DaemonStatus};
use crate::error::{Error, Result};
use crate::types::BookId;
use ::mpd::status::State;
use ::mpd::{Client, Query, Song, Term};
use async_trait::async_trait;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task;
use tokio::time::timeout;
use tracing::{debug, info, warn};

type Connection = Client<TcpStream>;

/// MPD control connection
pub struct MpdClient {
    host: String,
    port: u16,
    timeout: Duration,
    conn: Option<Connection>,
    version: Option<String>,
    closed: bool,
}

impl MpdClient {
    /// Connect to the daemon and prepare it for book playback
    ///
    /// Rescans the music library so freshly copied books are found, and
    /// empties any queue left over from a previous run.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let mut client = Self {
            host: host.to_string(),
            port,
            timeout,
            conn: None,
            version: None,
            closed: false,
        };

        client.call("update", |c| c.update().map(|_| ())).await?;
        client.call("clear", |c| c.clear()).await?;

        Ok(client)
    }

    /// Protocol version announced by the daemon
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    async fn open(&mut self) -> Result<Connection> {
        let host = self.host.clone();
        let port = self.port;
        let limit = self.timeout;

        let opened = task::spawn_blocking(move || open_blocking(&host, port, limit));
        let conn = match timeout(limit, opened).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(Error::DaemonUnavailable(format!("connect task failed: {}", e))),
            Err(_) => return Err(Error::DaemonTimeout("connect".to_string())),
        };

        let v = &conn.version;
        let version = format!("{}.{}.{}", v.0, v.1, v.2);
        info!(
            "Connected to audio daemon at {}:{} (protocol {})",
            self.host, self.port, version
        );
        self.version = Some(version);

        Ok(conn)
    }

    /// Run one request on the blocking pool
    ///
    /// The connection is moved into the blocking task and handed back with
    /// the result. Server `ACK`s leave it in place; any other failure drops it.
    async fn call<T, F>(&mut self, op: &'static str, request: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> ::mpd::error::Result<T> + Send + 'static,
    {
        if self.closed {
            return Err(Error::DaemonUnavailable("connection closed".to_string()));
        }
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open().await?,
        };

        debug!("mpd <- {}", op);
        let running = task::spawn_blocking(move || {
            let result = request(&mut conn);
            (conn, result)
        });

        match timeout(self.timeout, running).await {
            Ok(Ok((conn, Ok(value)))) => {
                self.conn = Some(conn);
                Ok(value)
            }
            Ok(Ok((conn, Err(::mpd::error::Error::Server(ack))))) => {
                self.conn = Some(conn);
                Err(Error::DaemonCommand {
                    command: op.to_string(),
                    message: ack.detail,
                })
            }
            Ok(Ok((_, Err(e)))) => {
                // Stream position is unknown now; start over next time
                warn!("Dropping audio daemon connection after '{}': {}", op, e);
                Err(map_error(op, e))
            }
            Ok(Err(e)) => Err(Error::DaemonUnavailable(format!("'{}' task failed: {}", op, e))),
            Err(_) => {
                warn!("Audio daemon did not answer '{}' within {:?}", op, self.timeout);
                Err(Error::DaemonTimeout(op.to_string()))
            }
        }
    }
}

fn open_blocking(host: &str, port: u16, limit: Duration) -> Result<Connection> {
    let unavailable = |e: io::Error| Error::DaemonUnavailable(format!("{}:{}: {}", host, port, e));

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(unavailable)?
        .next()
        .ok_or_else(|| Error::DaemonUnavailable(format!("{}:{}: no address", host, port)))?;

    let stream = TcpStream::connect_timeout(&addr, limit).map_err(unavailable)?;
    stream.set_read_timeout(Some(limit)).map_err(unavailable)?;
    stream.set_write_timeout(Some(limit)).map_err(unavailable)?;
    stream.set_nodelay(true).map_err(unavailable)?;

    Client::new(stream).map_err(|e| map_error("connect", e))
}

fn map_error(op: &str, err: ::mpd::error::Error) -> Error {
    use ::mpd::error::Error as MpdError;

    match err {
        MpdError::Io(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            Error::DaemonTimeout(op.to_string())
        }
        MpdError::Io(e) => Error::DaemonUnavailable(format!("'{}': {}", op, e)),
        MpdError::Server(ack) => Error::DaemonCommand {
            command: op.to_string(),
            message: ack.detail,
        },
        other => Error::DaemonProtocol(format!("'{}': {}", op, other)),
    }
}

fn to_status(status: ::mpd::Status) -> DaemonStatus {
    DaemonStatus {
        state: match status.state {
            State::Play => DaemonState::Play,
            State::Pause => DaemonState::Pause,
            State::Stop => DaemonState::Stop,
        },
        volume: u8::try_from(status.volume).ok(),
        song: status.song.map(|place| place.pos),
        elapsed: status.elapsed.map(|d| d.as_secs_f64()),
        playlist_length: status.queue_len,
    }
}

fn to_audio_file(song: Song) -> AudioFile {
    AudioFile::new(song.file, song.duration.map(|d| d.as_secs_f64()))
}

#[async_trait]
impl AudioDaemon for MpdClient {
    async fn clear(&mut self) -> Result<()> {
        self.call("clear", |c| c.clear()).await
    }

    async fn enqueue(&mut self, path: &str) -> Result<()> {
        let song = Song {
            file: path.to_string(),
            ..Default::default()
        };
        self.call("add", move |c| c.push(&song).map(|_| ())).await
    }

    async fn play(&mut self) -> Result<()> {
        self.call("play", |c| c.play()).await
    }

    async fn pause(&mut self) -> Result<()> {
        self.call("pause", |c| c.pause(true)).await
    }

    async fn stop(&mut self) -> Result<()> {
        self.call("stop", |c| c.stop()).await
    }

    async fn seek(&mut self, part_index: u32, seconds: f64) -> Result<()> {
        let seconds = seconds.max(0.0);
        self.call("seek", move |c| c.seek(part_index, seconds)).await
    }

    async fn set_volume(&mut self, percent: u8) -> Result<()> {
        let volume = percent.min(100) as i8;
        self.call("setvol", move |c| c.volume(volume)).await
    }

    async fn status(&mut self) -> Result<DaemonStatus> {
        self.call("status", |c| c.status()).await.map(to_status)
    }

    async fn current_item(&mut self) -> Result<Option<AudioFile>> {
        self.call("currentsong", |c| c.currentsong())
            .await
            .map(|song| song.map(to_audio_file))
    }

    async fn find_files(&mut self, book_id: &BookId) -> Result<Vec<AudioFile>> {
        let id = book_id.as_str().to_string();
        let songs = self
            .call("search", move |c| {
                c.search(&Query::new().and(Term::File, id), None::<(u32, u32)>)
            })
            .await?;
        Ok(songs.into_iter().map(to_audio_file).collect())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.closed = true;
        if let Some(mut conn) = self.conn.take() {
            // The daemon hangs up on "close" without answering
            let closing = task::spawn_blocking(move || {
                let _ = conn.close();
            });
            let _ = timeout(self.timeout, closing).await;
            info!("Disconnected from audio daemon");
        }
        Ok(())
    }
}
