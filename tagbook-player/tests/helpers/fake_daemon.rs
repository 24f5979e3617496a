//! In-process audio daemon double
//!
//! Behaves like a small MPD: a queue, a transport state, a library searched
//! by substring. Clones share state, so a test keeps one handle while the
//! controller owns another.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tagbook_player::daemon::{AudioDaemon, AudioFile, DaemonState, DaemonStatus};
use tagbook_player::{BookId, Error, Result};

/// One daemon call, as seen by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Clear,
    Enqueue(String),
    Play,
    Pause,
    Stop,
    Seek(u32, f64),
    SetVolume(u8),
    Status,
    CurrentItem,
    FindFiles(String),
    Disconnect,
}

#[derive(Debug)]
struct State {
    transport: DaemonState,
    volume: Option<u8>,
    song: Option<u32>,
    elapsed: Option<f64>,
    queue: Vec<String>,
    library: Vec<AudioFile>,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    untimed_search: bool,
    yield_on_calls: bool,
    connected: bool,
}

#[derive(Debug, Clone)]
pub struct FakeDaemon {
    state: Arc<Mutex<State>>,
}

impl Default for FakeDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                transport: DaemonState::Stop,
                volume: Some(50),
                song: None,
                elapsed: None,
                queue: Vec::new(),
                library: Vec::new(),
                calls: Vec::new(),
                failing: HashSet::new(),
                untimed_search: false,
                yield_on_calls: false,
                connected: true,
            })),
        }
    }

    /// Daemon whose library holds `(path, duration)` files
    pub fn with_library(files: &[(&str, f64)]) -> Self {
        let daemon = Self::new();
        daemon.lock().library = files
            .iter()
            .map(|(path, duration)| AudioFile::new(*path, Some(*duration)))
            .collect();
        daemon
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Add a library file without a known duration
    pub fn add_untimed(&self, path: &str) {
        self.lock().library.push(AudioFile::new(path, None));
    }

    /// Leave durations out of search results; the current item still
    /// reports them
    pub fn strip_search_durations(&self) {
        self.lock().untimed_search = true;
    }

    /// Yield to the scheduler at the start of every call, like a real
    /// daemon round trip would
    pub fn yield_on_calls(&self) {
        self.lock().yield_on_calls = true;
    }

    async fn round_trip(&self) {
        let yielding = self.lock().yield_on_calls;
        if yielding {
            tokio::task::yield_now().await;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls other than status queries, which every operation makes
    pub fn commands(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Status | Call::CurrentItem))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn queue(&self) -> Vec<String> {
        self.lock().queue.clone()
    }

    pub fn transport(&self) -> DaemonState {
        self.lock().transport
    }

    pub fn volume(&self) -> Option<u8> {
        self.lock().volume
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Pretend playback advanced to (`song`, `elapsed`)
    pub fn set_playing(&self, song: u32, elapsed: f64) {
        let mut state = self.lock();
        state.transport = DaemonState::Play;
        state.song = Some(song);
        state.elapsed = Some(elapsed);
    }

    /// Pretend the daemon ran off the end of the queue
    pub fn set_stopped(&self) {
        let mut state = self.lock();
        state.transport = DaemonState::Stop;
        state.song = None;
        state.elapsed = None;
    }

    pub fn set_paused(&self) {
        self.lock().transport = DaemonState::Pause;
    }

    /// Make every call of `operation` time out until [`heal`](Self::heal)
    pub fn fail(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    pub fn heal(&self, operation: &'static str) {
        self.lock().failing.remove(operation);
    }

    fn record(&self, call: Call, operation: &'static str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call);
        if !state.connected {
            return Err(Error::DaemonUnavailable("connection closed".to_string()));
        }
        if state.failing.contains(operation) {
            return Err(Error::DaemonTimeout(operation.to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl AudioDaemon for FakeDaemon {
    async fn clear(&mut self) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::Clear, "clear")?;
        state.queue.clear();
        state.transport = DaemonState::Stop;
        state.song = None;
        state.elapsed = None;
        Ok(())
    }

    async fn enqueue(&mut self, path: &str) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::Enqueue(path.to_string()), "enqueue")?;
        state.queue.push(path.to_string());
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::Play, "play")?;
        if !state.queue.is_empty() {
            state.transport = DaemonState::Play;
            state.song = Some(state.song.unwrap_or(0));
            state.elapsed = Some(state.elapsed.unwrap_or(0.0));
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::Pause, "pause")?;
        if state.transport == DaemonState::Play {
            state.transport = DaemonState::Pause;
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::Stop, "stop")?;
        state.transport = DaemonState::Stop;
        state.elapsed = None;
        Ok(())
    }

    async fn seek(&mut self, part_index: u32, seconds: f64) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::Seek(part_index, seconds), "seek")?;
        if part_index as usize >= state.queue.len() {
            return Err(Error::DaemonCommand {
                command: "seek".to_string(),
                message: "Bad song index".to_string(),
            });
        }
        state.transport = DaemonState::Play;
        state.song = Some(part_index);
        state.elapsed = Some(seconds);
        Ok(())
    }

    async fn set_volume(&mut self, percent: u8) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::SetVolume(percent), "set_volume")?;
        state.volume = Some(percent);
        Ok(())
    }

    async fn status(&mut self) -> Result<DaemonStatus> {
        self.round_trip().await;
        let state = self.record(Call::Status, "status")?;
        Ok(DaemonStatus {
            state: state.transport,
            volume: state.volume,
            song: state.song,
            elapsed: state.elapsed,
            playlist_length: state.queue.len() as u32,
        })
    }

    async fn current_item(&mut self) -> Result<Option<AudioFile>> {
        self.round_trip().await;
        let state = self.record(Call::CurrentItem, "current_item")?;
        let path = state
            .song
            .and_then(|song| state.queue.get(song as usize))
            .cloned();
        Ok(path.and_then(|path| state.library.iter().find(|f| f.path == path).cloned()))
    }

    async fn find_files(&mut self, book_id: &BookId) -> Result<Vec<AudioFile>> {
        self.round_trip().await;
        let state = self.record(Call::FindFiles(book_id.to_string()), "find_files")?;
        Ok(state
            .library
            .iter()
            .filter(|f| f.path.contains(book_id.as_str()))
            .map(|f| AudioFile {
                path: f.path.clone(),
                duration: if state.untimed_search { None } else { f.duration },
            })
            .collect())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.round_trip().await;
        let mut state = self.record(Call::Disconnect, "disconnect")?;
        state.connected = false;
        Ok(())
    }
}
