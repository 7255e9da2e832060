//! Audio outputs the player can own.
//!
//! * [`NullOutput`]: silent. Used with `--no-audio` and wherever no device is
//!   around.
//! * [`RecordingOutput`]: same, but keeps a shared call log for tests.
//! * [`RodioOutput`] (feature `playback`): real sound on a dedicated thread.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::traits::{AudioOutput, LoadId};

#[derive(Debug, Default)]
pub struct NullOutput;

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOutput for NullOutput {
    fn load(&mut self, _url: &str, _load: LoadId) -> Result<()> {
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: f64) -> Result<()> {
        Ok(())
    }

    fn seek(&mut self, _position_secs: f64) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Load(String, LoadId),
    Play,
    Pause,
    Volume(f64),
    Seek(f64),
}

/// Shared view of everything a [`RecordingOutput`] was asked to do.
pub type CallLog = Arc<Mutex<Vec<OutputCall>>>;

#[derive(Debug, Default)]
pub struct RecordingOutput {
    log: CallLog,
    fail_loads: bool,
}

impl RecordingOutput {
    pub fn new() -> (Self, CallLog) {
        let output = Self::default();
        let log = Arc::clone(&output.log);
        (output, log)
    }

    /// Every `load` fails, for exercising the error path.
    pub fn failing() -> (Self, CallLog) {
        let (mut output, log) = Self::new();
        output.fail_loads = true;
        (output, log)
    }

    fn record(&self, call: OutputCall) {
        if let Ok(mut log) = self.log.lock() {
            log.push(call);
        }
    }
}

impl AudioOutput for RecordingOutput {
    fn load(&mut self, url: &str, load: LoadId) -> Result<()> {
        self.record(OutputCall::Load(url.to_string(), load));
        if self.fail_loads {
            anyhow::bail!("cannot open {url}");
        }
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.record(OutputCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(OutputCall::Pause);
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.record(OutputCall::Volume(volume));
        Ok(())
    }

    fn seek(&mut self, position_secs: f64) -> Result<()> {
        self.record(OutputCall::Seek(position_secs));
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use rodio_backend::RodioOutput;

#[cfg(feature = "playback")]
mod rodio_backend {
    use std::io::Cursor;
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Context, Result};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use tokio::sync::mpsc::UnboundedSender;
    use tracing::{debug, error, info};

    use crate::player::traits::{AudioOutput, LoadId, PlayerEvent};

    const TICK: Duration = Duration::from_millis(250);

    enum OutputCmd {
        Load(String, LoadId),
        Play,
        Pause,
        Volume(f32),
        Seek(f64),
        Quit,
    }

    /// rodio's stream handle is not `Send`, so the device lives on its own
    /// thread and is driven over a command channel 🎧
    pub struct RodioOutput {
        tx: Sender<OutputCmd>,
        join: Option<JoinHandle<()>>,
    }

    impl RodioOutput {
        /// Open the default device. Progress and end-of-track are reported on
        /// `events`.
        pub fn spawn(events: UnboundedSender<PlayerEvent>, volume: f64) -> Result<Self> {
            let (tx, rx) = mpsc::channel::<OutputCmd>();
            let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

            let join = thread::Builder::new()
                .name("swara-audio".into())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(pair) => pair,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    Deck::new(handle, volume as f32, events).run(rx);
                })
                .context("failed to spawn audio thread")?;

            match ready_rx.recv() {
                Ok(Ok(())) => {
                    info!("audio output opened");
                    Ok(Self {
                        tx,
                        join: Some(join),
                    })
                }
                Ok(Err(e)) => Err(anyhow!("no audio output device: {e}")),
                Err(_) => Err(anyhow!("audio thread exited during startup")),
            }
        }

        fn send(&self, cmd: OutputCmd) -> Result<()> {
            self.tx
                .send(cmd)
                .map_err(|_| anyhow!("audio thread is gone"))
        }
    }

    impl AudioOutput for RodioOutput {
        fn load(&mut self, url: &str, load: LoadId) -> Result<()> {
            self.send(OutputCmd::Load(url.to_string(), load))
        }

        fn play(&mut self) -> Result<()> {
            self.send(OutputCmd::Play)
        }

        fn pause(&mut self) -> Result<()> {
            self.send(OutputCmd::Pause)
        }

        fn set_volume(&mut self, volume: f64) -> Result<()> {
            self.send(OutputCmd::Volume(volume as f32))
        }

        fn seek(&mut self, position_secs: f64) -> Result<()> {
            self.send(OutputCmd::Seek(position_secs))
        }
    }

    impl Drop for RodioOutput {
        fn drop(&mut self) {
            let _ = self.tx.send(OutputCmd::Quit);
            if let Some(join) = self.join.take() {
                let _ = join.join();
            }
        }
    }

    /// Everything owned by the audio thread.
    struct Deck {
        handle: OutputStreamHandle,
        http: Option<reqwest::blocking::Client>,
        events: UnboundedSender<PlayerEvent>,
        // Load every outgoing event belongs to.
        load_id: LoadId,
        sink: Option<Sink>,
        bytes: Option<Arc<[u8]>>,
        volume: f32,
        playing: bool,
        // Position = offset + time played since `since`.
        offset: Duration,
        since: Option<Instant>,
    }

    impl Deck {
        fn new(handle: OutputStreamHandle, volume: f32, events: UnboundedSender<PlayerEvent>) -> Self {
            Self {
                handle,
                http: None,
                events,
                load_id: 0,
                sink: None,
                bytes: None,
                volume,
                playing: false,
                offset: Duration::ZERO,
                since: None,
            }
        }

        fn run(mut self, rx: Receiver<OutputCmd>) {
            loop {
                match rx.recv_timeout(TICK) {
                    Ok(OutputCmd::Quit) | Err(RecvTimeoutError::Disconnected) => break,
                    Ok(cmd) => {
                        if let Err(e) = self.apply(cmd) {
                            error!(error = %e, "audio command failed");
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => self.tick(),
                }
            }
            debug!("audio thread stopped");
        }

        fn apply(&mut self, cmd: OutputCmd) -> Result<()> {
            match cmd {
                OutputCmd::Load(url, load) => {
                    self.load_id = load;
                    if let Err(e) = self.load(&url) {
                        let _ = self.events.send(PlayerEvent::LoadFailed {
                            load,
                            reason: format!("{e:#}"),
                        });
                        return Err(e);
                    }
                }
                OutputCmd::Play => {
                    if let Some(sink) = &self.sink {
                        sink.play();
                        self.playing = true;
                        self.since = Some(Instant::now());
                    }
                }
                OutputCmd::Pause => {
                    if let Some(sink) = &self.sink {
                        sink.pause();
                    }
                    self.offset = self.position();
                    self.since = None;
                    self.playing = false;
                }
                OutputCmd::Volume(volume) => {
                    self.volume = volume;
                    if let Some(sink) = &self.sink {
                        sink.set_volume(volume);
                    }
                }
                OutputCmd::Seek(secs) => self.seek(Duration::from_secs_f64(secs.max(0.0)))?,
                OutputCmd::Quit => {}
            }
            Ok(())
        }

        fn load(&mut self, url: &str) -> Result<()> {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self.playing = false;
            self.bytes = None;

            let bytes: Arc<[u8]> = self.fetch(url)?.into();
            let decoder = Decoder::new(Cursor::new(Arc::clone(&bytes)))
                .with_context(|| format!("cannot decode {url}"))?;
            if let Some(total) = decoder.total_duration() {
                let _ = self.events.send(PlayerEvent::MetadataLoaded {
                    load: self.load_id,
                    duration: total.as_secs_f64(),
                });
            }

            self.bytes = Some(bytes);
            self.start_sink(Duration::ZERO, false)?;
            debug!(url, "track loaded");
            Ok(())
        }

        fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return std::fs::read(url).with_context(|| format!("cannot read {url}"));
            }
            // Built lazily on this thread; the blocking client must stay out
            // of the async runtime.
            let http = self
                .http
                .get_or_insert_with(reqwest::blocking::Client::new);
            let bytes = http
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.bytes())
                .with_context(|| format!("cannot fetch {url}"))?;
            Ok(bytes.to_vec())
        }

        /// Fresh sink starting at `at`. rodio 0.17 has no seek, so seeking
        /// re-decodes and skips ahead.
        fn start_sink(&mut self, at: Duration, play: bool) -> Result<()> {
            let bytes = self
                .bytes
                .as_ref()
                .ok_or_else(|| anyhow!("nothing loaded"))?;
            let source = Decoder::new(Cursor::new(Arc::clone(bytes)))?.skip_duration(at);

            let sink = Sink::try_new(&self.handle)?;
            sink.set_volume(self.volume);
            sink.append(source);
            if play {
                sink.play();
            } else {
                sink.pause();
            }

            if let Some(old) = self.sink.replace(sink) {
                old.stop();
            }
            self.offset = at;
            self.playing = play;
            self.since = play.then(Instant::now);
            Ok(())
        }

        fn seek(&mut self, to: Duration) -> Result<()> {
            let playing = self.playing;
            self.start_sink(to, playing)?;
            let _ = self.events.send(PlayerEvent::TimeUpdate {
                load: self.load_id,
                time: to.as_secs_f64(),
            });
            Ok(())
        }

        fn position(&self) -> Duration {
            self.offset + self.since.map(|s| s.elapsed()).unwrap_or_default()
        }

        fn tick(&mut self) {
            if !self.playing {
                return;
            }
            let finished = self.sink.as_ref().map(Sink::empty).unwrap_or(true);
            if finished {
                self.playing = false;
                self.since = None;
                let _ = self.events.send(PlayerEvent::Ended { load: self.load_id });
            } else {
                let _ = self.events.send(PlayerEvent::TimeUpdate {
                    load: self.load_id,
                    time: self.position().as_secs_f64(),
                });
            }
        }
    }
}
