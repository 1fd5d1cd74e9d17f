//! # Rodio Audio Engine
//!
//! [`AudioEngine`] on the default output device.
//!
//! A dedicated thread owns the `rodio` output stream and one `Sink` per
//! handle. The async side sends it [`Command`]s over a std channel and
//! awaits the outcome on a oneshot. Between commands the thread wakes every
//! status interval and broadcasts an [`EngineStatus`] for each playing sink,
//! plus a single `finished` status once a sink drains.
//!
//! Media bytes are read (or downloaded) on the async side before the open
//! command is sent, so the audio thread never blocks on I/O.

use crate::fetch::MediaFetcher;
use crate::locator::MediaLocator;
use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{
        AudioEngine, EngineEventReceiver, EngineHandle, EngineStatus, LoadedMedia, OpenOptions,
        DEFAULT_STATUS_INTERVAL,
    },
};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info};

const STATUS_CHANNEL_CAPACITY: usize = 256;

type Reply<T> = oneshot::Sender<Result<T>>;
type MediaSource = Decoder<Cursor<Arc<[u8]>>>;

enum Command {
    Open {
        handle: EngineHandle,
        media: Arc<[u8]>,
        volume: f32,
        reply: Reply<Option<Duration>>,
    },
    Control {
        handle: EngineHandle,
        op: Control,
        reply: Reply<()>,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum Control {
    Close,
    Play,
    Pause,
    Seek(Duration),
    SetVolume(f32),
}

/// rodio-backed engine for desktop hosts.
pub struct RodioAudioEngine {
    commands: Sender<Command>,
    events: broadcast::Sender<EngineStatus>,
    fetcher: MediaFetcher,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        Self::with_status_interval(DEFAULT_STATUS_INTERVAL)
    }

    /// Open the default output device and start the audio thread.
    ///
    /// Blocks until the device is open or failed to open.
    pub fn with_status_interval(interval: Duration) -> Result<Self> {
        let fetcher = MediaFetcher::new()?;
        let (events, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<(), String>>(1);

        let thread_events = events.clone();
        thread::Builder::new()
            .name("rodio-engine".to_string())
            .spawn(move || {
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                // rodio prints to stderr when the stream drops.
                stream.log_on_drop(false);
                let _ = ready_tx.send(Ok(()));

                AudioThread::new(&stream, thread_events, interval).run(receiver);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(?interval, "Audio engine started");
                Ok(Self {
                    commands,
                    events,
                    fetcher,
                })
            }
            Ok(Err(message)) => Err(BridgeError::NotAvailable(format!(
                "No audio output device: {message}"
            ))),
            Err(_) => Err(BridgeError::NotAvailable(
                "Audio thread exited during startup".to_string(),
            )),
        }
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())?
    }

    async fn control(&self, handle: EngineHandle, op: Control) -> Result<()> {
        self.request(|reply| Command::Control { handle, op, reply })
            .await
    }
}

fn stopped() -> BridgeError {
    BridgeError::NotAvailable("Audio thread is not running".to_string())
}

/// Read the bytes behind `url`, from disk or over HTTP.
async fn read_media(fetcher: &MediaFetcher, url: &str) -> Result<Vec<u8>> {
    match MediaLocator::parse(url)? {
        MediaLocator::Local(path) => tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::SourceUnavailable(format!("{} not found", path.display()))
            } else {
                BridgeError::Io(e)
            }
        }),
        MediaLocator::Remote(url) => fetcher.fetch(&url).await,
    }
}

#[async_trait]
impl AudioEngine for RodioAudioEngine {
    async fn open(&self, url: &str, options: OpenOptions) -> Result<LoadedMedia> {
        let media: Arc<[u8]> = read_media(&self.fetcher, url).await?.into();
        let handle = EngineHandle::new();
        let volume = options.initial_volume.clamp(0.0, 1.0);

        let duration = self
            .request(|reply| Command::Open {
                handle,
                media,
                volume,
                reply,
            })
            .await?;

        debug!(%handle, ?duration, "Media opened");
        Ok(LoadedMedia::new(handle, duration))
    }

    async fn close(&self, handle: EngineHandle) -> Result<()> {
        self.control(handle, Control::Close).await
    }

    async fn play(&self, handle: EngineHandle) -> Result<()> {
        self.control(handle, Control::Play).await
    }

    async fn pause(&self, handle: EngineHandle) -> Result<()> {
        self.control(handle, Control::Pause).await
    }

    async fn seek(&self, handle: EngineHandle, position: Duration) -> Result<()> {
        self.control(handle, Control::Seek(position)).await
    }

    async fn set_volume(&self, handle: EngineHandle, volume: f32) -> Result<()> {
        self.control(handle, Control::SetVolume(volume.clamp(0.0, 1.0)))
            .await
    }

    fn subscribe(&self) -> EngineEventReceiver {
        self.events.subscribe()
    }
}

impl Drop for RodioAudioEngine {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl std::fmt::Debug for RodioAudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioAudioEngine")
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Audio thread
// ============================================================================

fn decode(media: &Arc<[u8]>) -> Result<MediaSource> {
    Decoder::new(Cursor::new(Arc::clone(media))).map_err(|e| BridgeError::Decode(e.to_string()))
}

struct Voice {
    sink: Sink,
    media: Arc<[u8]>,
    duration: Option<Duration>,
    finished: bool,
}

impl Voice {
    /// Queue the media again once the sink has drained, so play and seek
    /// work after the end was reached.
    fn rearm(&mut self) -> Result<()> {
        if self.sink.empty() {
            self.sink.append(decode(&self.media)?);
            self.finished = false;
        }
        Ok(())
    }

    fn apply(&mut self, op: Control) -> Result<()> {
        match op {
            Control::Play => {
                self.rearm()?;
                self.sink.play();
            }
            Control::Pause => self.sink.pause(),
            Control::Seek(position) => {
                self.rearm()?;
                self.sink
                    .try_seek(position)
                    .map_err(|e| BridgeError::OperationFailed(format!("seek: {e}")))?;
            }
            Control::SetVolume(volume) => self.sink.set_volume(volume),
            Control::Close => self.sink.stop(),
        }
        Ok(())
    }

    fn status(&self, handle: EngineHandle) -> EngineStatus {
        let status = EngineStatus::loaded(handle)
            .with_position(self.sink.get_pos())
            .playing(!self.sink.is_paused() && !self.sink.empty());
        match self.duration {
            Some(duration) => status.with_duration(duration),
            None => status,
        }
    }
}

struct AudioThread<'a> {
    stream: &'a OutputStream,
    voices: HashMap<EngineHandle, Voice>,
    events: broadcast::Sender<EngineStatus>,
    interval: Duration,
}

impl<'a> AudioThread<'a> {
    fn new(
        stream: &'a OutputStream,
        events: broadcast::Sender<EngineStatus>,
        interval: Duration,
    ) -> Self {
        Self {
            stream,
            voices: HashMap::new(),
            events,
            interval,
        }
    }

    fn run(mut self, commands: Receiver<Command>) {
        let mut last_tick = Instant::now();
        loop {
            let wait = self.interval.saturating_sub(last_tick.elapsed());
            match commands.recv_timeout(wait) {
                Ok(Command::Open {
                    handle,
                    media,
                    volume,
                    reply,
                }) => {
                    let _ = reply.send(self.open(handle, media, volume));
                }
                Ok(Command::Control { handle, op, reply }) => {
                    let result = self.control(handle, op);
                    let _ = reply.send(result);
                }
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            if last_tick.elapsed() >= self.interval {
                self.tick();
                last_tick = Instant::now();
            }
        }

        for (_, voice) in self.voices.drain() {
            voice.sink.stop();
        }
        debug!("Audio thread stopped");
    }

    fn open(&mut self, handle: EngineHandle, media: Arc<[u8]>, volume: f32) -> Result<Option<Duration>> {
        let source = decode(&media)?;
        let duration = source.total_duration();

        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.set_volume(volume);
        sink.append(source);

        self.voices.insert(
            handle,
            Voice {
                sink,
                media,
                duration,
                finished: false,
            },
        );
        Ok(duration)
    }

    fn control(&mut self, handle: EngineHandle, op: Control) -> Result<()> {
        let missing = || BridgeError::InvalidHandle(handle.to_string());

        if let Control::Close = op {
            let mut voice = self.voices.remove(&handle).ok_or_else(missing)?;
            return voice.apply(op);
        }

        let voice = self.voices.get_mut(&handle).ok_or_else(missing)?;
        voice.apply(op)?;
        let _ = self.events.send(voice.status(handle));
        Ok(())
    }

    fn tick(&mut self) {
        let events = &self.events;
        for (handle, voice) in self.voices.iter_mut() {
            if voice.finished {
                continue;
            }
            if voice.sink.empty() {
                voice.finished = true;
                voice.sink.pause();
                let mut status = voice.status(*handle).finished();
                if let Some(duration) = voice.duration {
                    status = status.with_position(duration);
                }
                debug!(handle = %handle, "Media finished");
                let _ = events.send(status);
            } else if !voice.sink.is_paused() {
                let _ = events.send(voice.status(*handle));
            }
        }
    }
}
