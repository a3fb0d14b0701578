//! Audio output glue.
//!
//! The engine mixes into a block buffer and hands it over once per block. This
//! module only owns the device stream and its pause/resume state; mixing stays
//! in the engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;

/// Platform PCM output: 16-bit interleaved stereo.
pub trait AudioSink: Send {
    /// Smallest stream buffer, in bytes, the device accepts at `sample_rate`.
    fn min_buffer_size(&self, sample_rate: u32) -> usize;

    fn open(&mut self, sample_rate: u32, buffer_bytes: usize) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Queues PCM bytes; returns how many were accepted.
    fn write(&mut self, pcm: &[u8]) -> Result<usize>;
}

struct Stream {
    block_len: usize,
    buffer_bytes: usize,
}

struct Inner {
    sink: Option<Box<dyn AudioSink>>,
    sample_rate: u32,
    stream: Option<Stream>,
    playing: bool,
}

/// Shared handle to the audio stream. Clones refer to the same stream.
#[derive(Clone)]
pub struct AudioOutput {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for AudioOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("AudioOutput")
            .field("has_sink", &inner.sink.is_some())
            .field("sample_rate", &inner.sample_rate)
            .field("initialized", &inner.stream.is_some())
            .field("playing", &inner.playing)
            .finish()
    }
}

impl AudioOutput {
    pub fn new(sink: Option<Box<dyn AudioSink>>, sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sink,
                sample_rate,
                stream: None,
                playing: false,
            })),
        }
    }

    /// Output with no device; every call is a logged no-op.
    pub fn disabled(sample_rate: u32) -> Self {
        Self::new(None, sample_rate)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the stream for blocks of `block_len` bytes and starts playback.
    ///
    /// The device buffer holds at least four blocks.
    pub fn initialize(&self, block_len: usize) -> Result<()> {
        let mut inner = self.lock();
        let sample_rate = inner.sample_rate;

        let Some(sink) = inner.sink.as_mut() else {
            log::info!("no audio sink; sound disabled");
            return Ok(());
        };

        let buffer_bytes = sink.min_buffer_size(sample_rate).max(block_len * 4);
        sink.open(sample_rate, buffer_bytes)?;
        sink.play();

        log::info!(
            "audio stream opened: {sample_rate} Hz, block {block_len} B, buffer {buffer_bytes} B"
        );
        inner.stream = Some(Stream {
            block_len,
            buffer_bytes,
        });
        inner.playing = true;
        Ok(())
    }

    /// Writes one mixed block (at most `block_len` bytes of it).
    pub fn update(&self, block: &[u8]) -> Result<usize> {
        let mut inner = self.lock();
        let Some(block_len) = inner.stream.as_ref().map(|s| s.block_len) else {
            return Ok(0);
        };
        let Some(sink) = inner.sink.as_mut() else {
            return Ok(0);
        };

        let len = block.len().min(block_len);
        sink.write(&block[..len])
    }

    pub fn pause(&self) {
        let mut inner = self.lock();
        if inner.stream.is_none() || !inner.playing {
            return;
        }
        if let Some(sink) = inner.sink.as_mut() {
            sink.pause();
        }
        inner.playing = false;
        log::debug!("audio paused");
    }

    pub fn resume(&self) {
        let mut inner = self.lock();
        if inner.stream.is_none() || inner.playing {
            return;
        }
        if let Some(sink) = inner.sink.as_mut() {
            sink.play();
        }
        inner.playing = true;
        log::debug!("audio resumed");
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().stream.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Device buffer size chosen by [`initialize`](Self::initialize).
    pub fn buffer_bytes(&self) -> Option<usize> {
        self.lock().stream.as_ref().map(|s| s.buffer_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        opened: Option<(u32, usize)>,
        plays: usize,
        pauses: usize,
        written: Vec<usize>,
    }

    struct RecordingSink {
        min: usize,
        log: Arc<Mutex<Log>>,
    }

    impl AudioSink for RecordingSink {
        fn min_buffer_size(&self, _sample_rate: u32) -> usize {
            self.min
        }

        fn open(&mut self, sample_rate: u32, buffer_bytes: usize) -> Result<()> {
            self.log.lock().unwrap().opened = Some((sample_rate, buffer_bytes));
            Ok(())
        }

        fn play(&mut self) {
            self.log.lock().unwrap().plays += 1;
        }

        fn pause(&mut self) {
            self.log.lock().unwrap().pauses += 1;
        }

        fn write(&mut self, pcm: &[u8]) -> Result<usize> {
            self.log.lock().unwrap().written.push(pcm.len());
            Ok(pcm.len())
        }
    }

    fn output(min: usize) -> (AudioOutput, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let sink = RecordingSink {
            min,
            log: Arc::clone(&log),
        };
        (AudioOutput::new(Some(Box::new(sink)), 44_100), log)
    }

    #[test]
    fn buffer_is_at_least_four_blocks() {
        let (out, log) = output(1024);
        out.initialize(2048).unwrap();

        assert_eq!(log.lock().unwrap().opened, Some((44_100, 8192)));
        assert_eq!(out.buffer_bytes(), Some(8192));
        assert!(out.is_playing());
    }

    #[test]
    fn device_minimum_wins_when_larger() {
        let (out, _log) = output(16_384);
        out.initialize(256).unwrap();
        assert_eq!(out.buffer_bytes(), Some(16_384));
    }

    #[test]
    fn update_writes_at_most_one_block() {
        let (out, log) = output(0);
        assert_eq!(out.update(&[0; 64]).unwrap(), 0);

        out.initialize(32).unwrap();
        assert_eq!(out.update(&[0; 64]).unwrap(), 32);
        assert_eq!(log.lock().unwrap().written, vec![32]);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let (out, log) = output(0);
        out.pause();
        assert_eq!(log.lock().unwrap().pauses, 0);

        out.initialize(16).unwrap();
        out.pause();
        out.pause();
        out.resume();
        out.resume();

        let log = log.lock().unwrap();
        assert_eq!(log.pauses, 1);
        // initialize + one resume
        assert_eq!(log.plays, 2);
    }

    #[test]
    fn disabled_output_is_inert() {
        let out = AudioOutput::disabled(22_050);
        out.initialize(128).unwrap();
        out.pause();
        out.resume();

        assert!(!out.is_initialized());
        assert_eq!(out.update(&[1, 2, 3]).unwrap(), 0);
    }
}
