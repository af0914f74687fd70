//! Playback of captured clips
//!
//! rodio output streams are not Send, so playback runs on its own thread.
//! The spawning call blocks only until the thread reports whether the output
//! device opened and the clip decoded; the audio then plays out in the
//! background until it ends or is stopped.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle to a playback thread. Dropping the handle stops playback.
pub struct Playback {
    stop_flag: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Playback {
    /// Start playing the encoded clip. Blocks until the playback thread has
    /// opened the output device and decoded the clip header, so format and
    /// device failures are reported to the caller.
    pub fn start(bytes: Vec<u8>) -> Result<Self, String> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (init_tx, init_rx) = mpsc::channel::<Result<(), String>>();

        let thread_stop = stop_flag.clone();
        let thread_finished = finished.clone();

        let join = std::thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                run_playback(bytes, init_tx, thread_stop, thread_finished);
            })
            .map_err(|e| format!("failed to spawn playback thread: {e}"))?;

        match init_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop_flag,
                finished,
                join: Some(join),
            }),
            Ok(Err(msg)) => {
                let _ = join.join();
                Err(msg)
            }
            Err(_) => {
                let _ = join.join();
                Err("playback thread terminated during init".to_string())
            }
        }
    }

    /// Whether the clip has played to the end or been stopped.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Stop playback and wait for the thread to release the output device.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

fn run_playback(
    bytes: Vec<u8>,
    init_tx: mpsc::Sender<Result<(), String>>,
    stop_flag: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
) {
    // Output stream must be created on this thread (rodio streams are !Send)
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(format!("failed to open audio output: {e}")));
            finished.store(true, Ordering::SeqCst);
            return;
        }
    };

    let sink = match rodio::Sink::try_new(&handle) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = init_tx.send(Err(format!("failed to create playback sink: {e}")));
            finished.store(true, Ordering::SeqCst);
            return;
        }
    };

    let source = match rodio::Decoder::new(Cursor::new(bytes)) {
        Ok(source) => source,
        Err(e) => {
            let _ = init_tx.send(Err(format!("failed to decode recording: {e}")));
            finished.store(true, Ordering::SeqCst);
            return;
        }
    };

    sink.append(source);
    let _ = init_tx.send(Ok(()));
    tracing::debug!("Playback started");

    while !sink.empty() {
        if stop_flag.load(Ordering::SeqCst) {
            sink.stop();
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    finished.store(true, Ordering::SeqCst);
    tracing::debug!("Playback finished");
}
