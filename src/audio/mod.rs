pub mod alert_tone;

use log::debug;
use std::sync::{
    mpsc::{self, Sender},
    Mutex, PoisonError,
};

#[cfg(feature = "audio")]
use alert_tone::AlertTone;
#[cfg(feature = "audio")]
use rodio::{OutputStream, Sink};

/// Something that can make the "you drifted" noise. Best effort: it must
/// never block the caller or report failure.
pub trait AlertPlayer: Send + Sync {
    fn play_alert(&self);
}

enum AudioCommand {
    PlayAlert,
}

/// Owns a lazily spawned audio thread. Output devices are created on that
/// thread because rodio's stream is not `Send`.
pub struct AudioEngineHandle {
    tx: Mutex<Option<Sender<AudioCommand>>>,
}

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Mutex::new(None),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        let mut guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        std::thread::Builder::new()
            .name("audio-alert".to_string())
            .spawn(move || run_audio_thread(rx))
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertPlayer for AudioEngineHandle {
    fn play_alert(&self) {
        let sent = self
            .ensure_thread()
            .and_then(|tx| tx.send(AudioCommand::PlayAlert).map_err(|e| e.to_string()));
        if let Err(err) = sent {
            debug!("Alert tone skipped: {err}");
        }
    }
}

#[cfg(feature = "audio")]
fn run_audio_thread(rx: mpsc::Receiver<AudioCommand>) {
    let mut _stream: Option<OutputStream> = None;
    let mut sink: Option<Sink> = None;

    fn ensure_sink(stream: &mut Option<OutputStream>, sink: &mut Option<Sink>) -> Result<(), String> {
        if sink.is_none() {
            let (s, handle) = OutputStream::try_default()
                .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
            let new_sink =
                Sink::try_new(&handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
            *stream = Some(s);
            *sink = Some(new_sink);
        }
        Ok(())
    }

    while let Ok(cmd) = rx.recv() {
        match cmd {
            AudioCommand::PlayAlert => match ensure_sink(&mut _stream, &mut sink) {
                Ok(()) => {
                    if let Some(ref s) = sink {
                        s.append(AlertTone::new());
                    }
                }
                Err(err) => debug!("No audio output for alert: {err}"),
            },
        }
    }
}

#[cfg(not(feature = "audio"))]
fn run_audio_thread(rx: mpsc::Receiver<AudioCommand>) {
    while let Ok(AudioCommand::PlayAlert) = rx.recv() {
        debug!("Alert requested but audio support is compiled out");
    }
}
