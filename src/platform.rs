//! Process-level setup the client needs around the SDK.
//!
//! Termination signals (SIGINT, SIGTERM, SIGHUP and SIGQUIT on Unix; Ctrl+C
//! and console close on Windows) are turned into a [`ShutdownRequest`] on a
//! channel. The handler never touches the SDK; the client's loops see the
//! request and shut down from normal control flow. With no client listening
//! the process exits, as it would without a handler.

use crate::{ClientError, Result};
use crossbeam_channel::Sender;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Why a loop was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownRequest {
    Signal,
    Stop,
}

/// Exit status when interrupted with nobody listening (128 + SIGINT).
const INTERRUPT_EXIT_CODE: i32 = 130;
/// Exit status for SIGQUIT with nobody listening.
#[cfg(unix)]
const QUIT_EXIT_CODE: i32 = 131;

// ctrlc accepts a single handler per process, so handlers are installed once
// and forward to whichever client currently holds the slot.
static HANDLER: OnceLock<std::result::Result<(), String>> = OnceLock::new();
static FORWARD: Mutex<Option<Sender<ShutdownRequest>>> = Mutex::new(None);

fn forward_slot() -> MutexGuard<'static, Option<Sender<ShutdownRequest>>> {
    FORWARD.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hand a signal to the listening client; `false` when there is none.
fn deliver(listener: Option<&Sender<ShutdownRequest>>) -> bool {
    match listener {
        Some(tx) => {
            log::info!("termination signal received, requesting shutdown");
            // A full channel already carries a pending request.
            let _ = tx.try_send(ShutdownRequest::Signal);
            true
        }
        None => false,
    }
}

fn forward_signal(exit_code: i32) {
    if !deliver(forward_slot().as_ref()) {
        log::warn!("termination signal received with no client listening, exiting");
        std::process::exit(exit_code);
    }
}

fn install_handlers() -> std::result::Result<(), String> {
    ctrlc::set_handler(|| forward_signal(INTERRUPT_EXIT_CODE)).map_err(|e| e.to_string())?;
    #[cfg(unix)]
    install_quit_handler()?;
    Ok(())
}

// ctrlc leaves SIGQUIT alone; it is read on its own thread and routed the
// same way.
#[cfg(unix)]
fn install_quit_handler() -> std::result::Result<(), String> {
    use signal_hook::consts::SIGQUIT;
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGQUIT]).map_err(|e| e.to_string())?;
    std::thread::Builder::new()
        .name("coresdk-sigquit".into())
        .spawn(move || {
            for _ in signals.forever() {
                forward_signal(QUIT_EXIT_CODE);
            }
        })
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Platform state held by an initialized client.
#[derive(Debug)]
pub struct Platform {
    forwarding: bool,
    documents_dir: Option<PathBuf>,
}

impl Platform {
    /// Resolve platform paths and, when `install_signal_handlers` is set,
    /// route termination signals to `shutdown`.
    ///
    /// Only one `Platform` at a time can receive signals.
    pub fn initialize(
        install_signal_handlers: bool,
        shutdown: Sender<ShutdownRequest>,
    ) -> Result<Platform> {
        let documents_dir = documents_dir();
        match &documents_dir {
            Some(dir) => log::debug!("documents directory: {}", dir.display()),
            None => log::debug!("no documents directory could be resolved"),
        }

        if install_signal_handlers {
            HANDLER
                .get_or_init(install_handlers)
                .clone()
                .map_err(ClientError::FailedPlatformSpecificInitialization)?;

            let mut slot = forward_slot();
            if slot.is_some() {
                return Err(ClientError::FailedPlatformSpecificInitialization(
                    "another client already receives termination signals".into(),
                ));
            }
            *slot = Some(shutdown);
            log::debug!("termination signals forwarded to client");
        }

        Ok(Platform {
            forwarding: install_signal_handlers,
            documents_dir,
        })
    }

    pub fn documents_dir(&self) -> Option<&PathBuf> {
        self.documents_dir.as_ref()
    }

    /// Stop forwarding signals. Until another client initializes, a
    /// termination signal exits the process.
    pub fn shut_down(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.forwarding {
            return Ok(());
        }
        self.forwarding = false;
        match forward_slot().take() {
            Some(_) => Ok(()),
            None => Err(ClientError::FailedPlatformSpecificShutdown(
                "signal forwarding was already released".into(),
            )),
        }
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("{}", e);
        }
    }
}

/// `$XDG_DOCUMENTS_DIR`, else `$HOME/Documents`.
pub fn documents_dir() -> Option<PathBuf> {
    documents_dir_from(
        std::env::var_os("XDG_DOCUMENTS_DIR"),
        std::env::var_os("HOME"),
    )
}

fn documents_dir_from(xdg: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    if let Some(dir) = xdg.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    home.filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join("Documents"))
}
