//! Completion sound and desktop notifications.

use crate::timer::Alert;
use notify_rust::Notification;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("could not start {player}: {source}")]
    Spawn {
        player: String,
        #[source]
        source: io::Error,
    },

    #[error("notification failed: {0}")]
    Notification(String),
}

pub trait SoundPlayer {
    /// Starts playback and returns without waiting for it to finish.
    fn play(&self) -> Result<(), AlertError>;
}

pub trait Notifier {
    fn notify(&self, alert: Alert) -> Result<(), AlertError>;
}

/// Plays a sound file through the platform's command line player.
#[derive(Debug, Clone)]
pub struct SystemSound {
    player: String,
    asset: PathBuf,
}

impl SystemSound {
    pub fn new(player: impl Into<String>, asset: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            asset: asset.into(),
        }
    }
}

impl Default for SystemSound {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("afplay", "/System/Library/Sounds/Glass.aiff")
        } else {
            Self::new(
                "paplay",
                "/usr/share/sounds/freedesktop/stereo/complete.oga",
            )
        }
    }
}

impl SoundPlayer for SystemSound {
    fn play(&self) -> Result<(), AlertError> {
        let mut child = Command::new(&self.player)
            .arg(&self.asset)
            .spawn()
            .map_err(|source| AlertError::Spawn {
                player: self.player.clone(),
                source,
            })?;
        debug!("playing {} with {}", self.asset.display(), self.player);

        // Reap the player off the event loop so playback never blocks a tick.
        let player = self.player.clone();
        thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => warn!("{} exited with {}", player, status),
            Ok(_) => {}
            Err(e) => warn!("waiting for {} failed: {}", player, e),
        });
        Ok(())
    }
}

/// Used with `--no-sound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Muted;

impl SoundPlayer for Muted {
    fn play(&self) -> Result<(), AlertError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, alert: Alert) -> Result<(), AlertError> {
        let mut notification = Notification::new();
        notification.summary(alert.title());

        #[cfg(target_os = "macos")]
        notification.subtitle(alert.subtitle()).body(alert.body());

        #[cfg(not(target_os = "macos"))]
        notification.body(&format!("{}\n{}", alert.subtitle(), alert.body()));

        notification
            .show()
            .map_err(|e| AlertError::Notification(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_player_is_a_spawn_error() {
        let sound = SystemSound::new("pomo-clock-no-such-player", "/dev/null");

        let err = sound.play().unwrap_err();

        assert!(matches!(
            err,
            AlertError::Spawn { ref player, .. } if player == "pomo-clock-no-such-player"
        ));
    }

    #[test]
    fn muted_never_fails() {
        assert!(Muted.play().is_ok());
    }
}
