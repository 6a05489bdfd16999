use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::SoundConfig;

/// Recording cues played through system sound files
#[derive(Debug, Clone)]
pub struct SoundCues {
    enabled: bool,
    start: String,
    stop: String,
}

impl SoundCues {
    pub fn new(config: &SoundConfig) -> Self {
        Self {
            enabled: config.enabled,
            start: config.start.clone(),
            stop: config.stop.clone(),
        }
    }

    pub fn play_start(&self) {
        if self.enabled {
            play(&self.start);
        }
    }

    pub fn play_stop(&self) {
        if self.enabled {
            play(&self.stop);
        }
    }
}

/// Play a sound file without blocking; failures are logged and swallowed
fn play(path: &str) {
    if !Path::new(path).exists() {
        tracing::debug!("sound file missing, skipping cue: {}", path);
        return;
    }

    match Command::new("afplay")
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => tracing::debug!("playing sound cue: {}", path),
        Err(e) => tracing::warn!("failed to play sound cue {}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues(enabled: bool) -> SoundCues {
        SoundCues::new(&SoundConfig {
            enabled,
            start: "/nonexistent/start.aiff".to_owned(),
            stop: "/nonexistent/stop.aiff".to_owned(),
        })
    }

    #[test]
    fn test_missing_sound_file_does_not_panic() {
        let cues = cues(true);
        cues.play_start();
        cues.play_stop();
    }

    #[test]
    fn test_disabled_cues_are_silent() {
        let cues = cues(false);
        cues.play_start();
        cues.play_stop();
    }
}
