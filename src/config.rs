use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub hotkey: HotkeyConfig,
    pub audio: AudioConfig,
    pub api: ApiConfig,
    pub insertion: InsertionConfig,
    pub sound: SoundConfig,
    pub telemetry: TelemetryConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HotkeyConfig {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            modifiers: vec!["Command".to_owned()],
            key: "D".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    /// Sample rate sent to the transcription service (Hz)
    pub sample_rate: u32,
    /// Interval between audio sends while recording (ms)
    pub chunk_interval_ms: u64,
    /// Upper bound on buffered audio between drains (seconds)
    pub max_buffer_secs: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_interval_ms: 250,
            max_buffer_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Transcription model identifier
    pub model_id: String,
    /// WebSocket endpoint (overridable for testing against a local server)
    pub endpoint: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            model_id: "scribe_v2_realtime".to_owned(),
            endpoint: "wss://api.elevenlabs.io/v1/speech-to-text/realtime".to_owned(),
        }
    }
}

/// How transcribed text reaches the cursor
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsertionMode {
    /// Paste the full transcript once it is committed
    Batch,
    /// Type partial transcripts live, reconciling as they change
    Streaming,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InsertionConfig {
    pub mode: InsertionMode,
    /// Delay after the paste keystroke before restoring the clipboard (ms)
    pub paste_settle_ms: u64,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            mode: InsertionMode::Batch,
            paste_settle_ms: 80,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SoundConfig {
    pub enabled: bool,
    pub start: String,
    pub stop: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start: "/System/Library/Sounds/Hero.aiff".to_owned(),
            stop: "/System/Library/Sounds/Glass.aiff".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecordingConfig {
    /// Dump each session's captured audio to a WAV file
    pub save_debug_wav: bool,
    pub debug_dir: String,
    pub retention_days: u64,
    pub max_count: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            save_debug_wav: false,
            debug_dir: "~/.scribe-hotkey/recordings".to_owned(),
            retention_days: 7,
            max_count: 20,
        }
    }
}

impl Config {
    /// Load config from ~/.scribe-hotkey.toml, creating it with defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;

        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config TOML")
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".scribe-hotkey.toml"))
    }

    fn create_default(path: &PathBuf) -> Result<()> {
        let default_config = r#"[hotkey]
modifiers = ["Command"]
key = "D"

[audio]
sample_rate = 16000
chunk_interval_ms = 250
max_buffer_secs = 30

[api]
model_id = "scribe_v2_realtime"
endpoint = "wss://api.elevenlabs.io/v1/speech-to-text/realtime"

[insertion]
mode = "batch"
paste_settle_ms = 80

[sound]
enabled = true
start = "/System/Library/Sounds/Hero.aiff"
stop = "/System/Library/Sounds/Glass.aiff"

[telemetry]
enabled = true
log_path = "~/.scribe-hotkey/scribe.log"

[recording]
save_debug_wav = false
debug_dir = "~/.scribe-hotkey/recordings"
retention_days = 7
max_count = 20
"#;
        fs::write(path, default_config).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }

    /// Read the API key from the environment (never stored in the config file)
    pub fn api_key() -> Result<String> {
        std::env::var("ELEVENLABS_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow!("ELEVENLABS_API_KEY not set - export it before starting the app")
            })
    }
}
