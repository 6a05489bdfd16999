mod app;
mod audio;
mod config;
mod input;
mod permissions;
mod recording_cleanup;
mod session;
mod sound;
mod telemetry;
mod transcription;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use global_hotkey::GlobalHotKeyEvent;

use crate::app::DictationController;
use crate::audio::AudioCapture;
use crate::config::{Config, InsertionMode};
use crate::input::HotkeyManager;

#[derive(Debug, Parser)]
#[command(name = "scribe-hotkey")]
#[command(about = "Hotkey dictation via Scribe v2 Realtime", version)]
struct Cli {
    /// Override the configured insertion mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Type partial transcripts live as you speak
    Streaming,
    /// Paste the full transcript after you stop
    Batch,
}

impl From<ModeArg> for InsertionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Streaming => InsertionMode::Streaming,
            ModeArg::Batch => InsertionMode::Batch,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load()?;
    if let Some(mode) = cli.mode {
        config.insertion.mode = mode.into();
    }
    println!("✓ Config loaded from ~/.scribe-hotkey.toml");

    // Initialize telemetry
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("scribe-hotkey starting");
    println!("✓ Telemetry initialized");

    // Request permissions
    permissions::request_all_permissions()?;
    println!("✓ Permissions OK");

    // The API key lives in the environment only
    let api_key = Config::api_key()?;

    // Sweep old debug recordings before new ones pile up
    if config.recording.save_debug_wav {
        let deleted = recording_cleanup::cleanup_old_recordings(&config.recording)?;
        if deleted > 0 {
            println!("✓ Cleaned up {deleted} old recording(s)");
        }
    }

    // Audio stream is built once and stays paused until the hotkey fires
    let mut capture = AudioCapture::new(&config.audio)?;
    println!("✓ Audio capture ready (paused)");

    let hotkey_manager = HotkeyManager::new(&config.hotkey)?;
    println!(
        "✓ Hotkey registered: {:?} + {}",
        config.hotkey.modifiers, config.hotkey.key
    );

    let controller = DictationController::new(&config, api_key, capture.chunk_source());

    match config.insertion.mode {
        InsertionMode::Streaming => println!("\nMode: STREAMING - text appears as you speak"),
        InsertionMode::Batch => println!("\nMode: BATCH - text is pasted after you stop"),
    }
    println!("Press the hotkey to start/stop dictation.");
    println!("Press Ctrl+C to exit.\n");

    // Main event loop
    tracing::info!("event loop starting");
    let receiver = GlobalHotKeyEvent::receiver();
    loop {
        // Poll for hotkey events
        if let Ok(event) = receiver.try_recv() {
            if hotkey_manager.is_toggle_press(&event) {
                controller.toggle(&mut capture);
            }
        }

        // Check for shutdown signal
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                println!("\nShutting down...");
                controller.stop_if_active(&mut capture);
                // Let the commit go out before the runtime dies
                tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                break;
            }
            _ = tokio::time::sleep(tokio::time::Duration::from_millis(10)) => {
                // Poll interval (10ms to avoid busy-waiting)
            }
        }
    }

    Ok(())
}
