use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{WavSpec, WavWriter};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapRb,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::AudioConfig;

/// Trait for controlling audio stream lifecycle
trait StreamControl {
    /// Resume audio stream (activate microphone)
    fn play(&self) -> Result<()>;
    /// Pause audio stream (deactivate microphone)
    fn pause(&self) -> Result<()>;
}

/// CPAL stream wrapper implementing `StreamControl`
struct CpalStreamControl {
    stream: cpal::Stream,
}

impl StreamControl for CpalStreamControl {
    fn play(&self) -> Result<()> {
        self.stream.play().context("failed to resume audio stream")
    }

    fn pause(&self) -> Result<()> {
        self.stream.pause().context("failed to pause audio stream")
    }
}

/// Microphone capture using CoreAudio/CPAL
///
/// The stream is built once at startup and left paused; toggling a session
/// resumes or pauses it. The audio callback pushes raw device samples into a
/// lock-free ring buffer, and a [`ChunkSource`] drains them for the network
/// sender while the recording is still running.
pub struct AudioCapture {
    /// Stream controller (kept alive to prevent stream drop)
    #[allow(dead_code)] // Kept alive to prevent stream drop
    stream_control: Option<Box<dyn StreamControl>>,
    /// Consumer half of the ring buffer, shared with the session's chunk source
    consumer: Arc<Mutex<HeapCons<f32>>>,
    /// Recording state flag
    is_recording: Arc<AtomicBool>,
    /// Device sample rate in Hz
    device_sample_rate: u32,
    /// Number of audio channels
    device_channels: u16,
    /// Sample rate expected by the transcription service
    target_sample_rate: u32,
}

/// Handle for draining captured audio as service-ready PCM16 chunks
///
/// Cheap to clone; safe to hand to the session task while `AudioCapture`
/// stays on the main thread with the (non-Send) cpal stream.
#[derive(Clone)]
pub struct ChunkSource {
    consumer: Arc<Mutex<HeapCons<f32>>>,
    device_sample_rate: u32,
    device_channels: u16,
    target_sample_rate: u32,
}

impl AudioCapture {
    /// Creates a new audio capture instance
    ///
    /// # Errors
    /// Returns error if default audio device is unavailable or stream creation fails
    pub fn new(config: &AudioConfig) -> Result<Self> {
        info!("initializing audio capture");

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no input device available")?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_owned());
        info!("using input device: {}", device_name);

        let supported_config = device
            .default_input_config()
            .context("failed to get default input config")?;

        let device_sample_rate = supported_config.sample_rate().0;
        let device_channels = supported_config.channels();

        info!(
            "device config: {} Hz, {} channels",
            device_sample_rate, device_channels
        );

        // The ring buffer only has to cover the gap between drains, but sizing
        // it for the configured maximum keeps a stalled network sender from
        // dropping samples
        let ring_buffer_capacity =
            (device_sample_rate as usize) * (device_channels as usize) * config.max_buffer_secs;
        debug!(
            "ring buffer capacity: {} samples ({} seconds at {} Hz)",
            ring_buffer_capacity, config.max_buffer_secs, device_sample_rate
        );
        let ring_buffer = HeapRb::<f32>::new(ring_buffer_capacity);
        let (ring_buffer_producer, ring_buffer_consumer) = ring_buffer.split();

        let is_recording = Arc::new(AtomicBool::new(false));

        let is_recording_clone = Arc::clone(&is_recording);
        let mut producer = ring_buffer_producer;

        let stream_config = supported_config.into();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if is_recording_clone.load(Ordering::Relaxed) {
                        // Lock-free push to ring buffer
                        let pushed = producer.push_slice(data);
                        if pushed < data.len() {
                            warn!("ring buffer full, dropped {} samples", data.len() - pushed);
                        }
                    }
                },
                move |err| {
                    warn!("audio stream error: {}", err);
                },
                None,
            )
            .context("failed to build input stream")?;

        let stream_control = CpalStreamControl { stream };

        // Start then immediately pause: mic stays inactive until the hotkey
        stream_control.play()?;
        stream_control.pause()?;
        info!("audio stream initialized (paused)");

        Ok(Self {
            stream_control: Some(Box::new(stream_control)),
            consumer: Arc::new(Mutex::new(ring_buffer_consumer)),
            is_recording,
            device_sample_rate,
            device_channels,
            target_sample_rate: config.sample_rate,
        })
    }

    /// Starts recording audio
    ///
    /// # Errors
    /// Returns error if the stream cannot be resumed
    pub fn start_recording(&mut self) -> Result<()> {
        debug!("starting recording");

        // Drop whatever a previous session left behind
        self.consumer.lock().unwrap().clear();

        // Set recording flag BEFORE resuming stream to avoid race condition
        self.is_recording.store(true, Ordering::Relaxed);

        if let Some(stream_control) = &self.stream_control {
            stream_control.play()?;
        }

        info!("recording started");
        Ok(())
    }

    /// Stops recording; already-captured samples stay drainable
    ///
    /// # Errors
    /// Returns error if the stream cannot be paused
    pub fn stop_recording(&mut self) -> Result<()> {
        debug!("stopping recording");

        self.is_recording.store(false, Ordering::Relaxed);

        if let Some(stream_control) = &self.stream_control {
            stream_control.pause()?;
        }

        info!("recording stopped");
        Ok(())
    }

    /// Handle for the session task to drain converted chunks
    pub fn chunk_source(&self) -> ChunkSource {
        ChunkSource {
            consumer: Arc::clone(&self.consumer),
            device_sample_rate: self.device_sample_rate,
            device_channels: self.device_channels,
            target_sample_rate: self.target_sample_rate,
        }
    }

    /// Save PCM16 samples to a WAV file for debugging
    ///
    /// # Errors
    /// Returns error if directory creation or file write fails
    pub fn save_wav_debug(samples: &[i16], sample_rate: u32, path: &Path) -> Result<()> {
        debug!("saving WAV debug file: {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("failed to create debug directory")?;
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec).context("failed to create WAV file")?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .context("failed to write sample")?;
        }

        writer.finalize().context("failed to finalize WAV file")?;

        info!(
            "saved WAV debug file: {:?} ({} samples)",
            path,
            samples.len()
        );
        Ok(())
    }
}

impl ChunkSource {
    /// Drain all buffered device samples as 16kHz-equivalent mono PCM16
    ///
    /// Returns an empty vec when nothing was captured since the last drain.
    pub fn drain_pcm16(&self) -> Vec<i16> {
        let raw: Vec<f32> = {
            let mut consumer = self.consumer.lock().unwrap();
            let mut samples = Vec::with_capacity(consumer.occupied_len());
            while let Some(sample) = consumer.try_pop() {
                samples.push(sample);
            }
            samples
        };

        if raw.is_empty() {
            return Vec::new();
        }

        let mono = downmix_to_mono(&raw, self.device_channels);
        let resampled = resample_linear(&mono, self.device_sample_rate, self.target_sample_rate);
        f32_to_pcm16(&resampled)
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }
}

/// Average interleaved channels down to mono
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels_f64 = f64::from(channels);
    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| f64::from(s)).sum();
            #[allow(clippy::cast_possible_truncation)] // audio stays within f32 precision
            {
                (sum / channels_f64) as f32
            }
        })
        .collect()
}

/// Linear-interpolation resampling between arbitrary rates
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)] // fractional index math needs f64 ↔ usize conversions
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let output_len = ((samples.len() as f64) / ratio).ceil() as usize;

    let mut resampled = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let src = (i as f64) * ratio;
        let idx = (src.floor() as usize).min(samples.len() - 1);
        let next = (idx + 1).min(samples.len() - 1);
        let fract = src - src.floor();

        let s1 = f64::from(samples[idx]);
        let s2 = f64::from(samples[next]);
        resampled.push(s1.mul_add(1.0 - fract, s2 * fract) as f32);
    }

    resampled
}

/// Convert f32 samples in [-1.0, 1.0] to PCM16, clamping out-of-range input
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            #[allow(clippy::cast_possible_truncation)] // clamped before the cast
            {
                (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::float_cmp)] // Test assertions with known exact values
mod tests {
    use super::*;

    fn chunk_source(device_rate: u32, channels: u16, target_rate: u32) -> ChunkSource {
        ChunkSource {
            consumer: Arc::new(Mutex::new(HeapRb::<f32>::new(1024).split().1)),
            device_sample_rate: device_rate,
            device_channels: channels,
            target_sample_rate: target_rate,
        }
    }

    #[test]
    fn test_downmix_stereo() {
        // Stereo frames: [L1, R1, L2, R2, L3, R3]
        let stereo = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let result = downmix_to_mono(&stereo, 2);
        assert_eq!(result, vec![1.5, 3.5, 5.5]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mono = vec![1.0, 2.0, 3.0];
        assert_eq!(downmix_to_mono(&mono, 1), mono);
    }

    #[test]
    fn test_downmix_four_channels() {
        let frames = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let result = downmix_to_mono(&frames, 4);
        assert_eq!(result, vec![2.5, 6.5]);
    }

    #[test]
    fn test_resample_same_rate_passthrough() {
        let samples = vec![1.0, 2.0, 3.0];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_empty() {
        let empty: Vec<f32> = vec![];
        assert!(resample_linear(&empty, 48_000, 16_000).is_empty());
    }

    #[test]
    fn test_resample_downsampling_48k_to_16k() {
        // 3:1 ratio
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let result = resample_linear(&samples, 48_000, 16_000);
        assert_eq!(result.len(), 3);
        for &sample in &result {
            assert!((1.0..=9.0).contains(&sample));
        }
    }

    #[test]
    fn test_resample_upsampling_8k_to_16k() {
        // 1:2 ratio
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        let result = resample_linear(&samples, 8_000, 16_000);
        assert_eq!(result.len(), 8);
        for &sample in &result {
            assert!((1.0..=4.0).contains(&sample));
        }
    }

    #[test]
    fn test_resample_preserves_bounds() {
        let samples = vec![-1.0, -0.5, 0.0, 0.5, 1.0];
        let result = resample_linear(&samples, 22_050, 16_000);
        for &sample in &result {
            assert!((-1.0..=1.0).contains(&sample));
        }
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_resample_count_ratio() {
        let samples = vec![0.0; 20];
        let down = resample_linear(&samples, 32_000, 16_000);
        assert!(((down.len() as f32) - 10.0).abs() < 2.0);

        let up = resample_linear(&samples, 8_000, 16_000);
        assert!(((up.len() as f32) - 40.0).abs() < 2.0);
    }

    #[test]
    fn test_f32_to_pcm16_known_values() {
        let result = f32_to_pcm16(&[0.0, 1.0, -1.0]);
        assert_eq!(result[0], 0);
        assert_eq!(result[1], i16::MAX);
        assert_eq!(result[2], -i16::MAX);
    }

    #[test]
    fn test_f32_to_pcm16_clamps_out_of_range() {
        let result = f32_to_pcm16(&[2.0, -3.5]);
        assert_eq!(result[0], i16::MAX);
        assert_eq!(result[1], -i16::MAX);
    }

    #[test]
    fn test_chunk_source_empty_drain() {
        let source = chunk_source(48_000, 2, 16_000);
        assert!(source.drain_pcm16().is_empty());
    }

    #[test]
    fn test_chunk_source_drains_and_converts() {
        let ring = HeapRb::<f32>::new(1024);
        let (mut producer, consumer) = ring.split();

        // Stereo device frames at the target rate: conversion is downmix only
        producer.push_slice(&[0.5, 0.5, -0.5, -0.5]);

        let source = ChunkSource {
            consumer: Arc::new(Mutex::new(consumer)),
            device_sample_rate: 16_000,
            device_channels: 2,
            target_sample_rate: 16_000,
        };

        let chunk = source.drain_pcm16();
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk[0], (0.5 * f32::from(i16::MAX)) as i16);
        assert_eq!(chunk[1], -(0.5 * f32::from(i16::MAX)) as i16);

        // Second drain sees nothing new
        assert!(source.drain_pcm16().is_empty());
    }

    #[test]
    fn test_wav_debug_spec() {
        let samples = vec![100_i16, -200, 300, -400, 500];
        let wav_path = std::env::temp_dir().join("scribe_test_audio.wav");
        let _ = std::fs::remove_file(&wav_path);

        AudioCapture::save_wav_debug(&samples, 16_000, &wav_path).unwrap();
        assert!(wav_path.exists());

        let reader = hound::WavReader::open(&wav_path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.len() as usize, samples.len());

        let _ = std::fs::remove_file(wav_path);
    }

    #[test]
    fn test_wav_debug_creates_parent_dir() {
        let samples = vec![1_i16, 2];
        let dir = std::env::temp_dir().join("scribe_test_nested");
        let _ = std::fs::remove_dir_all(&dir);
        let nested_path = dir.join("debug.wav");

        AudioCapture::save_wav_debug(&samples, 16_000, &nested_path).unwrap();
        assert!(nested_path.exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_stream_control_pause_resume() {
        struct MockStreamControl {
            played: Arc<AtomicBool>,
            paused: Arc<AtomicBool>,
        }

        impl StreamControl for MockStreamControl {
            fn play(&self) -> Result<()> {
                self.played.store(true, Ordering::Relaxed);
                Ok(())
            }

            fn pause(&self) -> Result<()> {
                self.paused.store(true, Ordering::Relaxed);
                Ok(())
            }
        }

        let played = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let mock = MockStreamControl {
            played: Arc::clone(&played),
            paused: Arc::clone(&paused),
        };

        let mut capture = AudioCapture {
            stream_control: Some(Box::new(mock)),
            consumer: Arc::new(Mutex::new(HeapRb::<f32>::new(1024).split().1)),
            is_recording: Arc::new(AtomicBool::new(false)),
            device_sample_rate: 16_000,
            device_channels: 1,
            target_sample_rate: 16_000,
        };

        capture.start_recording().unwrap();
        assert!(played.load(Ordering::Relaxed));
        assert!(capture.is_recording.load(Ordering::Relaxed));

        capture.stop_recording().unwrap();
        assert!(paused.load(Ordering::Relaxed));
        assert!(!capture.is_recording.load(Ordering::Relaxed));
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_audio_capture_initialization() {
        let config = AudioConfig::default();
        let capture = AudioCapture::new(&config).unwrap();
        assert!(capture.device_sample_rate > 0);
        assert!(capture.device_channels > 0);
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_recording_cycle_drains_through_chunk_source() {
        let config = AudioConfig::default();
        let mut capture = AudioCapture::new(&config).unwrap();
        let source = capture.chunk_source();

        capture.start_recording().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));
        let _mid_chunk = source.drain_pcm16();
        capture.stop_recording().unwrap();
        let _tail_chunk = source.drain_pcm16();
        // Sample counts depend on the environment; no errors is the assertion
    }
}
