//! Audio system managing live capture and spectrum analysis.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use super::overlap::OverlapBuffer;
use super::worker::{SpectrumPipeline, SpectrumWorker, WindowMailbox};
use crate::error::{Error, Result};
use crate::params::audio_constants::{MAX_BLOCK_FRAMES, MONITOR_BUFFER_SECS};
use crate::params::SpectrumConfig;
use crate::spectrum::SharedSpectrum;

/// Audio system managing capture and FFT analysis
pub struct AudioSystem {
    /// Input stream (kept alive)
    _input: cpal::Stream,

    /// Optional passthrough to the default output device (kept alive)
    _monitor: Option<cpal::Stream>,

    /// Handoff between the capture callback and the worker
    mailbox: Arc<WindowMailbox>,

    /// Spectrum analysis thread
    worker: SpectrumWorker,
}

impl AudioSystem {
    /// Open the default input device and start analysis into `shared`
    pub fn new(config: &SpectrumConfig, shared: SharedSpectrum) -> Result<Self> {
        config.validate()?;

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no audio input device found".to_string()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| Error::Audio(format!("failed to get input config: {}", e)))?;
        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();
        let sample_rate_hz = stream_config.sample_rate.0;

        log::info!(
            "Audio input: {} @ {}Hz, {} ch, {:?}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate_hz,
            stream_config.channels,
            sample_format
        );
        log::info!(
            "Spectrum: window {} ({:.1} Hz/bin), hop {}, {} rows",
            config.window_size,
            config.bin_resolution_hz(sample_rate_hz),
            config.hop(),
            config.history_rows
        );

        let mailbox = Arc::new(WindowMailbox::new(config.window_size, config.spare_windows));
        let worker = SpectrumWorker::spawn(
            SpectrumPipeline::new(config),
            Arc::clone(&mailbox),
            shared,
        )?;

        let (monitor, monitor_feed) = if config.monitor {
            match build_monitor(&host, sample_rate_hz) {
                Ok((stream, producer)) => (Some(stream), Some(producer)),
                Err(e) => {
                    log::warn!("Monitor disabled: {}", e);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let capture = Capture {
            overlap: OverlapBuffer::new(config),
            mailbox: Arc::clone(&mailbox),
            monitor: monitor_feed,
            channels: usize::from(stream_config.channels.max(1)),
            scratch: vec![0.0; MAX_BLOCK_FRAMES],
        };

        let input = match sample_format {
            cpal::SampleFormat::F32 => build_capture_stream::<f32>(&device, &stream_config, capture),
            cpal::SampleFormat::I16 => build_capture_stream::<i16>(&device, &stream_config, capture),
            cpal::SampleFormat::U16 => build_capture_stream::<u16>(&device, &stream_config, capture),
            other => Err(Error::Audio(format!(
                "unsupported input sample format: {:?}",
                other
            ))),
        }?;

        input
            .play()
            .map_err(|e| Error::Audio(format!("failed to start input stream: {}", e)))?;
        if let Some(stream) = &monitor {
            stream
                .play()
                .map_err(|e| Error::Audio(format!("failed to start monitor stream: {}", e)))?;
        }

        Ok(Self {
            _input: input,
            _monitor: monitor,
            mailbox,
            worker,
        })
    }

    /// True once the spectrum worker has ended, which only happens on a failure or stop
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Windows dropped because analysis fell behind capture
    pub fn dropped_windows(&self) -> u64 {
        self.mailbox.dropped()
    }

    /// Stop analysis; streams stop when the system is dropped
    pub fn stop(&mut self) -> Result<()> {
        let result = self.worker.stop();
        let dropped = self.dropped_windows();
        if dropped > 0 {
            log::debug!("Dropped {} stale spectrum windows", dropped);
        }
        result
    }
}

/// State owned by the capture callback
struct Capture {
    overlap: OverlapBuffer,
    mailbox: Arc<WindowMailbox>,
    monitor: Option<HeapProd<f32>>,
    channels: usize,
    /// Preallocated mono block
    scratch: Vec<f32>,
}

impl Capture {
    fn process<T>(&mut self, data: &[T])
    where
        T: cpal::Sample,
        f32: cpal::FromSample<T>,
    {
        for frames in data.chunks(self.channels * MAX_BLOCK_FRAMES) {
            let mono = &mut self.scratch[..frames.len() / self.channels];
            downmix(frames, self.channels, mono);

            let mailbox = &self.mailbox;
            self.overlap.feed(mono, |window| {
                mailbox.offer(window);
            });
            if let Some(monitor) = self.monitor.as_mut() {
                monitor.push_slice(mono);
            }
        }
    }
}

/// Average interleaved frames into mono samples
pub(crate) fn downmix<T>(interleaved: &[T], channels: usize, mono: &mut [f32])
where
    T: cpal::Sample,
    f32: cpal::FromSample<T>,
{
    for (out, frame) in mono.iter_mut().zip(interleaved.chunks_exact(channels)) {
        let sum: f32 = frame
            .iter()
            .map(|&sample| -> f32 { cpal::Sample::from_sample(sample) })
            .sum();
        *out = sum / channels as f32;
    }
}

fn build_capture_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut capture: Capture,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| capture.process(data),
            |err| log::error!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|e| Error::Audio(format!("failed to build input stream: {}", e)))
}

/// Output stream replaying the down-mixed input on every output channel
fn build_monitor(host: &cpal::Host, sample_rate_hz: u32) -> Result<(cpal::Stream, HeapProd<f32>)> {
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no audio output device found".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| Error::Audio(format!("failed to get output config: {}", e)))?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(Error::Audio(format!(
            "monitor needs f32 output, device uses {:?}",
            supported.sample_format()
        )));
    }
    if supported.sample_rate().0 != sample_rate_hz {
        return Err(Error::Audio(format!(
            "output runs at {}Hz, input at {}Hz",
            supported.sample_rate().0,
            sample_rate_hz
        )));
    }

    let config: cpal::StreamConfig = supported.into();
    let channels = usize::from(config.channels.max(1));
    let capacity = ((sample_rate_hz as f32 * MONITOR_BUFFER_SECS) as usize).max(MAX_BLOCK_FRAMES);
    let (producer, mut consumer): (HeapProd<f32>, HeapCons<f32>) =
        HeapRb::<f32>::new(capacity).split();

    log::info!(
        "Monitor: {} ({} ch)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        channels
    );

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = consumer.try_pop().unwrap_or(0.0);
                    frame.fill(sample);
                }
            },
            |err| log::error!("Audio monitor stream error: {}", err),
            None,
        )
        .map_err(|e| Error::Audio(format!("failed to build monitor stream: {}", e)))?;

    Ok((stream, producer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_downmix_averages_channels() {
        let interleaved = [1.0f32, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mut mono = [9.0f32; 3];

        downmix(&interleaved, 2, &mut mono);

        assert_eq!(mono, [0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_integer_downmix_is_normalized() {
        let interleaved = [i16::MAX, i16::MAX, 0, 0];
        let mut mono = [0.0f32; 2];

        downmix(&interleaved, 2, &mut mono);

        assert!((mono[0] - 1.0).abs() < 1e-3);
        assert_eq!(mono[1], 0.0);
    }

    #[test]
    fn test_capture_feeds_overlap_buffer_in_blocks() {
        let config = SpectrumConfig {
            window_size: 16,
            overlap: 0.5,
            ..Default::default()
        };
        let mailbox = Arc::new(WindowMailbox::new(16, 3));
        let mut capture = Capture {
            overlap: OverlapBuffer::new(&config),
            mailbox: Arc::clone(&mailbox),
            monitor: None,
            channels: 2,
            scratch: vec![0.0; MAX_BLOCK_FRAMES],
        };

        // 8 stereo frames = one hop
        let block: Vec<f32> = (0..16).map(|i| (i / 2) as f32).collect();
        capture.process(&block);

        let window = mailbox.take().unwrap();
        assert_eq!(&window[8..], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(mailbox.dropped(), 0);
    }
}
