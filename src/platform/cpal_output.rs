use super::{AudioOutput, TestTone};
use crate::engine::BuildUpEngine;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, Sample, SizedSample, Stream, StreamConfig,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Frames handed to the engine per call inside the callback
const CALLBACK_BLOCK_FRAMES: usize = 1024;

pub struct CpalOutput {
    stream: Option<Stream>,
    device: Option<Device>,
    config: Option<StreamConfig>,
    sample_rate: f32,
    is_active: bool,
    frames_rendered: Arc<AtomicU64>,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self {
            stream: None,
            device: None,
            config: None,
            sample_rate: 44100.0,
            is_active: false,
            frames_rendered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build the output stream. The engine and tone are prepared for the
    /// device's sample rate here and then moved into the audio callback.
    pub fn create_stream(
        &mut self,
        mut engine: BuildUpEngine,
        mut tone: TestTone,
        bpm: Option<f32>,
    ) -> Result<(), anyhow::Error> {
        let device = self.device.as_ref().ok_or_else(|| anyhow::anyhow!("Device not initialized"))?;
        let config = self.config.as_ref().ok_or_else(|| anyhow::anyhow!("Config not initialized"))?;

        engine.prepare(self.sample_rate, CALLBACK_BLOCK_FRAMES);
        tone.set_sample_rate(self.sample_rate);

        let supported_config = device.default_output_config()?;
        let counter = self.frames_rendered.clone();
        let stream = match supported_config.sample_format() {
            cpal::SampleFormat::I16 => Self::make_stream::<i16>(device, config, engine, tone, bpm, counter)?,
            cpal::SampleFormat::I32 => Self::make_stream::<i32>(device, config, engine, tone, bpm, counter)?,
            cpal::SampleFormat::U16 => Self::make_stream::<u16>(device, config, engine, tone, bpm, counter)?,
            cpal::SampleFormat::F32 => Self::make_stream::<f32>(device, config, engine, tone, bpm, counter)?,
            cpal::SampleFormat::F64 => Self::make_stream::<f64>(device, config, engine, tone, bpm, counter)?,
            sample_format => return Err(anyhow::anyhow!("Unsupported sample format '{}'", sample_format)),
        };

        self.stream = Some(stream);
        Ok(())
    }

    /// Frames rendered since the stream was started
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// Setup the CPAL host and device
    fn setup_host_device(&mut self) -> Result<(), anyhow::Error> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("Default output device is not available"))?;

        log::info!("Output device: {}", device.name()?);

        let config = device.default_output_config()?;
        log::info!("Default output config: {:?}", config);

        self.sample_rate = config.sample_rate().0 as f32;
        self.device = Some(device);
        self.config = Some(config.into());

        Ok(())
    }

    /// Create a typed stream for the given sample format
    fn make_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut engine: BuildUpEngine,
        mut tone: TestTone,
        bpm: Option<f32>,
        frames_rendered: Arc<AtomicU64>,
    ) -> Result<Stream, anyhow::Error>
    where
        T: SizedSample + FromSample<f32>,
    {
        let num_channels = config.channels as usize;
        let mut scratch = vec![0.0f32; CALLBACK_BLOCK_FRAMES * num_channels];

        let err_fn = |err| log::error!("Error in output sound stream: {}", err);

        let stream = device.build_output_stream(
            config,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                Self::render(output, &mut scratch, &mut engine, &mut tone, num_channels, bpm);
                let frames = output.len() / num_channels.max(1);
                frames_rendered.fetch_add(frames as u64, Ordering::Relaxed);
            },
            err_fn,
            None,
        )?;

        Ok(stream)
    }

    /// Fill one device buffer: tone in, engine, convert out
    fn render<SampleType>(
        output: &mut [SampleType],
        scratch: &mut [f32],
        engine: &mut BuildUpEngine,
        tone: &mut TestTone,
        num_channels: usize,
        bpm: Option<f32>,
    ) where
        SampleType: Sample + FromSample<f32>,
    {
        if num_channels == 0 {
            return;
        }
        for out in output.chunks_mut(scratch.len()) {
            let block = &mut scratch[..out.len()];
            tone.fill_interleaved(block, num_channels);
            engine.process_interleaved(block, num_channels, bpm);
            for (dst, &src) in out.iter_mut().zip(block.iter()) {
                *dst = SampleType::from_sample(src.clamp(-1.0, 1.0));
            }
        }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn initialize(&mut self, sample_rate: f32) -> Result<(), anyhow::Error> {
        self.sample_rate = sample_rate;
        self.setup_host_device()?;
        Ok(())
    }

    fn start(&mut self) -> Result<(), anyhow::Error> {
        if let Some(stream) = &self.stream {
            self.frames_rendered.store(0, Ordering::Relaxed);
            stream.play()?;
            self.is_active = true;
            log::info!("Audio stream started at sample rate: {}", self.sample_rate);
        } else {
            return Err(anyhow::anyhow!("Stream not created. Call create_stream first."));
        }

        Ok(())
    }

    fn stop(&mut self) -> Result<(), anyhow::Error> {
        if let Some(stream) = &self.stream {
            stream.pause()?;
            self.is_active = false;
            log::info!("Audio stream stopped");
        }

        Ok(())
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}
