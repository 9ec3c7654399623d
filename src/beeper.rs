use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Stream, StreamConfig,
};
use thiserror::Error;

const TONE_FREQUENCY: f32 = 440.0;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error(transparent)]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),
    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error(transparent)]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Sine tone output. The audio thread only ever reads the shared
/// flag; the host loop flips it when the sound signal changes.
pub struct Beeper {
    stream: Option<Stream>,
    shared_state_ptr: Arc<AtomicBool>,
    previous_state: bool,
}

impl Beeper {
    pub fn new() -> Self {
        let initial_state = false;
        let shared_state_ptr = Arc::new(AtomicBool::new(initial_state));

        Self {
            stream: None,
            shared_state_ptr,
            previous_state: initial_state,
        }
    }

    pub fn start_stream(&mut self) -> Result<(), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device.default_output_config()?;
        let state_ptr = self.shared_state_ptr.clone();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => make_stream::<f32>(state_ptr, &device, &config.into()),
            cpal::SampleFormat::I16 => make_stream::<i16>(state_ptr, &device, &config.into()),
            cpal::SampleFormat::U16 => make_stream::<u16>(state_ptr, &device, &config.into()),
        }?;
        stream.play()?;
        log::info!(
            "audio stream started on {}",
            device.name().unwrap_or_else(|_| "unknown device".into())
        );

        self.stream = Some(stream);
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn set_beeper_active(&mut self, new_state: bool) {
        if self.previous_state != new_state {
            self.previous_state = new_state;
            self.shared_state_ptr
                .store(self.previous_state, Ordering::Relaxed);
        }
    }
}

impl Default for Beeper {
    fn default() -> Self {
        Self::new()
    }
}

fn make_stream<T>(
    shared_state_ptr: Arc<AtomicBool>,
    device: &cpal::Device,
    config: &StreamConfig,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample,
{
    let sample_rate = config.sample_rate.0 as f32;
    let channels = config.channels as usize;

    // Produce a sine of maximum amplitude.
    let mut sample_clock = 0f32;
    let mut sinewave_value_fn = move || {
        sample_clock = (sample_clock + 1.0) % sample_rate;
        (sample_clock * TONE_FREQUENCY * 2.0 * std::f32::consts::PI / sample_rate).sin()
    };
    let mut silence_value_fn = || 0.0;

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if shared_state_ptr.load(Ordering::Relaxed) {
                write_data(data, channels, &mut sinewave_value_fn)
            } else {
                write_data(data, channels, &mut silence_value_fn)
            }
        },
        |err| log::error!("an error occurred on the audio stream: {}", err),
    )
}

fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
where
    T: cpal::Sample,
{
    for frame in output.chunks_mut(channels) {
        let value: T = cpal::Sample::from::<f32>(&next_sample());
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::{write_data, Beeper};

    #[test]
    fn beeper_flag_follows_sound_signal() {
        let mut beeper = Beeper::new();
        assert!(!beeper.is_streaming());

        beeper.set_beeper_active(true);
        assert!(beeper.shared_state_ptr.load(Ordering::Relaxed));
        beeper.set_beeper_active(false);
        assert!(!beeper.shared_state_ptr.load(Ordering::Relaxed));
    }

    #[test]
    fn write_data_fills_every_channel() {
        let mut output = [0f32; 6];
        let mut next = 0.0;
        write_data(&mut output, 2, &mut || {
            next += 0.25;
            next
        });
        assert_eq!(output, [0.25, 0.25, 0.5, 0.5, 0.75, 0.75]);
    }
}
