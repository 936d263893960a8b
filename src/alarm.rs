//! The end-of-countdown sound
//!
//! Playback goes through `rodio` when the crate is built with the `sound`
//! feature. The sound is either a short generated tone or an audio file from
//! the config. It plays in the background, so the countdown never waits for
//! it to end.

use std::path::PathBuf;
#[cfg(feature = "sound")]
use std::{fs::File, io::BufReader, time::Duration};

use anyhow::Result;
#[cfg(feature = "sound")]
use anyhow::Context;
use log::debug;
#[cfg(feature = "sound")]
use rodio::{source::SineWave, Decoder, OutputStream, OutputStreamHandle, Sink, Source};

/// Pitch of the generated alarm tone, in hertz
#[cfg(feature = "sound")]
const TONE_FREQUENCY: f32 = 880.0;

/// What the alarm sounds like
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AlarmSound {
    /// A short generated beep
    Tone,
    /// An audio file decoded by `rodio`
    File(PathBuf),
}

impl AlarmSound {
    pub fn from_file(file: Option<PathBuf>) -> Self {
        match file {
            Some(path) => Self::File(path),
            None => Self::Tone,
        }
    }
}

/// Plays the alarm on the default audio output
///
/// The output device is opened on first use and kept for later alarms.
pub struct Speaker {
    sound: AlarmSound,
    #[cfg(feature = "sound")]
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl Speaker {
    pub fn new(sound: AlarmSound) -> Self {
        Self {
            sound,
            #[cfg(feature = "sound")]
            output: None,
        }
    }

    /// Start playing the alarm without waiting for it to end
    #[cfg(feature = "sound")]
    pub fn play(&mut self) -> Result<()> {
        let source: Box<dyn Source<Item = f32> + Send> = match &self.sound {
            AlarmSound::Tone => Box::new(
                SineWave::new(TONE_FREQUENCY)
                    .take_duration(Duration::from_millis(800))
                    .amplify(0.25),
            ),
            AlarmSound::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Unable to open alarm sound {}", path.display()))?;
                let decoder = Decoder::new(BufReader::new(file))
                    .with_context(|| format!("Unable to decode alarm sound {}", path.display()))?;

                Box::new(decoder.convert_samples())
            }
        };

        let output = match self.output.take() {
            Some(output) => output,
            None => OutputStream::try_default().with_context(|| "Unable to open audio output")?,
        };
        let sink = Sink::try_new(&output.1);
        self.output = Some(output);

        let sink = sink.with_context(|| "Unable to start audio playback")?;
        sink.append(source);
        sink.detach();

        debug!("Playing alarm {:?}", self.sound);

        Ok(())
    }

    /// Built without audio support, so there is nothing to play
    #[cfg(not(feature = "sound"))]
    pub fn play(&mut self) -> Result<()> {
        debug!("Built without sound support, not playing {:?}", self.sound);

        Ok(())
    }
}
