//! Audio channel layouts announced at launch.

/// Speaker layout requested for the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioConfiguration {
    #[default]
    Stereo,
    Surround51,
    Surround71,
}

impl AudioConfiguration {
    pub fn channel_count(self) -> u32 {
        match self {
            AudioConfiguration::Stereo => 2,
            AudioConfiguration::Surround51 => 6,
            AudioConfiguration::Surround71 => 8,
        }
    }

    /// Speaker positions present, one bit per channel position.
    pub fn channel_mask(self) -> u32 {
        match self {
            AudioConfiguration::Stereo => 0x3,
            AudioConfiguration::Surround51 => 0x3F,
            AudioConfiguration::Surround71 => 0x63F,
        }
    }

    /// Value of the `surroundAudioInfo` launch parameter.
    pub fn surround_audio_info(self) -> u32 {
        (self.channel_mask() << 16) | self.channel_count()
    }
}

impl std::str::FromStr for AudioConfiguration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stereo" => Ok(AudioConfiguration::Stereo),
            "5.1" | "surround51" => Ok(AudioConfiguration::Surround51),
            "7.1" | "surround71" => Ok(AudioConfiguration::Surround71),
            _ => Err(format!("unknown audio configuration: {s}")),
        }
    }
}

impl std::fmt::Display for AudioConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioConfiguration::Stereo => write!(f, "stereo"),
            AudioConfiguration::Surround51 => write!(f, "5.1"),
            AudioConfiguration::Surround71 => write!(f, "7.1"),
        }
    }
}
