use crate::{
    error::Error,
    types::{FrameHeader, ETI_FRAME_SIZE},
};
use serde::{Deserialize, Serialize};

/// Where the frame count of each frame block comes from.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FctSource {
    /// `Frame Count [N]` lines of the analyzer report (`etisnoop -v`), one per frame
    #[default]
    #[serde(alias = "etisnoop")]
    Log,
    /// The FCT byte of each frame's own header
    #[serde(alias = "header")]
    FrameHeader,
}

/// The deduplicator configuration object.
///
/// Every key is optional, an empty mapping yields [`Config::default`]:
///
/// ```yaml
/// frame-size: 6144
/// fct-source: log
/// ```
#[derive(Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Size of a frame block in the raw input (bytes).
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// Source of the frame counts.
    #[serde(default)]
    pub fct_source: FctSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            fct_source: FctSource::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(s: &str) -> Result<Self, Error> {
        let cfg: Config = serde_yaml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Error> {
        // The FCT lives in the header, a block must at least hold that
        if self.frame_size < FrameHeader::SIZE {
            return Err(Error::InvalidFrameSize(self.frame_size));
        }
        Ok(())
    }
}

const fn default_frame_size() -> usize {
    ETI_FRAME_SIZE
}
