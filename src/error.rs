use crate::types::{FrameHeader, FrameIndex};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "Input ended before frame {index} was complete ({available} of {frame_size} bytes available)"
    )]
    TruncatedFrame {
        index: FrameIndex,
        available: usize,
        frame_size: usize,
    },

    #[error("Invalid frame count '{0}' (expected an integer in 0..=249)")]
    InvalidFrameCount(String),

    #[error(
        "Invalid frame size ({0} bytes), a frame must hold at least the {min}-byte header",
        min = FrameHeader::SIZE
    )]
    InvalidFrameSize(usize),

    #[error("Failed to process YAML ({0})")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read a line from the analyzer log ({0})")]
    LogLine(String),

    #[error(
        "Encountered an IO error ({})",
        .0.kind()
    )]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn truncated(index: FrameIndex, available: usize, frame_size: usize) -> Self {
        Error::TruncatedFrame {
            index,
            available,
            frame_size,
        }
    }

    pub(crate) fn invalid_fct<S: ToString>(s: S) -> Self {
        Error::InvalidFrameCount(s.to_string())
    }
}
