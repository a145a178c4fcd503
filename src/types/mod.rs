use crate::error::Error;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use frame::{EtiFrame, FrameHeader, Fsync};

pub mod frame;

/// Zero-based position of a frame block within the raw input.
pub type FrameIndex = u64;

/// Size of a raw ETI frame (ETI(NI) padded to 6144 bytes).
pub const ETI_FRAME_SIZE: usize = 6144;

/// ETI frame count (FCT), a counter that wraps from 249 back to 0.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct FrameCount(u8);

impl FrameCount {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(249);
    pub const MODULUS: u16 = 250;

    pub const fn new(fct: u8) -> Option<Self> {
        if fct <= Self::MAX.0 {
            Some(Self(fct))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The frame count expected after this one.
    pub fn next(self) -> Self {
        Self(((u16::from(self.0) + 1) % Self::MODULUS) as u8)
    }
}

impl TryFrom<u8> for FrameCount {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| Error::invalid_fct(value))
    }
}

impl From<FrameCount> for u8 {
    fn from(value: FrameCount) -> Self {
        value.0
    }
}

impl FromStr for FrameCount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: u8 = s.parse().map_err(|_| Error::invalid_fct(s))?;
        Self::try_from(v)
    }
}

/// What happened to a single frame block.
///
/// The [`Display`] form is the progress line reported for the frame.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum Decision {
    /// Frame count increased, the frame is kept
    #[display("Take {_0}")]
    Take(FrameCount),
    /// Valid wrap from 249 to 0, the frame is kept
    #[display("Take {_0} because rollover")]
    TakeRollover(FrameCount),
    /// 249 reported again right after an accepted 0, the frame is dropped
    #[display("Ignore {_0} duplicate rollover")]
    IgnoreDuplicateRollover(FrameCount),
    /// Stale, duplicated or out-of-order frame, dropped
    #[display("Ignore {_0}")]
    Ignore(FrameCount),
    /// Reported frame count is past 249, the frame is corrupted and dropped
    #[display("Ignore {_0} out of range")]
    IgnoreOutOfRange(u64),
}

impl Decision {
    pub fn is_kept(&self) -> bool {
        matches!(self, Self::Take(_) | Self::TakeRollover(_))
    }

    /// The frame count the decision was made on, `None` if it was out of range
    pub fn frame_count(&self) -> Option<FrameCount> {
        match self {
            Self::Take(fct)
            | Self::TakeRollover(fct)
            | Self::IgnoreDuplicateRollover(fct)
            | Self::Ignore(fct) => Some(*fct),
            Self::IgnoreOutOfRange(_) => None,
        }
    }
}

/// Decision for one frame block together with where it sits in the input.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display("{decision}")]
pub struct Verdict {
    pub index: FrameIndex,
    pub decision: Decision,
}

/// Counters for one filtering run.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Summary {
    /// Lines read from the analyzer log (zero when FCTs come from the frame headers).
    pub log_lines: u64,
    /// Frame blocks consumed from the input.
    pub frames_read: u64,
    /// Frame blocks written to the output.
    pub frames_kept: u64,
    /// Frame blocks discarded.
    pub frames_dropped: u64,
    /// Last accepted frame count, if any frame was kept.
    pub last_fct: Option<FrameCount>,
}

impl Summary {
    pub(crate) fn record(&mut self, decision: &Decision) {
        self.frames_read += 1;
        if decision.is_kept() {
            self.frames_kept += 1;
        } else {
            self.frames_dropped += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fct(v: u8) -> FrameCount {
        FrameCount::new(v).unwrap()
    }

    #[test]
    fn frame_count_range() {
        assert_eq!(FrameCount::new(0), Some(FrameCount::MIN));
        assert_eq!(FrameCount::new(249), Some(FrameCount::MAX));
        assert_eq!(FrameCount::new(250), None);
        assert!(FrameCount::try_from(255_u8).is_err());
    }

    #[test]
    fn frame_count_wraps() {
        assert_eq!(fct(0).next(), fct(1));
        assert_eq!(fct(248).next(), fct(249));
        assert_eq!(FrameCount::MAX.next(), FrameCount::MIN);
    }

    #[test]
    fn frame_count_from_str() {
        assert_eq!("42".parse::<FrameCount>().unwrap(), fct(42));
        assert_eq!("007".parse::<FrameCount>().unwrap(), fct(7));
        assert!(matches!(
            "250".parse::<FrameCount>(),
            Err(Error::InvalidFrameCount(s)) if s == "250"
        ));
        assert!(matches!(
            "99999999999999999999".parse::<FrameCount>(),
            Err(Error::InvalidFrameCount(_))
        ));
        assert!("".parse::<FrameCount>().is_err());
    }

    #[test]
    fn decision_progress_lines() {
        assert_eq!(Decision::Take(fct(5)).to_string(), "Take 5");
        assert_eq!(
            Decision::TakeRollover(fct(0)).to_string(),
            "Take 0 because rollover"
        );
        assert_eq!(
            Decision::IgnoreDuplicateRollover(fct(249)).to_string(),
            "Ignore 249 duplicate rollover"
        );
        assert_eq!(Decision::Ignore(fct(9)).to_string(), "Ignore 9");
        assert_eq!(
            Decision::IgnoreOutOfRange(300).to_string(),
            "Ignore 300 out of range"
        );
        assert_eq!(
            Decision::IgnoreDuplicateRollover(fct(249)).frame_count(),
            Some(FrameCount::MAX)
        );
        assert_eq!(Decision::IgnoreOutOfRange(250).frame_count(), None);
    }

    #[test]
    fn summary_counts() {
        let mut s = Summary::default();
        s.record(&Decision::Take(fct(1)));
        s.record(&Decision::Ignore(fct(1)));
        s.record(&Decision::TakeRollover(fct(0)));
        s.record(&Decision::IgnoreOutOfRange(255));
        assert_eq!(s.frames_read, 4);
        assert_eq!(s.frames_kept, 2);
        assert_eq!(s.frames_dropped, 2);
    }
}
