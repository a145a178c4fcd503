use crate::{error::Error, types::FrameIndex};
use regex::Regex;
use std::{
    io::{self, Read},
    sync::LazyLock,
};

static FCT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Frame Count \[([0-9]+)\]").expect("FCT pattern is a valid regex")
});

/// Extracts the FCT from one line of the analyzer report.
///
/// Returns `Ok(None)` for lines that don't carry a frame count. Only the first
/// match on a line is considered. The value is returned as reported, range
/// checks are left to [`Deduplicator::decide_raw`](crate::Deduplicator::decide_raw).
pub(crate) fn extract_fct(line: &str) -> Result<Option<u64>, Error> {
    FCT_PATTERN
        .captures(line)
        .map(|c| c[1].parse::<u64>().map_err(|_| Error::invalid_fct(&c[1])))
        .transpose()
}

/// Blocking reader of fixed-size frame blocks.
#[derive(Debug)]
pub(crate) struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    index: FrameIndex,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, frame_size: usize) -> Self {
        Self {
            inner,
            buf: vec![0; frame_size],
            index: 0,
        }
    }

    /// Index of the next frame to be read
    pub fn index(&self) -> FrameIndex {
        self.index
    }

    /// Reads the next full frame block.
    ///
    /// `Ok(None)` means the input ended exactly on a frame boundary; a
    /// partial block is an error.
    pub fn next_frame(&mut self) -> Result<Option<(FrameIndex, &[u8])>, Error> {
        let frame_size = self.buf.len();
        let mut filled = 0;
        while filled < frame_size {
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < frame_size {
            return Err(Error::truncated(self.index, filled, frame_size));
        }

        let index = self.index;
        self.index += 1;
        Ok(Some((index, &self.buf)))
    }

    /// Reads the next full frame block, the input must not be exhausted.
    pub fn require_frame(&mut self) -> Result<(FrameIndex, &[u8]), Error> {
        let index = self.index;
        let frame_size = self.buf.len();
        self.next_frame()?
            .ok_or_else(|| Error::truncated(index, 0, frame_size))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fct_lines() {
        assert_eq!(
            extract_fct("\t\tFCT  - Frame Count [42] ").unwrap(),
            Some(42)
        );
        assert_eq!(extract_fct("Frame Count [0]").unwrap(), Some(0));
        assert_eq!(
            extract_fct("Frame Count [7] Frame Count [9]").unwrap(),
            Some(7)
        );
        assert_eq!(extract_fct("Sync FSYNC [OK] ").unwrap(), None);
        assert_eq!(extract_fct("Frame Count []").unwrap(), None);
        assert_eq!(extract_fct("Frame Count [-1]").unwrap(), None);
        assert_eq!(extract_fct("FCT  - Frame Count: 2a  [42] ").unwrap(), None);
        assert_eq!(extract_fct("").unwrap(), None);
    }

    #[test]
    fn fct_out_of_range() {
        assert_eq!(extract_fct("Frame Count [250]").unwrap(), Some(250));
        assert_eq!(extract_fct("Frame Count [300]").unwrap(), Some(300));
        assert!(matches!(
            extract_fct("Frame Count [123456789012345678901234567890]"),
            Err(Error::InvalidFrameCount(s)) if s == "123456789012345678901234567890"
        ));
    }

    /// Hands out at most 3 bytes per read call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3);
            self.0.read(&mut buf[..n])
        }
    }

    #[test]
    fn frame_blocks() {
        let data: Vec<u8> = (0..20).collect();
        let mut r = FrameReader::new(Trickle(Cursor::new(data)), 8);

        let (idx, frame) = r.next_frame().unwrap().unwrap();
        assert_eq!(idx, 0);
        assert_eq!(frame, &[0, 1, 2, 3, 4, 5, 6, 7]);

        let (idx, frame) = r.require_frame().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(frame[0], 8);

        assert!(matches!(
            r.next_frame(),
            Err(Error::TruncatedFrame {
                index: 2,
                available: 4,
                frame_size: 8
            })
        ));
    }

    #[test]
    fn exhausted_input() {
        let mut r = FrameReader::new(Cursor::new(vec![1_u8; 8]), 8);
        assert!(r.next_frame().unwrap().is_some());
        assert!(r.next_frame().unwrap().is_none());
        assert!(matches!(
            r.require_frame(),
            Err(Error::TruncatedFrame {
                index: 1,
                available: 0,
                ..
            })
        ));
    }
}
