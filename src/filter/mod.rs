use self::types::{extract_fct, FrameReader};
use crate::{
    config::Config,
    error::Error,
    types::{Decision, EtiFrame, FrameCount, FrameHeader, FrameIndex, Summary, Verdict},
};
use bytes::BytesMut;
use std::io::{BufRead, Read, Write};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_stream::StreamExt;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, FramedRead};
use tracing::{debug, warn};

pub(crate) mod types;

/// Frame count bookkeeping for one run.
///
/// Keeps the last accepted FCT and decides, frame by frame, whether a frame
/// continues the sequence or is a leftover to be dropped.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Deduplicator {
    last: Option<FrameCount>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted frame count, `None` until a frame has been kept
    pub fn last_seen(&self) -> Option<FrameCount> {
        self.last
    }

    pub fn decide(&mut self, fct: FrameCount) -> Decision {
        let decision = match self.last {
            // The analyzer sometimes repeats 249 right after the wrap
            Some(FrameCount::MIN) if fct == FrameCount::MAX => {
                Decision::IgnoreDuplicateRollover(fct)
            }
            last if Some(fct) > last => Decision::Take(fct),
            Some(FrameCount::MAX) if fct == FrameCount::MIN => Decision::TakeRollover(fct),
            _ => Decision::Ignore(fct),
        };

        if decision.is_kept() {
            if let Some(last) = self.last {
                if last.next() != fct {
                    warn!(%last, %fct, "FCT not contiguous");
                }
            }
            self.last = Some(fct);
        }

        decision
    }

    /// Decides on a frame count as reported, before any range check.
    ///
    /// Values past 249 only come from corrupted frames, those are dropped and
    /// leave the last accepted frame count untouched.
    pub fn decide_raw(&mut self, fct: u64) -> Decision {
        match u8::try_from(fct).ok().and_then(FrameCount::new) {
            Some(fct) => self.decide(fct),
            None => {
                warn!(fct, "FCT out of range");
                Decision::IgnoreOutOfRange(fct)
            }
        }
    }
}

/// Removes duplicate and out-of-order frames from a raw ETI stream.
///
/// A `Filter` carries the state of a single run, use a fresh one per input.
#[derive(Debug)]
pub struct Filter {
    frame_size: usize,
    dedup: Deduplicator,
}

impl Filter {
    pub fn new(cfg: &Config) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            frame_size: cfg.frame_size,
            dedup: Deduplicator::new(),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.dedup
    }

    pub fn frame_decoder(&self) -> EtiFrameDecoder {
        EtiFrameDecoder::new(self.frame_size)
    }

    /// Filters `input` using the frame counts reported in `log`.
    ///
    /// Every log line carrying a `Frame Count [N]` consumes exactly one frame
    /// block of `input`, kept blocks are copied to `output`. Bytes left in
    /// `input` once the log ends are ignored.
    pub fn filter<L, R, W, F>(
        &mut self,
        mut log: L,
        input: R,
        mut output: W,
        mut on_verdict: F,
    ) -> Result<Summary, Error>
    where
        L: BufRead,
        R: Read,
        W: Write,
        F: FnMut(&Verdict),
    {
        let mut frames = FrameReader::new(input, self.frame_size);
        let mut summary = Summary::default();
        let mut line = Vec::new();

        loop {
            line.clear();
            if log.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            summary.log_lines += 1;

            let Some(fct) = extract_fct(&String::from_utf8_lossy(&line))? else {
                continue;
            };

            let (index, frame) = frames.require_frame()?;
            let verdict = self.verdict(index, fct);
            if verdict.decision.is_kept() {
                output.write_all(frame)?;
            }
            summary.record(&verdict.decision);
            on_verdict(&verdict);
        }

        output.flush()?;
        summary.last_fct = self.dedup.last_seen();
        debug_assert_eq!(frames.index(), summary.frames_read);
        Ok(summary)
    }

    /// Filters `input` using the FCT carried in each frame's own header.
    ///
    /// The whole input is consumed, it must end on a frame boundary.
    pub fn filter_frames<R, W, F>(
        &mut self,
        input: R,
        mut output: W,
        mut on_verdict: F,
    ) -> Result<Summary, Error>
    where
        R: Read,
        W: Write,
        F: FnMut(&Verdict),
    {
        let mut frames = FrameReader::new(input, self.frame_size);
        let mut summary = Summary::default();

        while let Some((index, frame)) = frames.next_frame()? {
            let fct = header_fct(index, frame)?;
            let verdict = self.verdict(index, fct);
            if verdict.decision.is_kept() {
                output.write_all(frame)?;
            }
            summary.record(&verdict.decision);
            on_verdict(&verdict);
        }

        output.flush()?;
        summary.last_fct = self.dedup.last_seen();
        Ok(summary)
    }

    /// Async flavor of [`Filter::filter`].
    pub async fn filter_async<L, R, W, F>(
        &mut self,
        log: L,
        input: R,
        mut output: W,
        mut on_verdict: F,
    ) -> Result<Summary, Error>
    where
        L: AsyncRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
        F: FnMut(&Verdict),
    {
        let mut lines = FramedRead::new(log, AnyDelimiterCodec::new(b"\n".to_vec(), Vec::new()));
        let mut frames = FramedRead::new(input, self.frame_decoder());
        let mut summary = Summary::default();

        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| match e {
                AnyDelimiterCodecError::Io(e) => Error::Io(e),
                e => Error::LogLine(e.to_string()),
            })?;
            summary.log_lines += 1;

            let Some(fct) = extract_fct(&String::from_utf8_lossy(&line))? else {
                continue;
            };

            let frame = match frames.next().await {
                Some(frame) => frame?,
                None => return Err(Error::truncated(summary.frames_read, 0, self.frame_size)),
            };
            let verdict = self.verdict(frame.index, fct);
            if verdict.decision.is_kept() {
                output.write_all(&frame.data).await?;
            }
            summary.record(&verdict.decision);
            on_verdict(&verdict);
        }

        output.flush().await?;
        summary.last_fct = self.dedup.last_seen();
        Ok(summary)
    }

    fn verdict(&mut self, index: FrameIndex, fct: u64) -> Verdict {
        let decision = self.dedup.decide_raw(fct);
        debug!(index, fct, kept = decision.is_kept(), "{decision}");
        Verdict { index, decision }
    }
}

fn header_fct(index: FrameIndex, frame: &[u8]) -> Result<u64, Error> {
    let hdr = FrameHeader::parse(&mut &frame[..])?;
    if !hdr.is_error_free() {
        warn!(index, err = hdr.err, "Frame ERR field reports an error");
    }
    if hdr.sync().is_none() {
        warn!(index, "Wrong FSYNC 0x{:06X}", hdr.fsync);
    }
    Ok(hdr.fct.into())
}

/// A fixed-size ETI frame decoder.
#[derive(Debug)]
pub struct EtiFrameDecoder {
    frame_size: usize,
    index: FrameIndex,
}

impl EtiFrameDecoder {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            index: 0,
        }
    }
}

impl Decoder for EtiFrameDecoder {
    type Item = EtiFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < self.frame_size {
            // Not enough data for a whole frame
            src.reserve(self.frame_size - src.len());
            return Ok(None);
        }

        let data = src.split_to(self.frame_size).freeze();
        let frame = EtiFrame {
            index: self.index,
            data,
        };
        self.index += 1;
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(Error::truncated(self.index, src.len(), self.frame_size)),
        }
    }
}
