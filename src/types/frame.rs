use crate::{
    error::Error,
    types::{FrameCount, FrameIndex},
};
use byteordered::byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use derive_more::Display;
use num_enum::TryFromPrimitive;
use std::io::Read;

/// ETI frame synchronisation word, alternating between consecutive frames.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, TryFromPrimitive,
)]
#[repr(u32)]
pub enum Fsync {
    #[display("0x073AB6")]
    Even = 0x07_3AB6,
    #[display("0xF8C549")]
    Odd = 0xF8_C549,
}

/// Leading bytes of an ETI frame, up to and including the FCT.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FrameHeader {
    /// ERR, 0xFF when the frame was received without error
    pub err: u8,
    /// FSYNC, 24 bits
    pub fsync: u32,
    /// FCT byte as found on the wire
    pub fct: u8,
}

impl FrameHeader {
    /// ERR + FSYNC + FCT
    pub const SIZE: usize = 5;

    pub const ERR_OK: u8 = 0xFF;

    pub fn parse<R: Read>(r: &mut R) -> Result<Self, Error> {
        let err = r.read_u8()?;
        let fsync = r.read_u24::<BigEndian>()?;
        let fct = r.read_u8()?;
        Ok(Self { err, fsync, fct })
    }

    pub fn is_error_free(&self) -> bool {
        self.err == Self::ERR_OK
    }

    /// Returns the sync word if it's one of the two valid ones
    pub fn sync(&self) -> Option<Fsync> {
        Fsync::try_from(self.fsync).ok()
    }

    pub fn frame_count(&self) -> Result<FrameCount, Error> {
        FrameCount::try_from(self.fct)
    }
}

/// One fixed-size frame block of a raw ETI stream.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EtiFrame {
    pub index: FrameIndex,
    pub data: Bytes,
}

impl EtiFrame {
    pub fn header(&self) -> Result<FrameHeader, Error> {
        FrameHeader::parse(&mut &self.data[..])
    }
}
