//! Packet abstractions for encoded media data.
//!
//! Packets contain compressed/encoded data before decoding or after encoding.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use bitflags::bitflags;
use std::borrow::Cow;
use std::fmt;

bitflags! {
    /// Flags for packet properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// This packet contains a keyframe.
        const KEYFRAME = 0x0001;
        /// Packet data is corrupted.
        const CORRUPT = 0x0002;
    }
}

/// An encoded media packet.
///
/// Packets can own their data or reference external data (zero-copy).
#[derive(Clone)]
pub struct Packet<'a> {
    /// The packet data.
    data: Cow<'a, [u8]>,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Decode timestamp.
    pub dts: Timestamp,
    /// Duration of the packet.
    pub duration: Duration,
    /// Stream index this packet belongs to.
    pub stream_index: u32,
    /// Packet flags.
    pub flags: PacketFlags,
    /// Byte position in the input container, if known.
    pub pos: Option<u64>,
}

impl<'a> Packet<'a> {
    /// Create a new packet with owned data.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(data),
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            duration: Duration::zero(),
            stream_index: 0,
            flags: PacketFlags::empty(),
            pos: None,
        }
    }

    /// Create a new packet referencing external data.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            duration: Duration::zero(),
            stream_index: 0,
            flags: PacketFlags::empty(),
            pos: None,
        }
    }

    /// Create an empty packet.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Get the packet data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the size of the packet data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this packet is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this is a keyframe packet.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(PacketFlags::KEYFRAME)
    }

    /// Make the packet own its data.
    pub fn into_owned(self) -> Packet<'static> {
        Packet {
            data: Cow::Owned(self.data.into_owned()),
            pts: self.pts,
            dts: self.dts,
            duration: self.duration,
            stream_index: self.stream_index,
            flags: self.flags,
            pos: self.pos,
        }
    }

    /// Rescale all time values to a new time base and clear the byte
    /// position.
    ///
    /// Presentation and decode timestamps use nearest rounding with ties
    /// away from zero, passing the unknown sentinel through unchanged;
    /// the duration uses plain nearest rounding. The byte position is
    /// reset because input and output container offsets are unrelated.
    pub fn rescale(&mut self, target: TimeBase) {
        self.pts = self.pts.rescale(target);
        self.dts = self.dts.rescale(target);
        self.duration = self.duration.rescale(target);
        self.pos = None;
    }

    /// Create a new packet with the specified timestamps.
    pub fn with_timestamps(mut self, pts: Timestamp, dts: Timestamp) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    /// Create a new packet with the specified stream index.
    pub fn with_stream_index(mut self, index: u32) -> Self {
        self.stream_index = index;
        self
    }

    /// Create a new packet with the specified flags.
    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Create a new packet with the specified duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

impl<'a> fmt::Debug for Packet<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.size())
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("stream_index", &self.stream_index)
            .field("flags", &self.flags)
            .finish()
    }
}

impl<'a> Default for Packet<'a> {
    fn default() -> Self {
        Self::empty()
    }
}

/// An owned packet suitable for storage across pipeline stages.
pub type OwnedPacket = Packet<'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_creation() {
        let packet = Packet::new(vec![0u8; 100]);
        assert_eq!(packet.size(), 100);
        assert!(!packet.is_empty());
    }

    #[test]
    fn test_packet_into_owned() {
        let data = [1u8, 2, 3];
        let packet = Packet::from_slice(&data);
        let owned: Packet<'static> = packet.into_owned();
        assert_eq!(owned.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_rescale_rewrites_times_and_clears_pos() {
        let ms = TimeBase::new(1, 1000);
        let mut packet = Packet::empty().with_timestamps(
            Timestamp::new(100, ms),
            Timestamp::new(80, ms),
        );
        packet.duration = Duration::new(40, ms);
        packet.pos = Some(4096);

        packet.rescale(TimeBase::new(1, 30));
        assert_eq!(packet.pts.value, 3);
        assert_eq!(packet.dts.value, 2);
        assert_eq!(packet.duration.value, 1);
        assert_eq!(packet.pos, None);
    }

    #[test]
    fn test_rescale_keeps_unknown_pts() {
        let mut packet = Packet::empty();
        packet.rescale(TimeBase::new(1, 30));
        assert!(!packet.pts.is_valid());
        assert!(!packet.dts.is_valid());
    }
}
