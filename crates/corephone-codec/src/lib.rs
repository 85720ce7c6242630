//! System codec catalog and the per-account codec priority/activation model
//! built on top of it.
//!
//! [`CodecRegistry`] is the process-wide catalog of codecs the media
//! backend supports (audio and video); it never changes after daemon
//! start. [`AccountCodecList`] is what each account actually offers on
//! the wire: a per-account, activation-aware, priority-ordered view over
//! that catalog.

mod account_codec;
mod error;
mod registry;

pub use account_codec::{AccountCodec, AccountCodecList};
pub use error::{CodecError, Result};
pub use registry::{CodecKind, CodecRegistry, MediaType, SystemCodec};

/// A union of media types, used to scope codec queries to audio, video,
/// or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaMask {
    audio: bool,
    video: bool,
}

impl MediaMask {
    /// Audio only.
    pub const AUDIO: Self = Self {
        audio: true,
        video: false,
    };
    /// Video only.
    pub const VIDEO: Self = Self {
        audio: false,
        video: true,
    };
    /// Audio and video.
    pub const BOTH: Self = Self {
        audio: true,
        video: true,
    };

    /// Does this mask admit `media_type`?
    pub fn admits(&self, media_type: MediaType) -> bool {
        match media_type {
            MediaType::Audio => self.audio,
            MediaType::Video => self.video,
            MediaType::Undefined => false,
        }
    }
}
