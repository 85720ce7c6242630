//! The process-wide codec catalog.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::MediaMask;

/// Which kind of media a [`SystemCodec`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    /// Audio codec.
    Audio,
    /// Video codec.
    Video,
    /// Neither — should not appear in a populated registry, but kept so
    /// `AccountCodec::find_by_*` callers can match on it defensively.
    Undefined,
}

/// Whether a [`SystemCodec`] entry can encode, decode, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecKind {
    /// Encode only.
    Encoder,
    /// Decode only.
    Decoder,
    /// Both directions.
    EncoderDecoder,
    /// Unknown/unset.
    Undefined,
}

/// An immutable catalog entry describing one codec the media backend
/// supports. Created once at daemon start and never mutated afterwards —
/// per-account customization (activation, priority, payload type,
/// bitrate override) lives in [`crate::AccountCodec`], which refers back
/// to a `SystemCodec` by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemCodec {
    /// Stable numeric identifier, unique within the registry.
    pub id: u32,
    /// Human-readable name, e.g. `"opus"`, `"PCMU"`, `"H264"`.
    pub name: String,
    /// Audio or video.
    pub media_type: MediaType,
    /// Encode/decode capability.
    pub codec_kind: CodecKind,
    /// Default sample rate in Hz, for audio codecs.
    pub default_sample_rate: Option<u32>,
    /// Default bitrate in bits/second.
    pub default_bitrate: Option<u32>,
}

/// Process-wide, lazily initialised catalog of codecs.
///
/// The backend's own codec order is preserved and treated as stable for
/// the lifetime of the process: two calls to [`CodecRegistry::all`]
/// within the same process return entries in the same order.
pub struct CodecRegistry {
    codecs: Vec<SystemCodec>,
}

static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();

impl CodecRegistry {
    /// Build a registry from an explicit codec list — used by tests and
    /// by any embedder that wants a non-default catalog instead of the
    /// process-wide global.
    pub fn from_codecs(codecs: Vec<SystemCodec>) -> Self {
        Self { codecs }
    }

    /// The process-wide singleton, built on first access from the
    /// built-in default catalog (see [`CodecRegistry::default_catalog`]).
    /// Matches the teacher's pattern of a single genuinely process-unique
    /// resource (the codec catalog) alongside otherwise-explicit services.
    pub fn global() -> &'static CodecRegistry {
        GLOBAL.get_or_init(|| CodecRegistry::from_codecs(CodecRegistry::default_catalog()))
    }

    /// The built-in catalog used to seed [`CodecRegistry::global`]. A real
    /// media backend would enumerate its actual encoder/decoder set
    /// instead; this default gives every test and example a believable,
    /// stable set of audio and video codecs without depending on one.
    pub fn default_catalog() -> Vec<SystemCodec> {
        vec![
            SystemCodec {
                id: 0,
                name: "opus".to_string(),
                media_type: MediaType::Audio,
                codec_kind: CodecKind::EncoderDecoder,
                default_sample_rate: Some(48_000),
                default_bitrate: Some(64_000),
            },
            SystemCodec {
                id: 1,
                name: "PCMU".to_string(),
                media_type: MediaType::Audio,
                codec_kind: CodecKind::EncoderDecoder,
                default_sample_rate: Some(8_000),
                default_bitrate: Some(64_000),
            },
            SystemCodec {
                id: 2,
                name: "PCMA".to_string(),
                media_type: MediaType::Audio,
                codec_kind: CodecKind::EncoderDecoder,
                default_sample_rate: Some(8_000),
                default_bitrate: Some(64_000),
            },
            SystemCodec {
                id: 3,
                name: "G722".to_string(),
                media_type: MediaType::Audio,
                codec_kind: CodecKind::EncoderDecoder,
                default_sample_rate: Some(16_000),
                default_bitrate: Some(64_000),
            },
            SystemCodec {
                id: 4,
                name: "G729".to_string(),
                media_type: MediaType::Audio,
                codec_kind: CodecKind::EncoderDecoder,
                default_sample_rate: Some(8_000),
                default_bitrate: Some(8_000),
            },
            SystemCodec {
                id: 5,
                name: "H264".to_string(),
                media_type: MediaType::Video,
                codec_kind: CodecKind::EncoderDecoder,
                default_sample_rate: None,
                default_bitrate: Some(1_000_000),
            },
            SystemCodec {
                id: 6,
                name: "VP8".to_string(),
                media_type: MediaType::Video,
                codec_kind: CodecKind::EncoderDecoder,
                default_sample_rate: None,
                default_bitrate: Some(1_000_000),
            },
        ]
    }

    /// All catalog entries, in backend enumeration order.
    pub fn all(&self) -> &[SystemCodec] {
        &self.codecs
    }

    /// Ids of catalog entries matching `media_mask`, preserving catalog
    /// order.
    pub fn ids_for(&self, media_mask: MediaMask) -> Vec<u32> {
        self.codecs
            .iter()
            .filter(|c| media_mask.admits(c.media_type))
            .map(|c| c.id)
            .collect()
    }

    /// Look up a single catalog entry by id.
    pub fn by_id(&self, id: u32) -> Option<&SystemCodec> {
        self.codecs.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_for_respects_mask_and_order() {
        let reg = CodecRegistry::from_codecs(CodecRegistry::default_catalog());
        let audio_ids = reg.ids_for(MediaMask::AUDIO);
        assert_eq!(audio_ids, vec![0, 1, 2, 3, 4]);
        let video_ids = reg.ids_for(MediaMask::VIDEO);
        assert_eq!(video_ids, vec![5, 6]);
        let both = reg.ids_for(MediaMask::BOTH);
        assert_eq!(both.len(), 7);
    }

    #[test]
    fn global_registry_is_stable_across_calls() {
        let first = CodecRegistry::global().ids_for(MediaMask::BOTH);
        let second = CodecRegistry::global().ids_for(MediaMask::BOTH);
        assert_eq!(first, second);
    }
}
