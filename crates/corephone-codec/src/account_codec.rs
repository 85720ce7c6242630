//! Per-account codec priority and activation list.

use crate::{CodecError, CodecRegistry, MediaMask, MediaType, Result};

/// One account's configuration of a single [`crate::SystemCodec`]: whether
/// it's offered at all, where it ranks, and the wire parameters
/// (`payload_type`, `bitrate`) to use for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCodec {
    /// Id of the [`crate::SystemCodec`] this entry configures.
    pub system_id: u32,
    /// Copied from the catalog entry at load time, for convenient display
    /// without a registry lookup.
    pub name: String,
    /// Copied from the catalog entry at load time.
    pub media_type: MediaType,
    /// Whether this codec is offered on the wire.
    pub is_active: bool,
    /// Priority, 1 = highest. A permutation of 1..N across the codecs
    /// that are "ordered" (in practice, all of them).
    pub order: u32,
    /// RTP payload type to advertise for this codec.
    pub payload_type: u8,
    /// Bitrate override (bits/second).
    pub bitrate: u32,
}

/// An account's full codec list: the priority-ordered, activation-aware
/// view over the [`CodecRegistry`] catalog that produces the session's
/// media offer.
#[derive(Debug, Clone, Default)]
pub struct AccountCodecList {
    codecs: Vec<AccountCodec>,
}

impl AccountCodecList {
    /// An empty list; call [`AccountCodecList::load_defaults_from`] before
    /// using it for anything real.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate with one [`AccountCodec`] per catalog entry (audio and
    /// video), in catalog order, all active, with a sequential dynamic
    /// payload type (starting at 96, the first dynamic RTP payload type)
    /// and the catalog's default bitrate.
    pub fn load_defaults_from(&mut self, registry: &CodecRegistry) {
        self.codecs = registry
            .all()
            .iter()
            .enumerate()
            .map(|(i, sc)| AccountCodec {
                system_id: sc.id,
                name: sc.name.clone(),
                media_type: sc.media_type,
                is_active: true,
                order: (i + 1) as u32,
                payload_type: 96 + (i as u8),
                bitrate: sc.default_bitrate.unwrap_or(0),
            })
            .collect();
    }

    /// All entries, in current priority order.
    pub fn entries(&self) -> &[AccountCodec] {
        &self.codecs
    }

    /// Ids of every entry matching `media_mask`, active or not, in
    /// current priority order.
    pub fn all_ids(&self, media_mask: MediaMask) -> Vec<u32> {
        self.codecs
            .iter()
            .filter(|c| media_mask.admits(c.media_type))
            .map(|c| c.system_id)
            .collect()
    }

    /// Ids of active entries matching `media_mask`, in ascending `order`.
    pub fn active_ids(&self, media_mask: MediaMask) -> Vec<u32> {
        self.codecs
            .iter()
            .filter(|c| c.is_active && media_mask.admits(c.media_type))
            .map(|c| c.system_id)
            .collect()
    }

    /// Re-rank and re-activate codecs matching `media_mask` according to
    /// `ordered_ids`: every matching entry is first deactivated, then
    /// entries named in `ordered_ids` are activated and assigned
    /// `order = 1, 2, …` in the order they appear. Ids absent from the
    /// catalog are silently ignored. Entries matching `media_mask` that
    /// were *not* named keep their previous `order` value and fall after
    /// the freshly ranked ones once the list is re-sorted (their relative
    /// order among themselves is preserved, since the sort is stable).
    pub fn set_active_codecs(&mut self, ordered_ids: &[u32], media_mask: MediaMask) {
        for codec in self.codecs.iter_mut() {
            if media_mask.admits(codec.media_type) {
                codec.is_active = false;
            }
        }

        for (i, id) in ordered_ids.iter().enumerate() {
            if let Some(codec) = self
                .codecs
                .iter_mut()
                .find(|c| c.system_id == *id && media_mask.admits(c.media_type))
            {
                codec.is_active = true;
                codec.order = (i + 1) as u32;
            }
        }

        self.codecs.sort_by(|a, b| a.order.cmp(&b.order));
    }

    /// First entry with this id, restricted to `media_mask`.
    pub fn find_by_id(&self, id: u32, media_mask: MediaMask) -> Option<&AccountCodec> {
        self.codecs
            .iter()
            .find(|c| c.system_id == id && media_mask.admits(c.media_type))
    }

    /// First entry with this name, restricted to `media_mask`.
    pub fn find_by_name(&self, name: &str, media_mask: MediaMask) -> Option<&AccountCodec> {
        self.codecs
            .iter()
            .find(|c| c.name == name && media_mask.admits(c.media_type))
    }

    /// First entry with this payload type, restricted to `media_mask`.
    pub fn find_by_payload_type(
        &self,
        payload_type: u8,
        media_mask: MediaMask,
    ) -> Option<&AccountCodec> {
        self.codecs
            .iter()
            .find(|c| c.payload_type == payload_type && media_mask.admits(c.media_type))
    }

    /// Swap entry `idx` with the one immediately before it and renumber
    /// every entry's `order` to match its new position.
    pub fn move_up(&mut self, idx: usize) -> Result<()> {
        if idx == 0 || idx >= self.codecs.len() {
            return Err(CodecError::IndexOutOfBounds(idx));
        }
        self.codecs.swap(idx - 1, idx);
        self.renumber();
        Ok(())
    }

    /// Swap entry `idx` with the one immediately after it and renumber
    /// every entry's `order` to match its new position.
    pub fn move_down(&mut self, idx: usize) -> Result<()> {
        if idx + 1 >= self.codecs.len() {
            return Err(CodecError::IndexOutOfBounds(idx));
        }
        self.codecs.swap(idx, idx + 1);
        self.renumber();
        Ok(())
    }

    fn renumber(&mut self) {
        for (i, codec) in self.codecs.iter_mut().enumerate() {
            codec.order = (i + 1) as u32;
        }
    }

    /// Serialise the active audio+video codec ids (in ascending `order`)
    /// as a slash-separated list, the form the daemon persists.
    pub fn serialize_active(&self, media_mask: MediaMask) -> String {
        self.active_ids(media_mask)
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Parse the slash-separated id list back into ids, skipping any
    /// field that doesn't parse as a `u32` (malformed persisted state
    /// should degrade, not crash startup).
    pub fn parse_serialized(serialized: &str) -> Vec<u32> {
        serialized
            .split('/')
            .filter_map(|field| field.parse::<u32>().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> AccountCodecList {
        let registry = CodecRegistry::from_codecs(CodecRegistry::default_catalog());
        let mut list = AccountCodecList::new();
        list.load_defaults_from(&registry);
        list
    }

    #[test]
    fn defaults_are_all_active_in_catalog_order() {
        let list = list();
        assert_eq!(list.active_ids(MediaMask::AUDIO), vec![0, 1, 2, 3, 4]);
        assert_eq!(list.active_ids(MediaMask::VIDEO), vec![5, 6]);
    }

    #[test]
    fn set_active_codecs_reorders_and_deactivates_others() {
        let mut list = list();
        list.set_active_codecs(&[3, 0], MediaMask::AUDIO);
        assert_eq!(list.active_ids(MediaMask::AUDIO), vec![3, 0]);
        // untouched audio codecs (1, 2, 4) are now inactive
        for id in [1u32, 2, 4] {
            let entry = list.find_by_id(id, MediaMask::AUDIO).unwrap();
            assert!(!entry.is_active);
        }
        // video codecs are untouched by an audio-scoped call
        assert_eq!(list.active_ids(MediaMask::VIDEO), vec![5, 6]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut list = list();
        list.set_active_codecs(&[999, 0], MediaMask::AUDIO);
        assert_eq!(list.active_ids(MediaMask::AUDIO), vec![0]);
    }

    #[test]
    fn round_trip_serialize_parse() {
        let mut list = list();
        list.set_active_codecs(&[4, 2, 0], MediaMask::AUDIO);
        let serialized = list.serialize_active(MediaMask::AUDIO);
        let parsed = AccountCodecList::parse_serialized(&serialized);
        assert_eq!(parsed, list.active_ids(MediaMask::AUDIO));
        assert_eq!(parsed, vec![4, 2, 0]);
    }

    #[test]
    fn move_up_and_down_renumber_order() {
        let mut list = list();
        list.move_down(0).unwrap();
        let entries = list.entries();
        assert_eq!(entries[0].system_id, 1);
        assert_eq!(entries[0].order, 1);
        assert_eq!(entries[1].system_id, 0);
        assert_eq!(entries[1].order, 2);

        list.move_up(1).unwrap();
        assert_eq!(list.entries()[0].system_id, 0);
    }

    #[test]
    fn move_out_of_bounds_is_rejected() {
        let mut list = list();
        assert!(list.move_up(0).is_err());
        let last = list.entries().len() - 1;
        assert!(list.move_down(last).is_err());
    }
}
