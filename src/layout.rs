//! Layout hash: MD5 of the table of contents of every disc in the set.
//!
//! This only depends on the track layout, never on the sector contents, and it's what game
//! databases use to recognize a disc set. For the hash to match values computed elsewhere the
//! fields are always fed in the same order, each one as a little-endian 32bit integer:
//!
//! for each disc: first track, last track, lead-out LBA, then for every track from first to
//! last: LBA and `control & CONTROL_DATA`.

use std::fmt;

use md5::{Digest, Md5};

use crate::disc_set::DiscSet;
use crate::toc::{Toc, CONTROL_DATA};
use crate::CdResult;

/// A 16 byte MD5 identifying a disc or a set of discs
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscHash(pub [u8; 16]);

impl DiscHash {
    /// Finalize `md5` into a `DiscHash`
    pub fn from_md5(md5: Md5) -> DiscHash {
        DiscHash(md5.finalize().into())
    }

    /// Raw digest
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for DiscHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }

        Ok(())
    }
}

impl fmt::Debug for DiscHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DiscHash({})", self)
    }
}

/// Feed `v` to `md5` as a little-endian 32bit integer
pub(crate) fn update_u32(md5: &mut Md5, v: u32) {
    md5.update(v.to_le_bytes());
}

/// Hash the layout of a single disc into `md5`
pub fn hash_toc_layout(md5: &mut Md5, toc: &Toc) {
    update_u32(md5, toc.first_track as u32);
    update_u32(md5, toc.last_track as u32);
    update_u32(md5, toc.lead_out_lba());

    for (_, track) in toc.track_range() {
        update_u32(md5, track.lba);
        update_u32(md5, (track.control & CONTROL_DATA) as u32);
    }
}

/// Compute the layout hash of every disc in `set`, in order. Fails if one of the discs
/// couldn't be opened.
pub fn compute_layout_hash(set: &DiscSet) -> CdResult<DiscHash> {
    let mut md5 = Md5::new();

    for i in 0..set.len() {
        hash_toc_layout(&mut md5, set.disc(i)?.toc());
    }

    Ok(DiscHash::from_md5(md5))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeDisc;
    use crate::toc::DiscType;

    fn set_with(tocs: &[Toc]) -> DiscSet {
        let mut set = DiscSet::new();

        for toc in tocs {
            set.push(Box::new(FakeDisc::new(toc.clone(), 16, 0)));
        }

        set
    }

    fn two_tracks(data_lba: u32, audio_lba: u32, lead_out: u32) -> Toc {
        Toc::from_tracks(
            DiscType::CdDaOrMode1,
            &[(CONTROL_DATA, data_lba), (0, audio_lba)],
            lead_out,
        )
        .unwrap()
    }

    #[test]
    fn known_byte_stream() {
        let toc = two_tracks(0, 1000, 2000);

        let mut expected = Md5::new();
        for v in [1u32, 2, 2000, 0, 4, 1000, 0] {
            expected.update(v.to_le_bytes());
        }

        let hash = compute_layout_hash(&set_with(&[toc])).unwrap();

        assert_eq!(hash, DiscHash::from_md5(expected));
    }

    #[test]
    fn empty_set() {
        let hash = compute_layout_hash(&DiscSet::new()).unwrap();

        assert_eq!(hash.to_string(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn sensitivity() {
        let base = compute_layout_hash(&set_with(&[two_tracks(0, 1000, 2000)])).unwrap();

        assert_eq!(
            base,
            compute_layout_hash(&set_with(&[two_tracks(0, 1000, 2000)])).unwrap()
        );

        let moved = compute_layout_hash(&set_with(&[two_tracks(0, 1001, 2000)])).unwrap();
        assert_ne!(base, moved);

        let mut audio = two_tracks(0, 1000, 2000);
        audio.tracks[1].control = 0;
        assert_ne!(base, compute_layout_hash(&set_with(&[audio])).unwrap());

        // Only the data bit of the control field is hashed
        let mut flags = two_tracks(0, 1000, 2000);
        flags.tracks[2].control |= 0x2;
        assert_eq!(base, compute_layout_hash(&set_with(&[flags])).unwrap());

        // Neither is anything outside of the track range
        let mut extra = two_tracks(0, 1000, 2000);
        extra.tracks[50].lba = 1234;
        assert_eq!(base, compute_layout_hash(&set_with(&[extra])).unwrap());

        let two_discs = set_with(&[two_tracks(0, 1000, 2000), two_tracks(0, 1000, 2000)]);
        assert_ne!(base, compute_layout_hash(&two_discs).unwrap());
    }

    #[test]
    fn missing_disc() {
        let mut set = set_with(&[two_tracks(0, 1000, 2000)]);
        set.add_placeholder();

        assert!(compute_layout_hash(&set).is_err());
    }
}
