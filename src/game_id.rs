//! Content identity of a disc set.
//!
//! The content hash is an MD5 of, for each disc in order: the first and last track numbers,
//! the disc type, the `(adr, control, lba, valid)` quadruple of every one of the 101 ToC slots
//! (populated or not) and finally the user data of the first 512 sectors. Every integer is fed
//! as a little-endian 32bit value. Sectors which can't be read are skipped.
//!
//! The first disc hash is the same hash finalized right after the first disc, and the short
//! game id is the product number found in the boot sector of the first disc.

use log::{debug, info};
use md5::{Digest, Md5};

use crate::disc_set::DiscSet;
use crate::layout::{update_u32, DiscHash};
use crate::toc::Toc;
use crate::{CdResult, DiscReader, SECTOR_SIZE};

/// Number of sectors hashed at the start of each disc
pub const GAME_ID_SECTORS: u32 = 512;

/// Identity of a disc set computed from its contents
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentIdentity {
    /// Hash of every disc
    pub content_hash: DiscHash,
    /// Hash of the first disc only
    pub first_disc_hash: DiscHash,
    /// Product number from the boot sector of the first disc, empty if it couldn't be read
    pub short_game_id: String,
}

/// Hash the complete ToC of a single disc into `md5`
pub fn hash_toc_content(md5: &mut Md5, toc: &Toc) {
    update_u32(md5, toc.first_track as u32);
    update_u32(md5, toc.last_track as u32);
    update_u32(md5, toc.disc_type.code() as u32);

    for track in &toc.tracks[1..] {
        update_u32(md5, track.adr as u32);
        update_u32(md5, track.control as u32);
        update_u32(md5, track.lba);
        update_u32(md5, track.valid as u32);
    }
}

/// Extract the short game id from the 16 bytes at offset 0x20 of the boot sector.
///
/// The field holds the product number followed by the version (`"MK-81022  V1.000"`): the
/// string is cut at its last `V` and any trailing space or control character is dropped.
pub fn short_game_id(boot_sector: &[u8; SECTOR_SIZE]) -> String {
    let raw = array_ref![boot_sector, 0x20, 16];

    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let mut id = &raw[..len];

    if let Some(v) = id.iter().rposition(|&b| b == b'V') {
        let mut end = v;

        // Bytes over 0x7f are dropped as well
        while end > 0 && (id[end - 1] as i8) <= 0x20 {
            end -= 1;
        }

        id = &id[..end];
    }

    String::from_utf8_lossy(id).into_owned()
}

/// Hash the ToC and the first `GAME_ID_SECTORS` sectors of `disc`. If `boot_sector` is
/// provided it receives a copy of sector 0, if it could be read.
fn hash_disc(
    md5: &mut Md5,
    disc: &mut dyn DiscReader,
    mut boot_sector: Option<&mut Option<[u8; SECTOR_SIZE]>>,
) {
    hash_toc_content(md5, disc.toc());

    let mut buf = [0u8; SECTOR_SIZE];
    let mut skipped = 0;

    for lba in 0..GAME_ID_SECTORS {
        match disc.read_sectors(&mut buf, lba, 1) {
            Ok(n) if n >= 1 => (),
            _ => {
                skipped += 1;
                continue;
            }
        }

        if lba == 0 {
            if let Some(boot) = boot_sector.as_mut() {
                **boot = Some(buf);
            }
        }

        md5.update(buf);
    }

    if skipped > 0 {
        debug!("{} unreadable sectors skipped", skipped);
    }
}

/// Compute the content identity of `set`. Fails if one of the discs couldn't be opened.
pub fn compute_content_id(set: &mut DiscSet) -> CdResult<ContentIdentity> {
    info!("Calculating game ID ({} discs)", set.len());

    let mut md5 = Md5::new();
    let mut first_disc_hash = None;
    let mut boot_sector = None;

    for i in 0..set.len() {
        let disc = set.disc_mut(i)?;

        if i == 0 {
            hash_disc(&mut md5, disc, Some(&mut boot_sector));
            first_disc_hash = Some(DiscHash::from_md5(md5.clone()));
        } else {
            hash_disc(&mut md5, disc, None);
        }
    }

    let content_hash = DiscHash::from_md5(md5);

    let short_game_id = boot_sector
        .as_ref()
        .map(short_game_id)
        .unwrap_or_default();

    Ok(ContentIdentity {
        content_hash,
        first_disc_hash: first_disc_hash.unwrap_or(content_hash),
        short_game_id,
    })
}
