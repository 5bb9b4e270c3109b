//! Content loading: turn a path into a populated `DiscSet` and identify it.

use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::disc_set::DiscSet;
use crate::game_id::{compute_content_id, ContentIdentity};
use crate::layout::{compute_layout_hash, DiscHash};
use crate::playlist;
use crate::{CdError, CdResult, DiscOpener};

/// Hashes computed while loading a disc set
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadedContent {
    /// MD5 of the track layout of every disc
    pub layout_hash: DiscHash,
    /// Hashes of the disc contents
    pub identity: ContentIdentity,
}

/// Load the disc image or `.m3u` playlist at `path` into `set`, replacing whatever it held,
/// and identify it. On error `set` is left empty.
pub fn load_content<O>(set: &mut DiscSet, path: &Path, opener: &mut O) -> CdResult<LoadedContent>
where
    O: DiscOpener + ?Sized,
{
    set.clear();

    info!("Loading \"{}\"", path.display());

    let res = load_and_hash(set, path, opener);

    if let Err(e) = &res {
        error!("Loading failed: {}", e);
        set.clear();
    }

    res
}

fn load_and_hash<O>(set: &mut DiscSet, path: &Path, opener: &mut O) -> CdResult<LoadedContent>
where
    O: DiscOpener + ?Sized,
{
    let paths = if playlist::is_playlist(path) {
        playlist::resolve(path)?
    } else {
        vec![PathBuf::from(path)]
    };

    if !set.load(&paths, opener) {
        return Err(CdError::NoDisc);
    }

    log_track_lists(set);

    debug!("Calculating layout MD5");
    let layout_hash = compute_layout_hash(set)?;
    debug!("Layout MD5: {}", layout_hash);

    let identity = compute_content_id(set)?;
    debug!(
        "Game ID: {}, first disc: {}, short ID: \"{}\"",
        identity.content_hash, identity.first_disc_hash, identity.short_game_id
    );

    Ok(LoadedContent {
        layout_hash,
        identity,
    })
}

fn log_track_lists(set: &DiscSet) {
    for i in 0..set.len() {
        let toc = match set.disc(i) {
            Ok(disc) => disc.toc(),
            Err(_) => {
                debug!("Disc {}: not loaded", i + 1);
                continue;
            }
        };

        debug!("Disc {}", i + 1);

        for (track_no, track) in toc.track_range() {
            debug!(
                "- Track {:2}, LBA: {:6}  {}",
                track_no,
                track.lba,
                if track.is_data() { "DATA" } else { "AUDIO" }
            );
        }

        debug!("Leadout: {:6}", toc.lead_out_lba());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeDisc;
    use crate::DiscReader;
    use std::fs;

    fn opener(path: &Path) -> CdResult<Box<dyn DiscReader>> {
        let name = path.file_name().unwrap().to_string_lossy();

        if name.starts_with("missing") {
            return Err(CdError::Unsupported);
        }

        let seed = name.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));

        Ok(Box::new(FakeDisc::mixed_disc(seed)))
    }

    #[test]
    fn reload_replaces_set() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("game.m3u");
        fs::write(&list, "a.cue\nb.cue\nc.cue\n").unwrap();

        let mut set = DiscSet::new();

        load_content(&mut set, &list, &mut opener).unwrap();
        assert_eq!(set.len(), 3);

        load_content(&mut set, &dir.path().join("a.cue"), &mut opener).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn failed_open_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("game.m3u");
        fs::write(&list, "a.cue\nmissing.cue\n").unwrap();

        let mut set = DiscSet::new();

        assert!(matches!(
            load_content(&mut set, &list, &mut opener),
            Err(CdError::MissingDisc(1))
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn empty_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("game.m3u");
        fs::write(&list, "# nothing in here\n\n").unwrap();

        let mut set = DiscSet::new();

        assert!(matches!(
            load_content(&mut set, &list, &mut opener),
            Err(CdError::NoDisc)
        ));
    }

    #[test]
    fn hashes_match_standalone_computation() {
        let mut set = DiscSet::new();
        let loaded = load_content(&mut set, Path::new("disc.iso"), &mut opener).unwrap();

        assert_eq!(loaded.layout_hash, compute_layout_hash(&set).unwrap());
        assert_eq!(loaded.identity, compute_content_id(&mut set).unwrap());
        assert_ne!(loaded.layout_hash, loaded.identity.content_hash);
    }
}
