//! M3U playlists, used to group the discs of a multi-disc game.
//!
//! A playlist is a text file with one entry per line. Lines starting with `#` are comments and
//! blank lines are ignored. Every other line is a path, relative to the directory containing
//! the playlist unless it's absolute. An entry which is itself a playlist is expanded in place.

use std::fs;
use std::path::{Path, PathBuf};

use log::error;

use crate::formats::build_path;
use crate::{CdError, CdResult};

/// Deepest level of playlist nesting we accept.
///
/// The top-level playlist isn't counted as nested: it sits at depth 0 and a playlist it
/// references is at depth 1. A chain of `MAX_PLAYLIST_DEPTH + 1` files (the top-level one plus
/// 99 nested ones) is accepted, the next nested playlist aborts the resolution.
pub const MAX_PLAYLIST_DEPTH: u32 = 99;

/// Returns true if `path` has the `.m3u` extension (ignoring case)
pub fn is_playlist(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("m3u"))
        .unwrap_or(false)
}

/// Expand the playlist at `path` into the ordered list of disc image paths it references.
pub fn resolve(path: &Path) -> CdResult<Vec<PathBuf>> {
    let mut entries = Vec::new();

    resolve_into(path, &mut entries)?;

    Ok(entries)
}

/// Same as `resolve` but appends to `entries`. If an error occurs `entries` keeps whatever was
/// collected before the faulty line.
///
/// Failing to open the top-level playlist is an error, a nested playlist which can't be opened
/// is logged and skipped.
pub fn resolve_into(path: &Path, entries: &mut Vec<PathBuf>) -> CdResult<()> {
    read_playlist(path, 0, entries)
}

fn read_playlist(path: &Path, depth: u32, entries: &mut Vec<PathBuf>) -> CdResult<()> {
    let contents = fs::read(path)?;

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let this = absolute(path);

    for line in contents.split(|&b| b == b'\n') {
        if line.first() == Some(&b'#') {
            continue;
        }

        let line = trim_end(line);
        if line.is_empty() {
            continue;
        }

        let entry = match build_path(line) {
            // Absolute entries replace `dir` completely
            Some(p) => dir.join(p),
            None => {
                return Err(CdError::ParseError {
                    path: path.to_path_buf(),
                    line: 0,
                    desc: "Invalid path in playlist".to_string(),
                })
            }
        };

        if !is_playlist(&entry) {
            entries.push(entry);
            continue;
        }

        if absolute(&entry) == this {
            error!("M3U at \"{}\" references self", entry.display());
            return Err(CdError::PlaylistSelfReference(entry));
        }

        if depth >= MAX_PLAYLIST_DEPTH {
            error!("M3U load recursion too deep at \"{}\"", entry.display());
            return Err(CdError::PlaylistTooDeep(entry));
        }

        // The only I/O error `read_playlist` returns is from opening its own file, deeper
        // failures have already been skipped
        match read_playlist(&entry, depth + 1, entries) {
            Ok(()) => (),
            Err(CdError::IoError(e)) => {
                error!("Can't open M3U \"{}\": {}", entry.display(), e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn trim_end(line: &[u8]) -> &[u8] {
    let len = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|p| p + 1)
        .unwrap_or(0);

    &line[..len]
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
