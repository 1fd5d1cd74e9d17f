//! Playlist navigation with wraparound.
//!
//! Pure functions over a borrowed playlist. Identity is the track id, so a
//! playlist containing the same track twice resolves to the first occurrence.

use crate::model::{Playlist, Track};

/// Track after `current`, wrapping to the start.
///
/// Returns the first track when `current` is absent from the playlist, and
/// `None` when the playlist has fewer than two tracks.
pub fn next<'a>(current: Option<&Track>, playlist: &'a Playlist) -> Option<&'a Track> {
    step(current, playlist, |index, len| (index + 1) % len)
}

/// Track before `current`, wrapping to the end. Mirror of [`next`].
pub fn previous<'a>(current: Option<&Track>, playlist: &'a Playlist) -> Option<&'a Track> {
    step(current, playlist, |index, len| (index + len - 1) % len)
}

/// Zero-based index of `current` and the playlist length, for "n of m" labels.
pub fn position_of(current: &Track, playlist: &Playlist) -> Option<(usize, usize)> {
    playlist
        .index_of(current)
        .map(|index| (index, playlist.len()))
}

fn step<'a>(
    current: Option<&Track>,
    playlist: &'a Playlist,
    advance: impl Fn(usize, usize) -> usize,
) -> Option<&'a Track> {
    let len = playlist.len();
    if len <= 1 {
        return None;
    }

    match current.and_then(|track| playlist.index_of(track)) {
        Some(index) => playlist.get(advance(index, len)),
        None => playlist.first(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(id, id, "Artist", format!("file:///{id}.mp3"))
    }

    fn playlist(ids: &[&str]) -> Playlist {
        ids.iter().map(|id| track(id)).collect()
    }

    #[test]
    fn test_next_and_previous_wrap() {
        let list = playlist(&["a", "b", "c"]);

        assert_eq!(next(Some(&track("a")), &list).map(Track::id), Some("b"));
        assert_eq!(next(Some(&track("c")), &list).map(Track::id), Some("a"));
        assert_eq!(previous(Some(&track("a")), &list).map(Track::id), Some("c"));
        assert_eq!(previous(Some(&track("b")), &list).map(Track::id), Some("a"));
    }

    #[test]
    fn test_short_playlists_have_no_neighbours() {
        let single = playlist(&["a"]);
        assert!(next(Some(&track("a")), &single).is_none());
        assert!(previous(Some(&track("a")), &single).is_none());

        let empty = Playlist::empty();
        assert!(next(None, &empty).is_none());
        assert!(previous(None, &empty).is_none());
    }

    #[test]
    fn test_unknown_current_starts_from_first() {
        let list = playlist(&["a", "b"]);
        assert_eq!(next(Some(&track("zzz")), &list).map(Track::id), Some("a"));
        assert_eq!(previous(None, &list).map(Track::id), Some("a"));
    }

    #[test]
    fn test_n_steps_return_to_start() {
        for len in 2..=7 {
            let ids: Vec<String> = (0..len).map(|i| format!("t{i}")).collect();
            let list: Playlist = ids.iter().map(|id| track(id)).collect();

            for start in list.iter() {
                let mut forward = start.clone();
                let mut backward = start.clone();
                for _ in 0..len {
                    forward = next(Some(&forward), &list).unwrap().clone();
                    backward = previous(Some(&backward), &list).unwrap().clone();
                }
                assert_eq!(forward.id(), start.id());
                assert_eq!(backward.id(), start.id());
            }
        }
    }

    #[test]
    fn test_duplicates_resolve_to_first_occurrence() {
        let list = playlist(&["a", "b", "a", "c"]);
        assert_eq!(next(Some(&track("a")), &list).map(Track::id), Some("b"));
        assert_eq!(position_of(&track("a"), &list), Some((0, 4)));
        assert_eq!(position_of(&track("c"), &list), Some((3, 4)));
        assert_eq!(position_of(&track("x"), &list), None);
    }
}
