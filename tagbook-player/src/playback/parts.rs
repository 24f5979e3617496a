//! Book part selection and ordering
//!
//! A book's audio files are named `<book>[-<part>].ext`. Parts play in
//! ascending suffix order, a missing suffix counting as 0. Sorting is stable,
//! so files with equal or missing suffixes keep the order the daemon listed
//! them in.

use crate::daemon::AudioFile;
use crate::types::BookId;

/// File name without directories or extension
fn stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Split `<name>-<digits>` into the name and the numeric suffix
fn split_suffix(stem: &str) -> (&str, Option<u32>) {
    if let Some((name, suffix)) = stem.rsplit_once('-') {
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(part) = suffix.parse() {
                return (name, Some(part));
            }
        }
    }
    (stem, None)
}

/// Part number encoded in a file name; 0 when there is none
pub fn part_suffix(path: &str) -> u32 {
    split_suffix(stem(path)).1.unwrap_or(0)
}

/// Whether a file name follows the `<book>[-<part>]` convention for `book_id`
///
/// The book id has to end the name part and must not be glued to a longer
/// number, so book `12` does not claim `112.mp3` or `123-1.mp3`.
pub fn belongs_to_book(path: &str, book_id: &BookId) -> bool {
    let (name, _) = split_suffix(stem(path));
    let id = book_id.as_str();
    match name.strip_suffix(id) {
        Some(prefix) => !prefix.ends_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

/// Sort files into playing order
pub fn order_parts(files: &mut [AudioFile]) {
    // sort_by_key is stable: equal suffixes keep their listing order
    files.sort_by_key(|f| part_suffix(&f.path));
}

/// Ordered parts of the loaded book
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookParts {
    files: Vec<AudioFile>,
}

impl BookParts {
    /// Pick and order a book's files from a daemon search result
    ///
    /// Substring searches can return other books' files. Those are dropped
    /// when at least one file follows the naming convention; otherwise the
    /// search result is used as is.
    pub fn from_search(book_id: &BookId, found: Vec<AudioFile>) -> Self {
        let (mut files, others): (Vec<_>, Vec<_>) = found
            .into_iter()
            .partition(|f| belongs_to_book(&f.path, book_id));
        if files.is_empty() {
            files = others;
        }
        order_parts(&mut files);
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[AudioFile] {
        &self.files
    }

    /// Duration of a 1-based part, when known
    pub fn duration(&self, part: u32) -> Option<f64> {
        let index = usize::try_from(part).ok()?.checked_sub(1)?;
        self.files.get(index).and_then(|f| f.duration)
    }

    /// Fill in a duration learned later from the daemon
    pub fn set_duration(&mut self, part: u32, duration: f64) {
        let index = usize::try_from(part).ok().and_then(|p| p.checked_sub(1));
        if let Some(file) = index.and_then(|i| self.files.get_mut(i)) {
            file.duration = Some(duration);
        }
    }
}
