//! A snapshot of the bucket listing and the lookups run against it.
//!
//! A collection is built once per request from whatever the store emitted and
//! is never mutated afterwards; filters return fresh collections.

use crate::models::object::StoredObject;
use std::collections::BTreeMap;

/// Group label used for objects that live at the bucket root.
pub const ROOT_DIRECTORY_LABEL: &str = "Root Directory";

/// Sort name of the root group among the other directory names.
const ROOT_SORT_NAME: &str = "Root";

/// Minimum fuzzy score the resolver accepts (exclusive).
pub const FUZZY_ACCEPT_THRESHOLD: u32 = 30;

const SCORE_SAME_DIRECTORY: u32 = 100;
const SCORE_NESTED_DIRECTORY: u32 = 50;
const SCORE_CHAR_WEIGHT: usize = 40;

/// Ordered, immutable list of objects in store emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectCollection {
    objects: Vec<StoredObject>,
}

/// Best filename-anchored candidate and its directory similarity score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuzzyMatch<'a> {
    pub candidate: Option<&'a StoredObject>,
    pub score: u32,
}

impl<'a> FuzzyMatch<'a> {
    const NONE: Self = Self {
        candidate: None,
        score: 0,
    };

    /// The candidate, if its score clears [`FUZZY_ACCEPT_THRESHOLD`].
    pub fn accepted(&self) -> Option<&'a StoredObject> {
        self.candidate.filter(|_| self.score > FUZZY_ACCEPT_THRESHOLD)
    }
}

/// Files sharing one directory prefix, ordered by lowercase key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryGroup {
    /// Directory prefix, or `None` for objects at the bucket root.
    pub directory: Option<String>,
    pub files: Vec<StoredObject>,
}

impl DirectoryGroup {
    /// The prefix itself, or [`ROOT_DIRECTORY_LABEL`] for the root group.
    /// Not escaped.
    pub fn display_name(&self) -> &str {
        self.directory.as_deref().unwrap_or(ROOT_DIRECTORY_LABEL)
    }

    pub fn count(&self) -> usize {
        self.files.len()
    }

    fn sort_name(&self) -> &str {
        self.directory.as_deref().unwrap_or(ROOT_SORT_NAME)
    }
}

impl FromIterator<StoredObject> for ObjectCollection {
    fn from_iter<I: IntoIterator<Item = StoredObject>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<StoredObject>> for ObjectCollection {
    fn from(objects: Vec<StoredObject>) -> Self {
        Self { objects }
    }
}

impl ObjectCollection {
    pub fn iter(&self) -> impl Iterator<Item = &StoredObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop folder markers, preserving order.
    pub fn filter_folders(&self) -> Self {
        self.retain(|obj| !obj.is_folder())
    }

    /// Drop keys containing `..` or `//`, preserving order.
    pub fn filter_suspicious(&self) -> Self {
        self.retain(|obj| !obj.is_suspicious())
    }

    fn retain(&self, keep: impl Fn(&StoredObject) -> bool) -> Self {
        self.objects.iter().filter(|obj| keep(obj)).cloned().collect()
    }

    /// First object whose key is byte-equal to `path`.
    pub fn find_exact(&self, path: &str) -> Option<&StoredObject> {
        self.objects.iter().find(|obj| obj.key == path)
    }

    /// First object whose key equals `path` under case folding.
    pub fn find_case_insensitive(&self, path: &str) -> Option<&StoredObject> {
        self.objects.iter().find(|obj| fold_eq(&obj.key, path))
    }

    /// Highest-scoring object whose filename matches the request's filename
    /// case-insensitively, scored by directory similarity.
    ///
    /// Requests and keys without a `/` never take part. Ties keep the first
    /// candidate in listing order.
    pub fn find_fuzzy(&self, path: &str) -> FuzzyMatch<'_> {
        let Some((req_dir, req_file)) = path.rsplit_once('/') else {
            return FuzzyMatch::NONE;
        };
        let req_dir = req_dir.to_lowercase();

        let mut best = FuzzyMatch::NONE;
        for obj in &self.objects {
            let Some((obj_dir, obj_file)) = obj.key.rsplit_once('/') else {
                continue;
            };
            if !fold_eq(obj_file, req_file) {
                continue;
            }
            let score = directory_similarity(&req_dir, &obj_dir.to_lowercase());
            if score > best.score {
                best = FuzzyMatch {
                    candidate: Some(obj),
                    score,
                };
            }
        }
        best
    }

    /// Group objects by directory prefix.
    ///
    /// Groups are ordered by directory name (the root group sorts as `Root`);
    /// files within a group by lowercase key.
    pub fn organize_by_directory(&self) -> Vec<DirectoryGroup> {
        let mut grouped: BTreeMap<Option<&str>, Vec<StoredObject>> = BTreeMap::new();
        for obj in &self.objects {
            grouped.entry(obj.directory()).or_default().push(obj.clone());
        }

        let mut groups: Vec<DirectoryGroup> = grouped
            .into_iter()
            .map(|(directory, mut files)| {
                files.sort_by_cached_key(|obj| obj.key.to_lowercase());
                DirectoryGroup {
                    directory: directory.map(str::to_string),
                    files,
                }
            })
            .collect();
        groups.sort_by(|a, b| a.sort_name().cmp(b.sort_name()));
        groups
    }
}

/// Score how close two lowercase directory prefixes are, in `0..=100`.
///
/// Equal prefixes score 100, containment either way scores 50, anything else
/// gets up to 40 by counting equal bytes at equal positions over the shorter
/// length.
pub fn directory_similarity(req_dir: &str, obj_dir: &str) -> u32 {
    if req_dir == obj_dir {
        return SCORE_SAME_DIRECTORY;
    }
    if obj_dir.contains(req_dir) || req_dir.contains(obj_dir) {
        return SCORE_NESTED_DIRECTORY;
    }

    let m = req_dir.len().min(obj_dir.len());
    if m == 0 {
        return 0;
    }
    let same = req_dir
        .bytes()
        .zip(obj_dir.bytes())
        .take(m)
        .filter(|(a, b)| a == b)
        .count();
    // same <= m, so the quotient is at most 40
    ((same * SCORE_CHAR_WEIGHT) / m) as u32
}

/// Case-insensitive string equality under simple (one char to one char)
/// case folding, so `ς`, `σ` and `Σ` compare equal but `ß` never matches `SS`.
pub fn fold_eq(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars().map(simple_fold).eq(b.chars().map(simple_fold))
}

/// Canonical member of `c`'s case orbit: lowercase of its uppercase, when
/// both mappings are single characters.
fn simple_fold(c: char) -> char {
    let upper = single(c.to_uppercase()).unwrap_or(c);
    single(upper.to_lowercase())
        .or_else(|| single(c.to_lowercase()))
        .unwrap_or(c)
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}
