use crate::{ENCODED_SLASH, ENCODED_TILDE, PATH_SEPARATOR, TILDE};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// An accumulated property/index path into a document or value.
///
/// Used both as the pointer path carried by build-time errors and as the
/// value path carried by validation failures. Segments containing `~` or `/`
/// are encoded JSON-pointer style (`~0`, `~1`) so the formatted path stays
/// unambiguous.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ValuePath(pub Vec<String>);

impl ValuePath {
    pub fn new() -> Self {
        ValuePath(Vec::new())
    }

    pub fn add(&mut self, segment: impl AsRef<str>) -> &mut Self {
        let segment = segment.as_ref();
        if segment.contains(TILDE) || segment.contains(PATH_SEPARATOR) {
            let segment = segment
                .replace(TILDE, ENCODED_TILDE)
                .replace(PATH_SEPARATOR, ENCODED_SLASH);
            self.0.push(segment);
        } else {
            self.0.push(segment.to_owned());
        }

        self
    }

    /// Returns a new path extended by one property-name segment.
    pub fn child(&self, segment: impl AsRef<str>) -> Self {
        let mut next = self.clone();
        next.add(segment);
        next
    }

    /// Returns a new path extended by one array-index segment.
    pub fn index(&self, idx: usize) -> Self {
        let mut next = self.clone();
        next.add(idx.to_string());
        next
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn format_path(&self) -> String {
        self.0.join(PATH_SEPARATOR)
    }
}

impl Display for ValuePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_path())
    }
}
