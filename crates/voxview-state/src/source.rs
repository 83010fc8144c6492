//! Identity handles for image sources and source groups.
//!
//! Both handles are cheap to clone and compare by identity: two handles are
//! equal only if they were cloned from the same original. Nothing about the
//! pixel data lives here; the viewer state only ever asks a source whether it
//! has data at a timepoint.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// The image-loading side of a source, owned by whoever renders it.
pub trait ImageSource: Send + Sync + fmt::Debug {
    /// Display name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether the source has data for the given timepoint.
    fn is_present(&self, timepoint: usize) -> bool;
}

/// A renderable image stream tracked by a viewer state.
#[derive(Clone)]
pub struct Source {
    image: Arc<dyn ImageSource>,
}

impl Source {
    /// Wrap an image source in a new handle.
    pub fn new(image: impl ImageSource + 'static) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Wrap an already shared image source.
    ///
    /// Handles built from clones of the same `Arc` compare equal.
    pub fn from_shared(image: Arc<dyn ImageSource>) -> Self {
        Self { image }
    }

    /// A source that is present at every timepoint.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(StaticSource::new(name))
    }

    /// Display name of the underlying image source.
    pub fn name(&self) -> &str {
        self.image.name()
    }

    /// Whether the underlying image source has data at `timepoint`.
    pub fn is_present(&self, timepoint: usize) -> bool {
        self.image.is_present(timepoint)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.image) as *const ()
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }
}

impl Eq for Source {}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({:?} @ {:p})", self.name(), self.addr())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Minimal [`ImageSource`] with a name and an optional presence window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSource {
    name: String,
    present: Option<RangeInclusive<usize>>,
}

impl StaticSource {
    /// Present at every timepoint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            present: None,
        }
    }

    /// Restrict presence to the given (inclusive) range of timepoints.
    pub fn present_during(mut self, timepoints: RangeInclusive<usize>) -> Self {
        self.present = Some(timepoints);
        self
    }
}

impl ImageSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_present(&self, timepoint: usize) -> bool {
        self.present
            .as_ref()
            .map_or(true, |range| range.contains(&timepoint))
    }
}

#[derive(Debug)]
struct GroupToken {
    label: String,
}

/// A named set of sources that is shown or hidden as a unit.
///
/// The handle only carries identity and the name the group starts with.
/// Its current name and members are owned by the viewer state it is added
/// to, and are discarded when it is removed.
#[derive(Clone)]
pub struct SourceGroup {
    token: Arc<GroupToken>,
}

impl SourceGroup {
    /// Create a new group handle.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            token: Arc::new(GroupToken {
                label: label.into(),
            }),
        }
    }

    /// The name this group is given when added to a viewer state.
    pub fn label(&self) -> &str {
        &self.token.label
    }

    fn addr(&self) -> *const GroupToken {
        Arc::as_ptr(&self.token)
    }
}

impl PartialEq for SourceGroup {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.token, &other.token)
    }
}

impl Eq for SourceGroup {}

impl Hash for SourceGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for SourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceGroup({:?} @ {:p})", self.label(), self.addr())
    }
}

impl fmt::Display for SourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sources_compare_by_identity() {
        let a = Source::named("dapi");
        let b = Source::named("dapi");

        assert_eq!(a, a.clone());
        assert_ne!(a, b, "same name must not make two sources equal");

        let set: HashSet<_> = [a.clone(), a.clone(), b.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn shared_image_gives_equal_handles() {
        let image: Arc<dyn ImageSource> = Arc::new(StaticSource::new("gfp"));
        let a = Source::from_shared(image.clone());
        let b = Source::from_shared(image);
        assert_eq!(a, b);
    }

    #[test]
    fn presence_window() {
        let always = Source::named("always");
        assert!(always.is_present(0));
        assert!(always.is_present(10_000));

        let windowed = Source::new(StaticSource::new("late").present_during(3..=5));
        assert!(!windowed.is_present(2));
        assert!(windowed.is_present(3));
        assert!(windowed.is_present(5));
        assert!(!windowed.is_present(6));
    }

    #[test]
    fn groups_compare_by_identity() {
        let g1 = SourceGroup::new("group 1");
        let g2 = SourceGroup::new("group 1");

        assert_eq!(g1, g1.clone());
        assert_ne!(g1, g2);
        assert_eq!(g1.label(), "group 1");
        assert_eq!(g1.to_string(), "group 1");
    }
}
