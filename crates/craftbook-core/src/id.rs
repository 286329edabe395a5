use serde::{Deserialize, Serialize};

/// A word offset into the arena naming the start of a record.
///
/// `Pointer::NULL` (`-1`) marks an absent reference. Pointers are only
/// meaningful inside the arena that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pointer(pub i32);

impl Pointer {
    pub const NULL: Pointer = Pointer(-1);

    pub fn is_null(self) -> bool {
        self.0 < 0
    }

    /// Word index of the record start. Only valid for non-null pointers.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Word index of `offset` words past the record start.
    pub fn word(self, offset: usize) -> usize {
        self.index() + offset
    }

    /// `None` for the null pointer.
    pub fn non_null(self) -> Option<Pointer> {
        if self.is_null() { None } else { Some(self) }
    }
}

impl From<Pointer> for i32 {
    fn from(p: Pointer) -> i32 {
        p.0
    }
}

/// The kind of a searchable record, carried by the first character of its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdKind {
    Item,
    Fluid,
    Group,
    Recipe,
}

impl IdKind {
    pub const ALL: [IdKind; 4] = [IdKind::Item, IdKind::Fluid, IdKind::Group, IdKind::Recipe];

    /// Leading character of every id of this kind.
    pub const fn tag(self) -> char {
        match self {
            IdKind::Item => 'i',
            IdKind::Fluid => 'f',
            IdKind::Group => 'g',
            IdKind::Recipe => 'r',
        }
    }

    /// Human-readable collection name used in errors and logs.
    pub const fn name(self) -> &'static str {
        match self {
            IdKind::Item => "item",
            IdKind::Fluid => "fluid",
            IdKind::Group => "group",
            IdKind::Recipe => "recipe",
        }
    }

    /// Classify an id by its tag. Returns `None` for empty or untagged ids.
    pub fn of(id: &str) -> Option<IdKind> {
        let first = id.chars().next()?;
        IdKind::ALL.into_iter().find(|kind| kind.tag() == first)
    }

    pub fn accepts(self, id: &str) -> bool {
        IdKind::of(id) == Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_pointer() {
        assert!(Pointer::NULL.is_null());
        assert!(!Pointer(0).is_null());
        assert_eq!(Pointer::NULL.non_null(), None);
        assert_eq!(Pointer(8).non_null(), Some(Pointer(8)));
    }

    #[test]
    fn pointer_word_offsets() {
        let p = Pointer(10);
        assert_eq!(p.index(), 10);
        assert_eq!(p.word(4), 14);
    }

    #[test]
    fn id_kind_from_tag() {
        assert_eq!(IdKind::of("i:mod:widget"), Some(IdKind::Item));
        assert_eq!(IdKind::of("f:water"), Some(IdKind::Fluid));
        assert_eq!(IdKind::of("g:ingotIron"), Some(IdKind::Group));
        assert_eq!(IdKind::of("r:abc"), Some(IdKind::Recipe));
        assert_eq!(IdKind::of("x:abc"), None);
        assert_eq!(IdKind::of(""), None);
    }

    #[test]
    fn accepts_checks_tag() {
        assert!(IdKind::Item.accepts("i:a"));
        assert!(!IdKind::Item.accepts("f:a"));
    }
}
