/// Value types shared by the session, tree and scoring modules.
///
/// Items are identified by their position in the caller's input list.
/// Identities are dense (`0..N`) and never renumbered.

/// Identity of an item: its index in the original input sequence.
pub type ItemId = usize;

/// An item to be ranked: an opaque payload (e.g. an image URL) plus its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub id: ItemId,
    pub payload: String,
}

/// One side of a comparison, tagged with identity and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparedItem {
    pub id: ItemId,
    pub payload: String,
}

impl From<&Item> for ComparedItem {
    fn from(item: &Item) -> Self {
        ComparedItem { id: item.id, payload: item.payload.clone() }
    }
}

/// A paired comparison shown to a judge.
///
/// `item_a` is the node under test, `item_b` is the pending item.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comparison {
    pub item_a: ComparedItem,
    pub item_b: ComparedItem,
    /// Identity of the preferred item. `None` until the judge answers.
    pub choice: Option<ItemId>,
    /// Reserved for reliability sampling. Never set by the core.
    pub is_repeat: bool,
}

impl Comparison {
    pub fn new(item_a: ComparedItem, item_b: ComparedItem) -> Self {
        Comparison { item_a, item_b, choice: None, is_repeat: false }
    }

    /// Returns a copy with the judge's answer filled in.
    pub fn with_choice(mut self, choice: ItemId) -> Self {
        self.choice = Some(choice);
        self
    }

    /// True if `id` is one of the two compared items.
    pub fn involves(&self, id: ItemId) -> bool {
        self.item_a.id == id || self.item_b.id == id
    }
}

/// Fraction of an item's comparisons in which it was preferred.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Agreement {
    Fraction(f64),
    /// The item never appeared in a comparison.
    Unranked,
}

impl Agreement {
    pub fn from_counts(chosen: usize, seen: usize) -> Self {
        if seen == 0 {
            Agreement::Unranked
        } else {
            Agreement::Fraction(chosen as f64 / seen as f64)
        }
    }

    pub fn fraction(&self) -> Option<f64> {
        match self {
            Agreement::Fraction(f) => Some(*f),
            Agreement::Unranked => None,
        }
    }
}

/// Per-item statistics derived from the comparison log.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemScore {
    pub item: ItemId,
    /// Log entries where this item was the choice.
    pub chosen: usize,
    /// Log entries where this item was either compared item.
    pub seen: usize,
    pub agreement: Agreement,
}

/// Cached result of a completed session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionOutcome {
    /// In-order traversal of the final tree, least preferred first.
    pub ranking: Vec<ItemId>,
    /// Scores indexed by item identity.
    pub scores: Vec<ItemScore>,
}
