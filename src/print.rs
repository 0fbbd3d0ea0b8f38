//! Page Layout
//!
//! Decides where page breaks fall so that double-page runs can be imposed
//! two A5 forms to an A4 side.

use serde::{Deserialize, Serialize};

/// How forms are laid out on the physical sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLayout {
    /// One form per page.
    #[default]
    Single,
    /// Two forms per page, paired in body order.
    DoublePage,
}

/// Position of a form within a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairPosition {
    First,
    Second,
}

impl PageLayout {
    pub fn from_flag(double_page: bool) -> Self {
        if double_page {
            Self::DoublePage
        } else {
            Self::Single
        }
    }

    /// Pair slot for the form at zero-based body `position`. Single layout
    /// has no pairs; every form closes its own page.
    pub fn pair_position(self, position: usize) -> Option<PairPosition> {
        match self {
            PageLayout::Single => None,
            PageLayout::DoublePage if position % 2 == 0 => Some(PairPosition::First),
            PageLayout::DoublePage => Some(PairPosition::Second),
        }
    }

    /// Whether a page break follows the form at `position`.
    pub fn page_after(self, position: usize) -> bool {
        !matches!(self.pair_position(position), Some(PairPosition::First))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_breaks_every_page() {
        let layout = PageLayout::from_flag(false);
        assert!((0..5).all(|n| layout.page_after(n)));
        assert_eq!(layout.pair_position(0), None);
    }

    #[test]
    fn test_double_page_alternates() {
        let layout = PageLayout::from_flag(true);
        assert_eq!(layout.pair_position(0), Some(PairPosition::First));
        assert_eq!(layout.pair_position(1), Some(PairPosition::Second));
        assert_eq!(layout.pair_position(4), Some(PairPosition::First));
        assert!(!layout.page_after(0));
        assert!(layout.page_after(1));
        assert!(!layout.page_after(2));
    }
}
