use super::formats::TargetFormat;

pub const MIXED_LABEL: &str = "Mixed";

/// Ids between the anchor and the clicked row, inclusive, in list order.
///
/// Without an anchor only the clicked id is returned. A click past the end
/// of the list selects nothing.
pub fn range_select<T: Clone>(all_ids: &[T], last_index: Option<usize>, clicked_index: usize) -> Vec<T> {
    if clicked_index >= all_ids.len() {
        return Vec::new();
    }
    let anchor = last_index
        .filter(|&i| i < all_ids.len())
        .unwrap_or(clicked_index);
    let start = anchor.min(clicked_index);
    let end = anchor.max(clicked_index);
    all_ids[start..=end].to_vec()
}

/// Row selection for the file list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    selected: Vec<usize>,
    anchor: Option<usize>,
}

impl Selection {
    /// Plain click selects one row and moves the anchor there; shift-click
    /// selects the range from the anchor and leaves the anchor in place.
    pub fn click(&mut self, index: usize, shift: bool, len: usize) {
        let rows: Vec<usize> = (0..len).collect();
        if shift && self.anchor.is_some() {
            self.selected = range_select(&rows, self.anchor, index);
        } else {
            self.selected = range_select(&rows, None, index);
            if !self.selected.is_empty() {
                self.anchor = Some(index);
            }
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn indices(&self) -> &[usize] {
        &self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatDisplay {
    Nothing,
    Single(TargetFormat),
    Mixed,
}

impl FormatDisplay {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            FormatDisplay::Nothing => None,
            FormatDisplay::Single(format) => Some(format.label()),
            FormatDisplay::Mixed => Some(MIXED_LABEL),
        }
    }
}

/// What the format combo shows for the formats of the selected rows.
pub fn format_display<I>(formats: I) -> FormatDisplay
where
    I: IntoIterator<Item = TargetFormat>,
{
    let mut formats = formats.into_iter();
    let Some(first) = formats.next() else {
        return FormatDisplay::Nothing;
    };
    if formats.all(|f| f == first) {
        FormatDisplay::Single(first)
    } else {
        FormatDisplay::Mixed
    }
}
