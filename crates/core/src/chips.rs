use crate::models::{SearchParameters, SortOrder};
use crate::params::{FieldUpdate, ParamsUpdate};
use serde::{Deserialize, Serialize};

/// Page size the reset chip restores. The literal is independent of the
/// current page size on purpose.
pub const RESET_PER_PAGE: u32 = 5;

/// A removable filter descriptor derived from the canonical parameters.
/// Chips are pure projections: recomputed on every change, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Chip {
    Search { label: String },
    Sort { label: String },
    Page { label: String, per_page: u32 },
    Reset { label: String, per_page: u32 },
}

impl Chip {
    pub fn label(&self) -> &str {
        match self {
            Chip::Search { label }
            | Chip::Sort { label }
            | Chip::Page { label, .. }
            | Chip::Reset { label, .. } => label,
        }
    }
}

/// Maps the canonical parameters to the ordered chip row. A reset chip is
/// prepended iff at least one other chip exists.
pub fn derive_chips(params: &SearchParameters) -> Vec<Chip> {
    let mut chips = Vec::new();

    if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
        chips.push(Chip::Search {
            label: format!("Search: {q}"),
        });
    }

    if let (Some(sort), Some(order)) = (params.sort, params.order) {
        chips.push(Chip::Sort {
            label: format!("Sort: {} {}", sort, order.arrow()),
        });
    }

    if let (Some(page), Some(per_page)) = (params.page, params.per_page) {
        if page > 1 {
            let from = (u64::from(page) - 1) * u64::from(per_page) + 1;
            let to = u64::from(page) * u64::from(per_page);
            chips.push(Chip::Page {
                label: format!("Page: {from} - {to}"),
                per_page,
            });
        }
    }

    if !chips.is_empty() {
        chips.insert(
            0,
            Chip::Reset {
                label: "Reset".to_string(),
                per_page: RESET_PER_PAGE,
            },
        );
    }

    chips
}

/// Maps a removed chip to the targeted partial reset it stands for.
pub fn removal_update(chip: &Chip) -> ParamsUpdate {
    match chip {
        Chip::Search { .. } => ParamsUpdate {
            q: FieldUpdate::Clear,
            ..ParamsUpdate::default()
        },
        Chip::Sort { .. } => ParamsUpdate::sort_pair(None),
        Chip::Page { per_page, .. } => ParamsUpdate::page(1, *per_page),
        Chip::Reset { per_page, .. } => ParamsUpdate {
            q: FieldUpdate::Clear,
            sort: FieldUpdate::Clear,
            order: FieldUpdate::Clear,
            page: FieldUpdate::Set(1),
            per_page: FieldUpdate::Set(*per_page),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortField;

    fn params(
        q: Option<&str>,
        sort: Option<(SortField, SortOrder)>,
        page: Option<(u32, u32)>,
    ) -> SearchParameters {
        SearchParameters {
            q: q.map(str::to_string),
            sort: sort.map(|(field, _)| field),
            order: sort.map(|(_, order)| order),
            page: page.map(|(page, _)| page),
            per_page: page.map(|(_, per_page)| per_page),
        }
    }

    #[test]
    fn no_active_filters_means_no_chips() {
        assert!(derive_chips(&SearchParameters::default()).is_empty());
        // Page 1 is the default view, not a filter.
        assert!(derive_chips(&params(None, None, Some((1, 5)))).is_empty());
        // An empty query string is not a filter either.
        assert!(derive_chips(&params(Some(""), None, None)).is_empty());
    }

    #[test]
    fn search_and_page_chips_with_reset_first() {
        let chips = derive_chips(&params(Some("x"), None, Some((3, 5))));
        assert_eq!(
            chips,
            vec![
                Chip::Reset {
                    label: "Reset".to_string(),
                    per_page: RESET_PER_PAGE,
                },
                Chip::Search {
                    label: "Search: x".to_string(),
                },
                Chip::Page {
                    label: "Page: 11 - 15".to_string(),
                    per_page: 5,
                },
            ]
        );
    }

    #[test]
    fn sort_chip_requires_both_field_and_order() {
        let chips = derive_chips(&params(
            None,
            Some((SortField::Stars, SortOrder::Desc)),
            None,
        ));
        assert_eq!(
            chips,
            vec![
                Chip::Reset {
                    label: "Reset".to_string(),
                    per_page: RESET_PER_PAGE,
                },
                Chip::Sort {
                    label: "Sort: stars ↓".to_string(),
                },
            ]
        );

        let half_set = SearchParameters {
            sort: Some(SortField::Stars),
            ..SearchParameters::default()
        };
        assert!(derive_chips(&half_set).is_empty());
    }

    #[test]
    fn ascending_sort_uses_up_arrow() {
        let chips = derive_chips(&params(
            None,
            Some((SortField::Updated, SortOrder::Asc)),
            None,
        ));
        assert_eq!(chips[1].label(), "Sort: updated ↑");
    }

    #[test]
    fn removing_the_page_chip_returns_to_page_one() {
        let full = params(
            Some("x"),
            Some((SortField::Stars, SortOrder::Desc)),
            Some((3, 5)),
        );
        let chips = derive_chips(&full);
        let page_chip = chips
            .iter()
            .find(|chip| matches!(chip, Chip::Page { .. }))
            .expect("page chip present");

        let after = removal_update(page_chip).apply(&full);
        assert_eq!(
            after,
            params(
                Some("x"),
                Some((SortField::Stars, SortOrder::Desc)),
                Some((1, 5)),
            )
        );
    }

    #[test]
    fn removing_the_reset_chip_clears_everything_at_once() {
        let full = params(
            Some("x"),
            Some((SortField::Stars, SortOrder::Desc)),
            Some((3, 10)),
        );
        let chips = derive_chips(&full);
        let reset_chip = &chips[0];
        assert!(matches!(reset_chip, Chip::Reset { per_page: 5, .. }));

        let after = removal_update(reset_chip).apply(&full);
        assert_eq!(after, params(None, None, Some((1, 5))));
    }

    #[test]
    fn removing_the_search_chip_only_clears_the_query() {
        let full = params(Some("x"), Some((SortField::Forks, SortOrder::Asc)), None);
        let chips = derive_chips(&full);
        let search_chip = chips
            .iter()
            .find(|chip| matches!(chip, Chip::Search { .. }))
            .expect("search chip present");

        let after = removal_update(search_chip).apply(&full);
        assert_eq!(after.q, None);
        assert_eq!(after.sort, Some(SortField::Forks));
        assert_eq!(after.order, Some(SortOrder::Asc));
    }
}
