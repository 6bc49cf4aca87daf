//! Client-side view of a user's country rows, as a map front end keeps it.
//!
//! The server is the only source of truth: after every write the client
//! re-fetches the list and hands it to [`SyncState::replace_rows`]. Nothing
//! here is updated optimistically.

use crate::domain_model::*;
use std::collections::HashMap;

/// How a country is painted on the map.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MapFill {
    Visited,
    Planned,
    Selected,
    Default,
}

impl MapFill {
    pub fn hex(&self) -> &'static str {
        match self {
            MapFill::Visited => "#3498db",
            MapFill::Planned => "#2ecc71",
            MapFill::Selected => "#f39c12",
            MapFill::Default => "#bdc3c7",
        }
    }
}

impl From<VisitStatus> for MapFill {
    fn from(status: VisitStatus) -> Self {
        match status {
            VisitStatus::Visited => MapFill::Visited,
            VisitStatus::Planned => MapFill::Planned,
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncState {
    rows: HashMap<IsoCode, CountryStatusRecord>,
    selected: Option<IsoCode>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a freshly fetched list. The selection is UI-local and survives.
    pub fn replace_rows(&mut self, rows: Vec<CountryStatusRecord>) {
        self.rows = rows
            .into_iter()
            .map(|row| (row.iso_code.clone(), row))
            .collect();
    }

    /// Click handler: selects `iso_code`, or clears the selection when it was
    /// already selected. Returns the selection after the click.
    pub fn toggle_selection(&mut self, iso_code: IsoCode) -> Option<&IsoCode> {
        if self.selected.as_ref() == Some(&iso_code) {
            self.selected = None;
        } else {
            self.selected = Some(iso_code);
        }
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&IsoCode> {
        self.selected.as_ref()
    }

    /// The stored row for a country, if any. A delete is only issued when
    /// this returns a row, since the API deletes by row id.
    pub fn row_for(&self, iso_code: &IsoCode) -> Option<&CountryStatusRecord> {
        self.rows.get(iso_code)
    }

    /// A stored status wins over the selection highlight.
    pub fn fill_for(&self, iso_code: &IsoCode) -> MapFill {
        if let Some(row) = self.rows.get(iso_code) {
            return row.status.into();
        }
        if self.selected.as_ref() == Some(iso_code) {
            return MapFill::Selected;
        }
        MapFill::Default
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
