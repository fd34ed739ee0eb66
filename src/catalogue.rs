use std::collections::{BTreeSet, HashSet};

use anyhow::Context as _;

use crate::formats::{CatalogueRow, SheetRecord as _};
use crate::table::Table;

/// Place of books that already left; hidden by the default filter.
pub const SENT_AWAY_PLACE: &str = "Enviado a Remate";

/// Column order used when showing catalogue rows: the shelf location first,
/// then identity, then everything else.
pub const DISPLAY_HEADERS: [&str; 12] = [
    "Lugar",
    "Titulo",
    "Autor",
    "Año",
    "Row",
    "Column",
    "Subrow",
    "Editorial",
    "Idioma",
    "Tema",
    "Guardado",
    "Notas",
];

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

pub fn display_cells(row: &CatalogueRow) -> [&str; 12] {
    [
        row.place.as_str(),
        row.title.as_str(),
        opt(&row.author),
        opt(&row.year),
        opt(&row.row),
        opt(&row.column),
        opt(&row.subrow),
        opt(&row.editorial),
        opt(&row.language),
        opt(&row.topic),
        opt(&row.storage_code),
        opt(&row.notes),
    ]
}

/// The full shared catalogue. A row's position is its Origin Index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    rows: Vec<CatalogueRow>,
}

/// A catalogue row as it appears in a filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRow<'a> {
    pub origin_index: usize,
    pub row: &'a CatalogueRow,
}

impl Catalogue {
    pub fn new(rows: Vec<CatalogueRow>) -> Self {
        Self { rows }
    }

    /// Selects the catalogue columns by name, failing fast when the sheet's
    /// schema has drifted from the expected column set.
    pub fn from_table(table: &Table) -> anyhow::Result<Self> {
        table
            .require_headers(CatalogueRow::HEADERS)
            .context("validate catalogue columns")?;
        let rows = table.to_records().context("decode catalogue rows")?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[CatalogueRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct places in first-seen order.
    pub fn places(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| seen.insert(row.place.as_str()))
            .map(|row| row.place.clone())
            .collect()
    }

    /// Rows not in `excluded` that pass `filter`, in catalogue order.
    pub fn view<'a>(&'a self, excluded: &HashSet<usize>, filter: &Filter) -> Vec<ViewRow<'a>> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(origin_index, _)| !excluded.contains(origin_index))
            .filter(|(_, row)| filter.matches(row))
            .map(|(origin_index, row)| ViewRow { origin_index, row })
            .collect()
    }

    /// Selector options: every place, plus the rows, columns and subrows
    /// present among the not-excluded rows of the filter's places.
    pub fn facets(&self, excluded: &HashSet<usize>, filter: &Filter) -> Facets {
        let place_only = Filter {
            places: filter.places.clone(),
            ..Filter::default()
        };
        let view = self.view(excluded, &place_only);

        let numbers = |field: fn(&CatalogueRow) -> &Option<String>| -> Vec<u32> {
            let set: BTreeSet<u32> = view
                .iter()
                .filter_map(|v| field(v.row).as_deref())
                .filter_map(|value| value.parse().ok())
                .collect();
            set.into_iter().collect()
        };

        let mut subrows = Vec::new();
        for v in &view {
            if let Some(subrow) = v.row.subrow.as_deref()
                && !subrows.iter().any(|s: &String| s == subrow)
            {
                subrows.push(subrow.to_owned());
            }
        }

        Facets {
            places: self.places(),
            rows: numbers(|row| &row.row),
            columns: numbers(|row| &row.column),
            subrows,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub places: Vec<String>,
    pub rows: Vec<u32>,
    pub columns: Vec<u32>,
    pub subrows: Vec<String>,
}

/// Predicates narrowing the catalogue view.
///
/// A non-empty `search` replaces the place, row, column and subrow
/// predicates rather than composing with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// `None` admits every place.
    pub places: Option<BTreeSet<String>>,
    pub row: Option<u32>,
    pub column: Option<u32>,
    pub subrow: Option<String>,
    pub search: Option<String>,
}

impl Filter {
    /// Every place of the catalogue except `sent_away_place`.
    pub fn default_for(catalogue: &Catalogue, sent_away_place: &str) -> Self {
        let places = catalogue
            .places()
            .into_iter()
            .filter(|place| place != sent_away_place)
            .collect();
        Self {
            places: Some(places),
            ..Self::default()
        }
    }

    pub fn active_search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    pub fn matches(&self, row: &CatalogueRow) -> bool {
        if let Some(search) = self.active_search() {
            return matches_search(row, search);
        }

        if let Some(places) = &self.places
            && !places.contains(&row.place)
        {
            return false;
        }
        matches_number(self.row, row.row.as_deref())
            && matches_number(self.column, row.column.as_deref())
            && match &self.subrow {
                Some(wanted) => row.subrow.as_deref() == Some(wanted.as_str()),
                None => true,
            }
    }
}

fn matches_number(wanted: Option<u32>, value: Option<&str>) -> bool {
    match wanted {
        Some(wanted) => value.and_then(|v| v.parse::<u32>().ok()) == Some(wanted),
        None => true,
    }
}

fn matches_search(row: &CatalogueRow, search: &str) -> bool {
    let needle = search.to_lowercase();
    let contains = |value: &str| value.to_lowercase().contains(&needle);

    contains(&row.title)
        || row.author.as_deref().is_some_and(contains)
        || row.year.as_deref().is_some_and(contains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(place: &str, title: &str, author: &str, location: (&str, &str, &str)) -> CatalogueRow {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_owned());
        CatalogueRow {
            place: place.to_owned(),
            title: title.to_owned(),
            author: opt(author),
            year: Some("1965".to_owned()),
            editorial: None,
            language: None,
            topic: None,
            storage_code: None,
            notes: None,
            row: opt(location.0),
            column: opt(location.1),
            subrow: opt(location.2),
        }
    }

    fn catalogue() -> Catalogue {
        Catalogue::new(vec![
            book("Salón", "Dune", "Herbert", ("1", "2", "F")),
            book("Salón", "Rayuela", "Cortázar", ("1", "3", "")),
            book("Garaje", "Ficciones", "Borges", ("2", "", "B")),
            book(SENT_AWAY_PLACE, "Dune Messiah", "Herbert", ("10", "1", "")),
        ])
    }

    fn origins(view: &[ViewRow<'_>]) -> Vec<usize> {
        view.iter().map(|v| v.origin_index).collect()
    }

    #[test]
    fn default_filter_hides_sent_away_place() {
        let catalogue = catalogue();
        let filter = Filter::default_for(&catalogue, SENT_AWAY_PLACE);
        let view = catalogue.view(&HashSet::new(), &filter);
        assert_eq!(origins(&view), [0, 1, 2]);
    }

    #[test]
    fn numeric_filters_compose_with_places() {
        let catalogue = catalogue();
        let mut filter = Filter::default_for(&catalogue, SENT_AWAY_PLACE);
        filter.row = Some(1);
        assert_eq!(origins(&catalogue.view(&HashSet::new(), &filter)), [0, 1]);

        filter.column = Some(3);
        assert_eq!(origins(&catalogue.view(&HashSet::new(), &filter)), [1]);

        filter.column = None;
        filter.subrow = Some("F".to_owned());
        assert_eq!(origins(&catalogue.view(&HashSet::new(), &filter)), [0]);
    }

    #[test]
    fn search_replaces_place_and_location_filters() {
        let catalogue = catalogue();
        let mut filter = Filter::default_for(&catalogue, SENT_AWAY_PLACE);
        filter.row = Some(2);
        filter.search = Some("HERBERT".to_owned());

        let view = catalogue.view(&HashSet::new(), &filter);
        assert_eq!(origins(&view), [0, 3]);
    }

    #[test]
    fn search_covers_title_author_and_year() {
        let catalogue = catalogue();
        let search = |needle: &str| Filter {
            search: Some(needle.to_owned()),
            ..Filter::default()
        };
        assert_eq!(origins(&catalogue.view(&HashSet::new(), &search("rayu"))), [1]);
        assert_eq!(origins(&catalogue.view(&HashSet::new(), &search("borg"))), [2]);
        assert_eq!(catalogue.view(&HashSet::new(), &search("196")).len(), 4);
        assert!(catalogue.view(&HashSet::new(), &search("tolkien")).is_empty());
    }

    #[test]
    fn empty_search_falls_back_to_other_filters() {
        let catalogue = catalogue();
        let mut filter = Filter::default_for(&catalogue, SENT_AWAY_PLACE);
        filter.search = Some(String::new());
        assert_eq!(origins(&catalogue.view(&HashSet::new(), &filter)), [0, 1, 2]);
    }

    #[test]
    fn excluded_rows_never_appear() {
        let catalogue = catalogue();
        let excluded: HashSet<usize> = [0, 2].into_iter().collect();
        let view = catalogue.view(&excluded, &Filter::default());
        assert_eq!(origins(&view), [1, 3]);
    }

    #[test]
    fn facets_follow_place_selection() {
        let catalogue = catalogue();
        let filter = Filter::default_for(&catalogue, SENT_AWAY_PLACE);
        let facets = catalogue.facets(&HashSet::new(), &filter);

        assert_eq!(
            facets.places,
            ["Salón", "Garaje", SENT_AWAY_PLACE].map(str::to_owned)
        );
        assert_eq!(facets.rows, [1, 2]);
        assert_eq!(facets.columns, [2, 3]);
        assert_eq!(facets.subrows, ["F", "B"].map(str::to_owned));
    }

    #[test]
    fn display_puts_location_after_identity() {
        let row = book("Salón", "Dune", "Herbert", ("1", "2", "F"));
        let cells = display_cells(&row);
        assert_eq!(&cells[..7], ["Salón", "Dune", "Herbert", "1965", "1", "2", "F"]);
    }

    #[test]
    fn from_table_rejects_drifted_schema() {
        let mut table = Table::from_records(catalogue().rows()).unwrap();
        assert_eq!(Catalogue::from_table(&table).unwrap(), catalogue());

        table.headers.retain(|h| h != "Guardado");
        for row in &mut table.rows {
            row.remove(7);
        }
        let err = format!("{:#}", Catalogue::from_table(&table).unwrap_err());
        assert!(err.contains("validate catalogue columns"), "{err}");
        assert!(err.contains("Guardado"), "{err}");
    }
}
