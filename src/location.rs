use std::sync::LazyLock;

use regex::Regex;

use crate::formats::{CatalogueRow, Location};

/// `R<row>`, then optionally `C<column>`, then optionally a subrow letter,
/// each optionally separated by a comma and/or a space. Only the end of the
/// string is anchored.
static STORAGE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"R(\d+),? ?(?:C(\d+))?,? ?([FBMab])?$").expect("storage code pattern is valid")
});

/// A storage code that does not follow the `R<n>[, C<n>][, <subrow>]` grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad location string: {0:?}")]
pub struct BadStorageCode(pub String);

pub fn try_parse_storage_code(code: &str) -> Result<Location, BadStorageCode> {
    let Some(captures) = STORAGE_CODE.captures(code) else {
        return Err(BadStorageCode(code.to_owned()));
    };

    let group = |i: usize| captures.get(i).map(|m| m.as_str().to_owned());
    Ok(Location {
        row: group(1),
        column: group(2),
        subrow: group(3),
    })
}

/// Parses an optional storage code. Never fails: a malformed code is
/// reported on the diagnostic channel and yields an all-absent location.
pub fn parse_storage_code(code: Option<&str>) -> Location {
    let Some(code) = code else {
        return Location::absent();
    };

    match try_parse_storage_code(code) {
        Ok(location) => location,
        Err(err) => {
            tracing::warn!(storage_code = %code, "{err}");
            Location::absent()
        }
    }
}

/// Fills every absent place with the most recent place seen above it.
///
/// The raw export only writes a place on the first row of each merged block.
/// Rows before the first place stay absent.
pub fn forward_fill_places(places: &mut [Option<String>]) {
    let mut current: Option<String> = None;
    for place in places.iter_mut() {
        match place {
            Some(value) => current = Some(value.clone()),
            None => *place = current.clone(),
        }
    }
}

/// One row of the raw export before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub place: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<String>,
    pub editorial: Option<String>,
    pub language: Option<String>,
    pub topic: Option<String>,
    pub storage_code: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub rows: Vec<CatalogueRow>,
    pub bad_storage_codes: usize,
}

/// Forward-fills places, then splits every storage code into Row, Column and
/// Subrow. Row order is preserved; no row is ever rejected.
pub fn normalize(raw: Vec<RawRow>) -> Normalized {
    let mut places: Vec<Option<String>> = raw.iter().map(|row| row.place.clone()).collect();
    forward_fill_places(&mut places);

    let mut bad_storage_codes = 0;
    let rows = raw
        .into_iter()
        .zip(places)
        .map(|(row, place)| {
            let location = parse_storage_code(row.storage_code.as_deref());
            if location.is_absent() && row.storage_code.is_some() {
                bad_storage_codes += 1;
            }
            CatalogueRow {
                place: place.unwrap_or_default(),
                title: row.title,
                author: row.author,
                year: row.year,
                editorial: row.editorial,
                language: row.language,
                topic: row.topic,
                storage_code: row.storage_code,
                notes: row.notes,
                row: location.row,
                column: location.column,
                subrow: location.subrow,
            }
        })
        .collect();

    Normalized {
        rows,
        bad_storage_codes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(row: Option<&str>, column: Option<&str>, subrow: Option<&str>) -> Location {
        Location {
            row: row.map(str::to_owned),
            column: column.map(str::to_owned),
            subrow: subrow.map(str::to_owned),
        }
    }

    #[test]
    fn parses_row_only() {
        assert_eq!(parse_storage_code(Some("R3")), loc(Some("3"), None, None));
    }

    #[test]
    fn parses_row_column_and_subrow_with_separators() {
        assert_eq!(
            parse_storage_code(Some("R3, C2, F")),
            loc(Some("3"), Some("2"), Some("F"))
        );
    }

    #[test]
    fn parses_multi_digit_row_with_space_separator() {
        assert_eq!(
            parse_storage_code(Some("R10 C1")),
            loc(Some("10"), Some("1"), None)
        );
    }

    #[test]
    fn parses_subrow_directly_after_row() {
        assert_eq!(parse_storage_code(Some("R2B")), loc(Some("2"), None, Some("B")));
    }

    #[test]
    fn only_the_end_of_the_code_is_anchored() {
        assert_eq!(
            parse_storage_code(Some("estante R4,C1")),
            loc(Some("4"), Some("1"), None)
        );
        assert!(try_parse_storage_code("R4 C1 x").is_err());
    }

    #[test]
    fn subrow_letters_are_case_sensitive() {
        assert_eq!(parse_storage_code(Some("R1 a")), loc(Some("1"), None, Some("a")));
        assert!(try_parse_storage_code("R1 f").is_err());
    }

    #[test]
    fn malformed_code_yields_absent_location() {
        let err = try_parse_storage_code("banana").unwrap_err();
        assert_eq!(err.to_string(), "bad location string: \"banana\"");
        assert!(parse_storage_code(Some("banana")).is_absent());
    }

    #[test]
    fn parser_is_total() {
        for input in ["", " ", "R", "C2", "R,", "ÿR1", "R99999999999999999999", "\n"] {
            let _ = parse_storage_code(Some(input));
        }
        assert!(parse_storage_code(None).is_absent());
    }

    #[test]
    fn forward_fill_uses_nearest_place_above() {
        let mut places = vec![
            Some("Salón".to_owned()),
            None,
            None,
            Some("Garaje".to_owned()),
            None,
        ];
        forward_fill_places(&mut places);
        assert_eq!(
            places,
            vec![
                Some("Salón".to_owned()),
                Some("Salón".to_owned()),
                Some("Salón".to_owned()),
                Some("Garaje".to_owned()),
                Some("Garaje".to_owned()),
            ]
        );
    }

    #[test]
    fn forward_fill_leaves_leading_gap_absent() {
        let mut places = vec![None, Some("Ático".to_owned()), None];
        forward_fill_places(&mut places);
        assert_eq!(places[0], None);
        assert_eq!(places[2].as_deref(), Some("Ático"));
    }

    #[test]
    fn normalize_attaches_location_positionally() {
        let raw = vec![
            RawRow {
                place: Some("Salón".to_owned()),
                title: "Dune".to_owned(),
                storage_code: Some("R1, C2".to_owned()),
                ..RawRow::default()
            },
            RawRow {
                title: "Foo".to_owned(),
                storage_code: Some("banana".to_owned()),
                ..RawRow::default()
            },
            RawRow {
                title: "Bar".to_owned(),
                ..RawRow::default()
            },
        ];

        let normalized = normalize(raw);
        assert_eq!(normalized.bad_storage_codes, 1);
        let titles: Vec<&str> = normalized.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Dune", "Foo", "Bar"]);
        assert!(normalized.rows.iter().all(|r| r.place == "Salón"));
        assert_eq!(normalized.rows[0].row.as_deref(), Some("1"));
        assert_eq!(normalized.rows[0].column.as_deref(), Some("2"));
        assert_eq!(normalized.rows[1].row, None);
        assert_eq!(normalized.rows[1].storage_code.as_deref(), Some("banana"));
        assert_eq!(normalized.rows[2].row, None);
    }
}
