use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::cli::CleanArgs;
use crate::location::{RawRow, normalize};
use crate::table::Table;

/// Headers the raw export gives its first column, which holds the merged
/// place cells.
const PLACE_HEADERS: [&str; 3] = ["", "Unnamed: 0", "Lugar"];

const REQUIRED_HEADERS: [&str; 4] = ["Titulo", "Autor", "Año", "Guardado"];

const OPTIONAL_HEADERS: [&str; 4] = ["Editorial", "Idioma", "Tema", "Notas"];

/// Blank or pandas-style `Unnamed: N` headers mark empty spacer columns.
fn is_spacer(header: &str) -> bool {
    header.trim().is_empty() || header.starts_with("Unnamed: ")
}

pub fn run(args: CleanArgs) -> anyhow::Result<()> {
    let out_path = Path::new(&args.out);
    if out_path.exists() && !args.force {
        anyhow::bail!("clean output already exists: {}", out_path.display());
    }

    let input = std::fs::read(&args.input).with_context(|| format!("read input: {}", args.input))?;
    let raw = Table::read_csv(input.as_slice())
        .with_context(|| format!("parse input csv: {}", args.input))?;
    let raw_rows = read_raw_export(&raw).context("read raw export")?;

    let normalized = normalize(raw_rows);
    tracing::info!(
        rows = normalized.rows.len(),
        bad_storage_codes = normalized.bad_storage_codes,
        "normalized catalogue"
    );

    let table = Table::from_records(&normalized.rows)?;

    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create clean output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if args.force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options
        .open(out_path)
        .with_context(|| format!("open output: {}", out_path.display()))?;
    // Byte-order mark so spreadsheet apps pick UTF-8 for the accented headers.
    file.write_all("\u{feff}".as_bytes())
        .with_context(|| format!("write output: {}", out_path.display()))?;
    table
        .write_csv(&mut file)
        .with_context(|| format!("write output: {}", out_path.display()))?;

    Ok(())
}

/// Maps the raw export's columns by name. The unnamed spacer columns are
/// ignored; the optional domain columns may be missing. Any other column is
/// an error, so no data is dropped on the way to the clean table.
pub fn read_raw_export(table: &Table) -> anyhow::Result<Vec<RawRow>> {
    let first = table
        .headers
        .first()
        .ok_or_else(|| anyhow::anyhow!("raw export has no columns"))?;
    if !PLACE_HEADERS.contains(&first.as_str()) {
        anyhow::bail!("first column must hold the place, found header {first:?}");
    }

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|h| !table.headers.iter().any(|actual| actual == h))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!("raw export is missing columns {missing:?}");
    }

    let unexpected: Vec<&str> = table.headers[1..]
        .iter()
        .map(String::as_str)
        .filter(|h| !is_spacer(h))
        .filter(|h| !REQUIRED_HEADERS.contains(h) && !OPTIONAL_HEADERS.contains(h))
        .collect();
    if !unexpected.is_empty() {
        anyhow::bail!("raw export has unexpected columns {unexpected:?}");
    }

    let column = |name: &str| table.headers.iter().position(|h| h == name);
    let title = column("Titulo");
    let author = column("Autor");
    let year = column("Año");
    let editorial = column("Editorial");
    let language = column("Idioma");
    let topic = column("Tema");
    let storage_code = column("Guardado");
    let notes = column("Notas");

    let rows = table
        .rows
        .iter()
        .map(|cells| {
            let cell = |index: Option<usize>| {
                index
                    .and_then(|i| cells.get(i))
                    .filter(|value| !value.trim().is_empty())
                    .cloned()
            };
            RawRow {
                place: cell(Some(0)),
                title: cell(title).unwrap_or_default(),
                author: cell(author),
                year: cell(year),
                editorial: cell(editorial),
                language: cell(language),
                topic: cell(topic),
                storage_code: cell(storage_code),
                notes: cell(notes),
            }
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table(csv: &str) -> Table {
        Table::read_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn maps_columns_by_name_and_skips_spacers() {
        let table = raw_table(
            "Unnamed: 0,Titulo,Autor,Año,Editorial,Idioma,Tema,Unnamed: 7,Guardado,Notas\n\
             Salón,Dune,Herbert,1965,Ace,en,SF,,\"R3, C2, F\",\n\
             ,Foo,-,,,,,,,\n",
        );
        let rows = read_raw_export(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].place.as_deref(), Some("Salón"));
        assert_eq!(rows[0].storage_code.as_deref(), Some("R3, C2, F"));
        assert_eq!(rows[0].editorial.as_deref(), Some("Ace"));
        assert_eq!(rows[1].place, None);
        assert_eq!(rows[1].author.as_deref(), Some("-"));
        assert_eq!(rows[1].year, None);
    }

    #[test]
    fn optional_domain_columns_may_be_missing() {
        let table = raw_table(",Titulo,Autor,Año,Guardado\nSalón,Dune,Herbert,1965,R1\n");
        let rows = read_raw_export(&table).unwrap();
        assert_eq!(rows[0].title, "Dune");
        assert_eq!(rows[0].editorial, None);
    }

    #[test]
    fn missing_required_column_is_reported() {
        let table = raw_table("Unnamed: 0,Titulo,Autor,Año\nSalón,Dune,Herbert,1965\n");
        let err = read_raw_export(&table).unwrap_err().to_string();
        assert!(err.contains("Guardado"), "{err}");
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let table = raw_table(
            "Unnamed: 0,Titulo,Autor,Año,Tema,Guardado,Unnamed: 6,Estado,Ubicacion2\n\
             Salón,Dune,Herbert,1965,SF,R1,,bueno,x\n",
        );
        let err = read_raw_export(&table).unwrap_err().to_string();
        assert!(err.contains(r#"["Estado", "Ubicacion2"]"#), "{err}");
        assert!(!err.contains("Unnamed"), "{err}");
    }
}
