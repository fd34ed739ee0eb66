use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Header of the Origin Index column in persisted carts.
pub const ORIGIN_INDEX_HEADER: &str = "orig_idx";

/// Author value used in the catalogue when the author is unknown.
pub const UNKNOWN_AUTHOR: &str = "-";

/// A record stored as one worksheet row, addressed by header name.
pub trait SheetRecord: Serialize + DeserializeOwned {
    /// Column headers in the order records are written.
    const HEADERS: &'static [&'static str];
}

/// One book of the normalized catalogue (the `catalogo` worksheet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueRow {
    #[serde(rename = "Lugar", default)]
    pub place: String,
    #[serde(rename = "Titulo", default)]
    pub title: String,
    #[serde(rename = "Autor")]
    pub author: Option<String>,
    #[serde(rename = "Año")]
    pub year: Option<String>,
    #[serde(rename = "Editorial")]
    pub editorial: Option<String>,
    #[serde(rename = "Idioma")]
    pub language: Option<String>,
    #[serde(rename = "Tema")]
    pub topic: Option<String>,
    #[serde(rename = "Guardado")]
    pub storage_code: Option<String>,
    #[serde(rename = "Notas")]
    pub notes: Option<String>,
    #[serde(rename = "Row")]
    pub row: Option<String>,
    #[serde(rename = "Column")]
    pub column: Option<String>,
    #[serde(rename = "Subrow")]
    pub subrow: Option<String>,
}

impl SheetRecord for CatalogueRow {
    const HEADERS: &'static [&'static str] = &[
        "Lugar", "Titulo", "Autor", "Año", "Editorial", "Idioma", "Tema", "Guardado", "Notas",
        "Row", "Column", "Subrow",
    ];
}

/// A catalogue row picked into a user's cart.
///
/// Identity columns come first so the cart sheet can be copied as-is; the
/// Origin Index is always last and joins back to the full catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRow {
    #[serde(rename = "Titulo", default)]
    pub title: String,
    #[serde(rename = "Autor")]
    pub author: Option<String>,
    #[serde(rename = "Año")]
    pub year: Option<String>,
    #[serde(rename = "Lugar", default)]
    pub place: String,
    #[serde(rename = "Row")]
    pub row: Option<String>,
    #[serde(rename = "Column")]
    pub column: Option<String>,
    #[serde(rename = "Subrow")]
    pub subrow: Option<String>,
    #[serde(rename = "Editorial")]
    pub editorial: Option<String>,
    #[serde(rename = "Idioma")]
    pub language: Option<String>,
    #[serde(rename = "Tema")]
    pub topic: Option<String>,
    #[serde(rename = "Guardado")]
    pub storage_code: Option<String>,
    #[serde(rename = "Notas")]
    pub notes: Option<String>,
    #[serde(rename = "orig_idx")]
    pub origin_index: usize,
}

impl SheetRecord for CartRow {
    const HEADERS: &'static [&'static str] = &[
        "Titulo",
        "Autor",
        "Año",
        "Lugar",
        "Row",
        "Column",
        "Subrow",
        "Editorial",
        "Idioma",
        "Tema",
        "Guardado",
        "Notas",
        ORIGIN_INDEX_HEADER,
    ];
}

impl CartRow {
    pub fn from_catalogue(row: &CatalogueRow, origin_index: usize) -> Self {
        Self {
            title: row.title.clone(),
            author: row.author.clone(),
            year: row.year.clone(),
            place: row.place.clone(),
            row: row.row.clone(),
            column: row.column.clone(),
            subrow: row.subrow.clone(),
            editorial: row.editorial.clone(),
            language: row.language.clone(),
            topic: row.topic.clone(),
            storage_code: row.storage_code.clone(),
            notes: row.notes.clone(),
            origin_index,
        }
    }
}

/// The three fields encoded in a storage code such as `R3, C2, F`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub row: Option<String>,
    pub column: Option<String>,
    pub subrow: Option<String>,
}

impl Location {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.row.is_none() && self.column.is_none() && self.subrow.is_none()
    }
}
