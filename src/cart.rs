use std::collections::HashSet;

use crate::formats::{CartRow, UNKNOWN_AUTHOR};

/// Worksheet and cache name of a user's cart.
///
/// Derived from the given name as the shared spreadsheet has always been
/// laid out. Characters unsafe in a file name, and `~` itself, are written
/// as `~XX` per UTF-8 byte, so distinct given names never share a cart.
pub fn cart_name(given_name: &str) -> String {
    let mut safe = String::with_capacity(given_name.len());
    for c in given_name.trim().chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            safe.push(c);
        } else {
            let mut buf = [0; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                safe.push_str(&format!("~{byte:02X}"));
            }
        }
    }
    format!("carrito_{safe}")
}

/// Books one user has picked, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    rows: Vec<CartRow>,
}

impl Cart {
    pub fn new(rows: Vec<CartRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CartRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn origin_indices(&self) -> HashSet<usize> {
        self.rows.iter().map(|row| row.origin_index).collect()
    }

    /// Appends without de-duplicating by Origin Index.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = CartRow>) {
        self.rows.extend(rows);
    }

    /// Removes every row with one of `origin_indices`; returns how many went.
    pub fn remove(&mut self, origin_indices: &HashSet<usize>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !origin_indices.contains(&row.origin_index));
        before - self.rows.len()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn pick_list(&self) -> String {
        export_pick_list(&self.rows)
    }
}

/// Numbered, copy-pasteable list: `1. Title -- Author (Year)`.
///
/// The author is left out when absent, empty or `-`; the year when absent.
pub fn export_pick_list(rows: &[CartRow]) -> String {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let mut line = format!("{}. {}", i + 1, row.title);
            if let Some(author) = row.author.as_deref()
                && !author.is_empty()
                && author != UNKNOWN_AUTHOR
            {
                line.push_str(&format!(" -- {author}"));
            }
            if let Some(year) = row.year.as_deref() {
                line.push_str(&format!(" ({year})"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
