use std::collections::BTreeSet;
use std::io;

use anyhow::Context as _;

use crate::formats::SheetRecord;

const BOM: char = '\u{feff}';

/// A worksheet as plain text cells: one header row plus data rows.
///
/// An empty cell is an absent value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn with_headers(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| (*h).to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn read_csv<R: io::Read>(reader: R) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = reader
            .headers()
            .context("read csv headers")?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches(BOM) } else { h };
                h.trim().to_owned()
            })
            .collect();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("read csv record {}", i + 1))?;
            rows.push(record.iter().map(str::to_owned).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        writer
            .write_record(&self.headers)
            .context("write csv headers")?;
        for row in &self.rows {
            writer.write_record(row).context("write csv record")?;
        }
        writer.flush().context("flush csv")?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    /// Fails unless the headers are exactly `expected`, in any order.
    pub fn require_headers(&self, expected: &[&str]) -> anyhow::Result<()> {
        let actual: BTreeSet<&str> = self.headers.iter().map(String::as_str).collect();
        let expected: BTreeSet<&str> = expected.iter().copied().collect();

        let missing: Vec<&str> = expected.difference(&actual).copied().collect();
        let unexpected: Vec<&str> = actual.difference(&expected).copied().collect();
        if missing.is_empty() && unexpected.is_empty() && actual.len() == self.headers.len() {
            return Ok(());
        }

        if missing.is_empty() && unexpected.is_empty() {
            anyhow::bail!("duplicate column headers: {:?}", self.headers);
        }
        anyhow::bail!(
            "unexpected sheet schema: missing columns {missing:?}, unexpected columns {unexpected:?}"
        );
    }

    pub fn from_records<T: SheetRecord>(records: &[T]) -> anyhow::Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for record in records {
            writer.serialize(record).context("serialize record")?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("finish record buffer: {err}"))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes.as_slice());
        let mut table = Self::with_headers(T::HEADERS);
        for record in reader.records() {
            let record = record.context("reread serialized record")?;
            table.rows.push(record.iter().map(str::to_owned).collect());
        }
        Ok(table)
    }

    /// Deserializes every row by header name after checking the schema.
    pub fn to_records<T: SheetRecord>(&self) -> anyhow::Result<Vec<T>> {
        self.require_headers(T::HEADERS)?;

        let headers = csv::StringRecord::from(self.headers.clone());
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let record = csv::StringRecord::from(row.clone());
                record
                    .deserialize::<T>(Some(&headers))
                    .with_context(|| format!("parse sheet row {}", i + 1))
            })
            .collect()
    }
}
