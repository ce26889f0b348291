use std::{
    cmp::Ordering,
    io::{Read, Write},
};

use csv::{ReaderBuilder, StringRecord};
use jiff::civil::Date;
use serde::{
    de::DeserializeOwned,
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};

use super::error::OasisError;

/// Column layout of the locational price reports.  Prices are reported in
/// the `MW` column, the real-time pre-dispatch report calls it `PRC`.
pub const LMP_COLUMNS: [&str; 16] = [
    "INTERVALSTARTTIME_GMT",
    "INTERVALENDTIME_GMT",
    "OPR_DT",
    "OPR_HR",
    "OPR_INTERVAL",
    "NODE_ID_XML",
    "NODE_ID",
    "NODE",
    "MARKET_RUN_ID",
    "LMP_TYPE",
    "XML_DATA_ITEM",
    "PNODE_RESMRID",
    "GRP_TYPE",
    "POS",
    "MW",
    "GROUP",
];

/// A csv report held as strings.  Empty cells are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Table {
        let n = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(n, None);
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// Read a csv with a header line.  Short rows are padded with `None`, long
    /// rows are truncated to the header width.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Table, OasisError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(|e| e.to_string()).collect();
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|e| match e {
                    "" => None,
                    _ => Some(e.to_string()),
                })
                .collect();
            row.resize(columns.len(), None);
            rows.push(row);
        }
        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|e| e == column)
    }

    fn position_or_err(&self, column: &str) -> Result<usize, OasisError> {
        self.position(column)
            .ok_or_else(|| OasisError::MissingColumn(column.to_string()))
    }

    /// Value of the cell at row `i` and the given column.
    pub fn get(&self, i: usize, column: &str) -> Option<&str> {
        let j = self.position(column)?;
        self.rows.get(i)?.get(j)?.as_deref()
    }

    pub fn column(&self, column: &str) -> Result<Vec<Option<&str>>, OasisError> {
        let j = self.position_or_err(column)?;
        Ok(self.rows.iter().map(|row| row[j].as_deref()).collect())
    }

    /// Parse a column of `YYYY-MM-DD` values.
    pub fn date_column(&self, column: &str) -> Result<Vec<Option<Date>>, OasisError> {
        self.column(column)?
            .into_iter()
            .map(|e| -> Result<Option<Date>, OasisError> {
                match e {
                    Some(s) => Ok(Some(s.parse::<Date>()?)),
                    None => Ok(None),
                }
            })
            .collect()
    }

    /// Stable sort on the given columns.  Numbers come first in numeric order,
    /// then other strings in lexicographic order, then missing cells.
    pub fn sort_by<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<(), OasisError> {
        let idx = columns
            .iter()
            .map(|e| self.position_or_err(e.as_ref()))
            .collect::<Result<Vec<usize>, OasisError>>()?;
        self.rows.sort_by(|a, b| {
            idx.iter().fold(Ordering::Equal, |acc, &j| {
                acc.then_with(|| compare_cells(a[j].as_deref(), b[j].as_deref()))
            })
        });
        Ok(())
    }

    /// Rename a column.  Does nothing if the column is not there.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(column) = self.columns.iter_mut().find(|e| *e == from) {
            *column = to.to_string();
        }
    }

    /// Conform the table to the given columns, in that order.  Columns not in
    /// the table are filled with `None`, columns not in `schema` are dropped.
    pub fn reindex<S: AsRef<str>>(self, schema: &[S]) -> Table {
        let idx: Vec<Option<usize>> = schema.iter().map(|e| self.position(e.as_ref())).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                idx.iter()
                    .map(|j| j.and_then(|j| row[j].clone()))
                    .collect::<Vec<Option<String>>>()
            })
            .collect();
        Table {
            columns: schema.iter().map(|e| e.as_ref().to_string()).collect(),
            rows,
        }
    }

    /// Deserialize each row into a `T`, matching the fields by column name.
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>, OasisError> {
        let headers = StringRecord::from(self.columns.clone());
        self.rows
            .iter()
            .map(|row| -> Result<T, OasisError> {
                let record = StringRecord::from(
                    row.iter()
                        .map(|e| e.as_deref().unwrap_or(""))
                        .collect::<Vec<&str>>(),
                );
                Ok(record.deserialize::<T>(Some(&headers))?)
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), OasisError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|e| e.as_deref().unwrap_or("")))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn compare_cells(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match (as_number(x), as_number(y)) {
            (Some(u), Some(v)) => u.total_cmp(&v),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => x.cmp(y),
        },
    }
}

// NaN and infinities sort with the strings
fn as_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|e| e.is_finite())
}

/// Serialize as a list of objects, one per row, keys in column order.
impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowRef {
                columns: &self.columns,
                row,
            })?;
        }
        seq.end()
    }
}

struct RowRef<'a> {
    columns: &'a [String],
    row: &'a [Option<String>],
}

impl Serialize for RowRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (k, v) in self.columns.iter().zip(self.row.iter()) {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
