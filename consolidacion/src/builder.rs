pub use crate::config::RawTable;

/// A builder for assembling a raw table row by row.
///
/// ```
/// pub use consolidacion::builder::TableBuilder;
///
/// let mut builder = TableBuilder::new(&["Marca temporal", "Nombres y apellidos completos"]);
/// builder
///     .row(&["15/01/2024 10:00:00", "Ana Pérez"])
///     .row(&["20/02/2024", "Luis Gómez"]);
///
/// let table = builder.build();
/// assert_eq!(table.rows.len(), 2);
/// ```
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> TableBuilder {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Adds one row. Values are kept as given; the normalizer pads short rows
    /// to the header length.
    pub fn row(&mut self, values: &[&str]) -> &mut TableBuilder {
        self.rows
            .push(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn build(&self) -> RawTable {
        RawTable {
            headers: self.headers.clone(),
            rows: self.rows.clone(),
        }
    }
}
