//! Decoding the fetched CSV body into a raw table.

use consolidacion::RawTable;
use csv::ReaderBuilder;

/// Reads a CSV document into a raw table: the header row plus the rows of
/// string values.
///
/// The reader is flexible on purpose: hand-edited sheets routinely carry
/// rows shorter or longer than the header, and the normalizer pads them.
pub fn read_table(text: &str) -> Result<RawTable, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_rows() {
        let table = read_table("Marca temporal,Nombre\n15/01/2024,Ana\n20/01/2024,Luis\n").unwrap();
        assert_eq!(table.headers, vec!["Marca temporal", "Nombre"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["15/01/2024", "Ana"]);
    }

    #[test]
    fn accepts_quoted_values_with_commas() {
        let table = read_table("a,b\n\"x, y\",z\n").unwrap();
        assert_eq!(table.rows[0], vec!["x, y", "z"]);
    }

    #[test]
    fn accepts_short_rows() {
        let table = read_table("a,b,c\n1\n1,2,3\n").unwrap();
        assert_eq!(table.rows[0], vec!["1"]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn header_only_document_has_no_rows() {
        let table = read_table("a,b,c\n").unwrap();
        assert_eq!(table.headers.len(), 3);
        assert!(table.rows.is_empty());
    }
}
