//! Writing the filtered subset back out as CSV.

use log::info;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use consolidacion::{FilterCriteria, NormalizedTable, MONTH_NAMES};
use csv::Writer;
use snafu::prelude::*;

use crate::dashboard::*;

/// Derives the export file name from the active filters, e.g.
/// `consolidacion_filtrada_2024_Noviembre_Febrero.csv`.
pub fn export_file_name(criteria: &FilterCriteria) -> String {
    let years = match &criteria.years {
        Some(years) if !years.is_empty() => years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<String>>()
            .join("_"),
        _ => "todos".to_string(),
    };
    let (start, end) = criteria.month_range.unwrap_or((1, 12));
    format!(
        "consolidacion_filtrada_{}_{}_{}.csv",
        years,
        MONTH_NAMES[(start - 1) as usize],
        MONTH_NAMES[(end - 1) as usize]
    )
}

/// Writes the selected records as CSV: the trimmed headers in source order,
/// then the row values. The yes/no columns carry their canonical tokens.
pub fn write_filtered<W: Write>(
    wtr: W,
    table: &NormalizedTable,
    selected: &[usize],
) -> Result<(), csv::Error> {
    let mut writer = Writer::from_writer(wtr);
    writer.write_record(&table.headers)?;
    for idx in selected {
        writer.write_record(&table.records[*idx].values)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the filtered subset to `dest`. A directory destination gets a file
/// name derived from the filters; a file destination is written as given.
pub fn export_filtered(
    dest: &Path,
    table: &NormalizedTable,
    selected: &[usize],
    criteria: &FilterCriteria,
) -> DashResult<()> {
    let path: PathBuf = if dest.is_dir() {
        dest.join(export_file_name(criteria))
    } else {
        dest.to_path_buf()
    };
    let file = File::create(&path).context(WritingFileSnafu {
        path: path.display().to_string(),
    })?;
    if let Err(e) = write_filtered(file, table, selected) {
        whatever!("could not write the CSV export to {}: {}", path.display(), e);
    }
    info!(
        "export_filtered: {} rows written to {}",
        selected.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use consolidacion::builder::TableBuilder;
    use consolidacion::{apply_filters, normalize};

    #[test]
    fn file_name_without_filters() {
        assert_eq!(
            export_file_name(&FilterCriteria::ALL),
            "consolidacion_filtrada_todos_Enero_Diciembre.csv"
        );
    }

    #[test]
    fn file_name_with_years_and_wrapping_months() {
        let criteria = FilterCriteria {
            years: Some(vec![2023, 2024]),
            month_range: Some((11, 2)),
            ..FilterCriteria::ALL
        };
        assert_eq!(
            export_file_name(&criteria),
            "consolidacion_filtrada_2023_2024_Noviembre_Febrero.csv"
        );
    }

    #[test]
    fn empty_year_list_falls_back_to_todos() {
        let criteria = FilterCriteria {
            years: Some(vec![]),
            ..FilterCriteria::ALL
        };
        assert_eq!(
            export_file_name(&criteria),
            "consolidacion_filtrada_todos_Enero_Diciembre.csv"
        );
    }

    #[test]
    fn exports_canonical_flag_tokens() {
        let mut builder = TableBuilder::new(&[
            "Marca temporal",
            "Nombres y apellidos completos",
            "Llamada realizada y contestada (SI/NO)",
        ]);
        builder
            .row(&["15/01/2024", "Ana", "Sí"])
            .row(&["20/01/2024", "Luis", "sin gestión"]);
        let table = normalize(&builder.build()).unwrap();
        let selected = apply_filters(&table, &FilterCriteria::ALL);

        let mut buf: Vec<u8> = Vec::new();
        write_filtered(&mut buf, &table, &selected).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Marca temporal,Nombres y apellidos completos,Llamada realizada y contestada (SI/NO)\n\
             15/01/2024,Ana,SI\n\
             20/01/2024,Luis,NO\n"
        );
    }

    #[test]
    fn exports_only_the_selected_rows() {
        let mut builder = TableBuilder::new(&["Marca temporal", "Nombres y apellidos completos"]);
        builder
            .row(&["15/01/2024", "Ana"])
            .row(&["20/06/2023", "Luis"]);
        let table = normalize(&builder.build()).unwrap();
        let criteria = FilterCriteria {
            years: Some(vec![2024]),
            ..FilterCriteria::ALL
        };
        let selected = apply_filters(&table, &criteria);

        let mut buf: Vec<u8> = Vec::new();
        write_filtered(&mut buf, &table, &selected).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Ana"));
        assert!(!text.contains("Luis"));
    }
}
