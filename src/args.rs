use clap::Parser;

/// Tabulates consolidation follow-up metrics from a published spreadsheet.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (URL or file path) The CSV source: a published Google Sheets CSV URL
    /// or a local file. May also be given in the --config file.
    #[clap(short, long, value_parser)]
    pub source: Option<String>,

    /// (file path, optional) A JSON configuration file carrying the source
    /// address and default filter selections. Command line flags take
    /// precedence over it.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the metric summary in
    /// JSON format. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file or directory path) If specified, the filtered subset is written
    /// there as CSV. For a directory, the file name is derived from the
    /// active filters.
    #[clap(short, long, value_parser)]
    pub export: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, consolida
    /// will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (comma-separated years) Keep only these years. Records without a
    /// parseable timestamp always survive this filter.
    #[clap(short, long, value_parser, use_value_delimiter = true)]
    pub years: Option<Vec<i32>>,

    /// (1-12) First month of the month-range filter. Requires --month-end.
    /// A start greater than the end wraps across the year boundary.
    #[clap(long, value_parser)]
    pub month_start: Option<u32>,

    /// (1-12) Last month of the month-range filter, inclusive.
    #[clap(long, value_parser)]
    pub month_end: Option<u32>,

    /// Keep only this age group ('Todos' disables the filter).
    #[clap(long, value_parser)]
    pub age_group: Option<String>,

    /// Keep only the records of this leader ('Todos' disables the filter).
    #[clap(long, value_parser)]
    pub leader: Option<String>,

    /// Keep only this meeting ('Todas' disables the filter).
    #[clap(long, value_parser)]
    pub meeting: Option<String>,

    /// If passed as an argument, drops the cached copy of the source before
    /// fetching, forcing an immediate re-fetch.
    #[clap(long, takes_value = false)]
    pub refresh: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard
    /// output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
