use thiserror::Error;

#[derive(Error, Debug)]
pub enum OasisError {
    #[error("{0}")]
    BadDateRange(String),

    /// OASIS answered with an xml error report instead of a csv one.
    #[error("No data available for this query.{}", no_data_detail(.code, .description))]
    NoDataAvailable {
        code: Option<String>,
        description: Option<String>,
    },

    #[error("Bad zip file: {0}")]
    BadArchive(#[from] zip::result::ZipError),

    #[error("Zip file has no entries")]
    EmptyArchive,

    #[error("market must be 'DAM', 'RTM' or 'RTPD', got '{0}'")]
    InvalidMarket(String),

    #[error("Column {0} not found")]
    MissingColumn(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Time(#[from] jiff::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn no_data_detail(code: &Option<String>, description: &Option<String>) -> String {
    match (code, description) {
        (Some(code), Some(desc)) => format!(" [{}] {}", code, desc),
        (None, Some(desc)) => format!(" {}", desc),
        _ => String::new(),
    }
}
