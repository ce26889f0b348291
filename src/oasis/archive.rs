use std::io::{Cursor, Read};

use log::{debug, warn};
use quick_xml::{events::Event, Reader};
use zip::ZipArchive;

use super::error::OasisError;

/// Return the name and the content of the first file in a zip archive.
/// OASIS puts one report per archive, other files are ignored.
pub fn first_entry(bytes: &[u8]) -> Result<(String, Vec<u8>), OasisError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    if zip.len() == 0 {
        return Err(OasisError::EmptyArchive);
    }
    if zip.len() > 1 {
        warn!(
            "Archive has {} files, only reading the first one",
            zip.len()
        );
    }
    let mut file = zip.by_index(0)?;
    let name = file.name().to_string();
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    debug!("extracted {} ({} bytes)", name, content.len());
    Ok((name, content))
}

/// The error payload OASIS sends instead of a report, e.g.
/// ```xml
/// <m:RTO>
///   <m:name>CAISO</m:name>
///   <m:ERROR>
///     <m:ERR_CODE>1000</m:ERR_CODE>
///     <m:ERR_DESC>No data returned for the specified selection</m:ERR_DESC>
///   </m:ERROR>
/// </m:RTO>
/// ```
#[derive(Debug, Default, PartialEq)]
pub struct ErrorReport {
    pub code: Option<String>,
    pub description: Option<String>,
}

impl From<ErrorReport> for OasisError {
    fn from(report: ErrorReport) -> Self {
        OasisError::NoDataAvailable {
            code: report.code,
            description: report.description,
        }
    }
}

pub fn parse_error_report(xml: &[u8]) -> Result<ErrorReport, OasisError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut report = ErrorReport::default();
    let mut current: Option<Vec<u8>> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => current = Some(e.local_name().as_ref().to_vec()),
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                match current.as_deref() {
                    Some(b"ERR_CODE") => report.code = Some(text),
                    Some(b"ERR_DESC") => report.description = Some(text),
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(report)
}

/// Best effort read of the error report held by a no-data archive.
pub fn read_error_report(bytes: &[u8]) -> ErrorReport {
    match first_entry(bytes).and_then(|(_, content)| parse_error_report(&content)) {
        Ok(report) => report,
        Err(e) => {
            debug!("could not read the error report: {}", e);
            ErrorReport::default()
        }
    }
}
