pub mod archive;
pub mod atlas;
pub mod config;
pub mod de;
pub mod error;
pub mod node;
pub mod system_demand;
pub mod table;

use std::fmt;

use itertools::Itertools;
use jiff::{civil::DateTime, tz::TimeZone, Zoned};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use reqwest::{blocking::Client, header::CONTENT_DISPOSITION, Url};

use self::{
    archive::{first_entry, parse_error_report, read_error_report},
    config::OasisConfig,
    error::OasisError,
    table::Table,
};

/// Format of the `startdatetime` and `enddatetime` query parameters.
pub const UTC_FORMAT: &str = "%Y%m%dT%H:%M-0000";

/// Ask for csv reports.
pub const RESULT_FORMAT_CSV: u8 = 6;

lazy_static! {
    // OASIS names the attachment *.xml.zip when it has no data to return
    static ref NO_DATA: Regex = Regex::new(r#"\.xml\.zip"?;?\s*$"#).unwrap();
}

/// Query parameters of one OASIS request, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OasisQuery {
    params: Vec<(String, String)>,
}

impl OasisQuery {
    pub fn new(query_name: &str) -> OasisQuery {
        OasisQuery::default().param("queryname", query_name)
    }

    pub fn param<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for OasisQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .join("&")
        )
    }
}

/// How to shape the csv report into a [`Table`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableOptions {
    sort_by: Vec<String>,
    columns: Option<Vec<String>>,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, columns: &[&str]) -> Self {
        self.sort_by = columns.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Conform the output to these columns.  If not set, keep the columns of
    /// the report.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|e| e.to_string()).collect());
        self
    }
}

/// Client for the CAISO OASIS `SingleZip` endpoint.  Each request returns a
/// zip archive with one csv report.
#[derive(Clone, Debug)]
pub struct Oasis {
    config: OasisConfig,
    client: Client,
}

impl Oasis {
    pub fn new(config: OasisConfig) -> Result<Oasis, OasisError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Oasis { config, client })
    }

    pub fn from_env() -> Result<Oasis, OasisError> {
        Oasis::new(OasisConfig::from_env()?)
    }

    pub fn config(&self) -> &OasisConfig {
        &self.config
    }

    /// Check a `[start, end)` range against the current time in the market
    /// time zone.  See [`validate_date_range_at`].
    pub fn validate_date_range(&self, start: DateTime, end: DateTime) -> Result<(), OasisError> {
        let now = Zoned::now().with_time_zone(self.config.time_zone.clone());
        validate_date_range_at(start, end, now.datetime())
    }

    /// The UTC timestamp OASIS expects for a datetime in the market time zone.
    pub fn utc_string(&self, dt: DateTime) -> Result<String, OasisError> {
        utc_string(dt, &self.config.time_zone)
    }

    /// Start a query with the parameters all reports share.
    pub fn query(
        &self,
        query_name: &str,
        start: DateTime,
        end: DateTime,
    ) -> Result<OasisQuery, OasisError> {
        Ok(OasisQuery::new(query_name)
            .param("startdatetime", self.utc_string(start)?)
            .param("enddatetime", self.utc_string(end)?)
            .param("version", 1))
    }

    pub fn request_url(&self, query: &OasisQuery) -> Result<Url, OasisError> {
        Url::parse_with_params(&self.config.base_url, query.params())
            .map_err(|e| OasisError::Config(format!("{}: {}", self.config.base_url, e)))
    }

    /// Make the http request.  Fails with [`OasisError::NoDataAvailable`] when
    /// the attachment is an xml error report instead of a csv one.
    pub fn request(&self, query: &OasisQuery) -> Result<Vec<u8>, OasisError> {
        let url = self.request_url(query)?;
        info!("GET {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|e| e.to_str().ok())
            .map(|e| e.to_string());
        let bytes = response.bytes()?;
        debug!(
            "received {} bytes, content-disposition: {:?}",
            bytes.len(),
            disposition
        );
        match disposition {
            Some(d) if is_no_data(&d) => Err(read_error_report(&bytes).into()),
            _ => Ok(bytes.to_vec()),
        }
    }

    /// Unpack the response into a table.
    pub fn get_table(&self, bytes: &[u8], options: &TableOptions) -> Result<Table, OasisError> {
        read_table(bytes, options)
    }

    /// Request and unpack.
    pub fn fetch(&self, query: &OasisQuery, options: &TableOptions) -> Result<Table, OasisError> {
        let bytes = self.request(query)?;
        let table = self.get_table(&bytes, options)?;
        info!("{}: {} rows", query.get("queryname").unwrap_or(""), table.len());
        Ok(table)
    }
}

/// Check if the `content-disposition` header announces an xml error report.
pub fn is_no_data(content_disposition: &str) -> bool {
    NO_DATA.is_match(content_disposition)
}

/// Reject bad `[start, end)` ranges.  If several checks fail, the error for
/// the last one is returned.
pub fn validate_date_range_at(
    start: DateTime,
    end: DateTime,
    now: DateTime,
) -> Result<(), OasisError> {
    let today = now.date().strftime("%Y-%m-%d").to_string();
    let mut error: Option<String> = None;

    if start > end {
        error = Some("Start must be before end.".to_string());
    }

    if start > now {
        error = Some(format!("Start must be before today, {}", today));
    } else if end > now {
        error = Some(format!("End must be before or equal to today, {}", today));
    }

    if start.date() == end.date() {
        error = Some(
            "Start and end cannot be equal. To return data only from start date, pass only start."
                .to_string(),
        );
    }

    match error {
        Some(e) => Err(OasisError::BadDateRange(e)),
        None => Ok(()),
    }
}

/// Forecast ranges may be in the future, only check that they are not empty.
pub fn validate_date_order(start: DateTime, end: DateTime) -> Result<(), OasisError> {
    if start >= end {
        return Err(OasisError::BadDateRange(
            "Start must be before end.".to_string(),
        ));
    }
    Ok(())
}

/// Localize `dt` in `tz` and format it in UTC.  Wall clock times skipped by
/// the spring transition use the standard time offset, repeated times in the
/// fall resolve to the second (standard time) occurrence.
pub fn utc_string(dt: DateTime, tz: &TimeZone) -> Result<String, OasisError> {
    let zoned = tz.to_ambiguous_zoned(dt).later()?;
    Ok(zoned
        .with_time_zone(TimeZone::UTC)
        .strftime(UTC_FORMAT)
        .to_string())
}

/// Extract the first file of the archive, parse it as csv, sort, rename the
/// `PRC` column to `MW` and reindex.
pub fn read_table(bytes: &[u8], options: &TableOptions) -> Result<Table, OasisError> {
    let (name, content) = first_entry(bytes)?;
    if name.to_lowercase().ends_with(".xml") {
        return Err(parse_error_report(&content).unwrap_or_default().into());
    }

    let mut table = Table::from_csv_reader(content.as_slice())?;
    if !options.sort_by.is_empty() {
        table.sort_by(options.sort_by.as_slice())?;
    }
    table.rename("PRC", "MW");
    if let Some(columns) = &options.columns {
        table = table.reindex(columns.as_slice());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use mockito::{Matcher, Server, ServerGuard};

    use super::archive::tests::{make_zip, NO_DATA_XML};
    use super::table::LMP_COLUMNS;
    use super::*;

    fn la() -> TimeZone {
        TimeZone::get("America/Los_Angeles").unwrap()
    }

    /// A client pointed at the mock server.
    fn mock_oasis(server: &ServerGuard) -> Oasis {
        let config =
            OasisConfig::default().with_base_url(format!("{}/oasisapi/SingleZip", server.url()));
        Oasis::new(config).unwrap()
    }

    fn lmp_query(oasis: &Oasis) -> OasisQuery {
        oasis
            .query(
                "PRC_LMP",
                date(2020, 1, 1).at(0, 0, 0, 0),
                date(2020, 1, 2).at(0, 0, 0, 0),
            )
            .unwrap()
            .param("resultformat", RESULT_FORMAT_CSV)
            .param("market_run_id", "DAM")
            .param("node", "CAPTJACK_5_N003")
    }

    #[test]
    fn test_utc_string() -> Result<(), OasisError> {
        let tz = la();
        assert_eq!(
            utc_string(date(2020, 1, 1).at(0, 0, 0, 0), &tz)?,
            "20200101T08:00-0000"
        );
        assert_eq!(
            utc_string(date(2020, 7, 1).at(0, 0, 0, 0), &tz)?,
            "20200701T07:00-0000"
        );
        assert_eq!(
            utc_string(date(2020, 12, 31).at(23, 30, 0, 0), &tz)?,
            "20210101T07:30-0000"
        );
        Ok(())
    }

    #[test]
    fn test_utc_string_dst() -> Result<(), OasisError> {
        let tz = la();
        // 02:30 does not exist on 2021-03-14, taken as 02:30-08:00
        assert_eq!(
            utc_string(date(2021, 3, 14).at(2, 30, 0, 0), &tz)?,
            "20210314T10:30-0000"
        );
        // 01:30 happens twice on 2021-11-07, the second one is 01:30-08:00
        assert_eq!(
            utc_string(date(2021, 11, 7).at(1, 30, 0, 0), &tz)?,
            "20211107T09:30-0000"
        );
        Ok(())
    }

    #[test]
    fn test_validate_date_range() {
        let now = date(2020, 1, 2).at(0, 0, 0, 0);
        let ok = validate_date_range_at(date(2020, 1, 1).at(0, 0, 0, 0), now, now);
        assert!(ok.is_ok());

        let cases = vec![
            (
                date(2021, 1, 2).at(0, 0, 0, 0),
                date(2021, 1, 1).at(0, 0, 0, 0),
            ),
            (now, date(2020, 4, 11).at(0, 0, 0, 0)),
            (date(2020, 4, 11).at(0, 0, 0, 0), now),
            (
                date(2019, 1, 2).at(0, 0, 0, 0),
                date(2019, 1, 2).at(0, 0, 0, 0),
            ),
        ];
        for (start, end) in cases {
            let res = validate_date_range_at(start, end, now);
            assert!(matches!(res, Err(OasisError::BadDateRange(_))));
        }
    }

    #[test]
    fn test_validate_date_range_messages() {
        let now = date(2020, 1, 2).at(12, 0, 0, 0);
        let msg = |start: DateTime, end: DateTime| match validate_date_range_at(start, end, now) {
            Err(OasisError::BadDateRange(e)) => e,
            _ => String::new(),
        };
        assert_eq!(
            msg(date(2019, 6, 2).at(0, 0, 0, 0), date(2019, 6, 1).at(0, 0, 0, 0)),
            "Start must be before end."
        );
        assert_eq!(
            msg(date(2019, 6, 1).at(0, 0, 0, 0), date(2020, 2, 1).at(0, 0, 0, 0)),
            "End must be before or equal to today, 2020-01-02"
        );
        // inverted and in the future, the future wins
        assert_eq!(
            msg(date(2020, 3, 1).at(0, 0, 0, 0), date(2020, 1, 1).at(0, 0, 0, 0)),
            "Start must be before today, 2020-01-02"
        );
        // same day, even with different hours
        assert_eq!(
            msg(date(2019, 6, 1).at(0, 0, 0, 0), date(2019, 6, 1).at(5, 0, 0, 0)),
            "Start and end cannot be equal. To return data only from start date, pass only start."
        );
    }

    #[test]
    fn test_validate_date_order() {
        let d1 = date(2030, 1, 1).at(0, 0, 0, 0);
        let d2 = date(2030, 1, 2).at(0, 0, 0, 0);
        assert!(validate_date_order(d1, d2).is_ok());
        assert!(validate_date_order(d2, d1).is_err());
        assert!(validate_date_order(d1, d1).is_err());
    }

    #[test]
    fn test_is_no_data() {
        assert!(is_no_data(
            "inline; filename=20200101_20200102_PRC_LMP_DAM_20200102_00_00_00_v1.xml.zip;"
        ));
        assert!(!is_no_data(
            "inline; filename=20200101_20200102_PRC_LMP_DAM_20200102_00_00_00_v1.csv.zip;"
        ));
        assert!(!is_no_data("inline; filename=report.xml.zip.csv;"));
    }

    #[test]
    fn test_query_and_url() -> Result<(), OasisError> {
        let oasis = Oasis::new(OasisConfig::default())?;
        let query = oasis
            .query(
                "SLD_FCST",
                date(2020, 1, 1).at(0, 0, 0, 0),
                date(2020, 1, 3).at(0, 0, 0, 0),
            )?
            .param("resultformat", RESULT_FORMAT_CSV);
        assert_eq!(
            query.to_string(),
            "queryname=SLD_FCST&startdatetime=20200101T08:00-0000&enddatetime=20200103T08:00-0000&version=1&resultformat=6"
        );
        let url = oasis.request_url(&query)?;
        assert_eq!(url.host_str(), Some("oasis.caiso.com"));
        assert_eq!(url.path(), "/oasisapi/SingleZip");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs, query.params());
        Ok(())
    }

    #[test]
    fn test_read_table_lmp() -> Result<(), OasisError> {
        let csv = "INTERVALSTARTTIME_GMT,INTERVALENDTIME_GMT,OPR_DT,OPR_HR,OPR_INTERVAL,NODE_ID_XML,NODE_ID,NODE,MARKET_RUN_ID,LMP_TYPE,XML_DATA_ITEM,PNODE_RESMRID,GRP_TYPE,POS,PRC,GROUP
2020-01-01T09:00:00-00:00,2020-01-01T10:00:00-00:00,2020-01-01,2,0,CAPTJACK_5_N003,CAPTJACK_5_N003,CAPTJACK_5_N003,RTPD,LMP,LMP_PRC,CAPTJACK_5_N003,ALL,1,30.1,1
2020-01-01T08:00:00-00:00,2020-01-01T09:00:00-00:00,2020-01-01,1,0,CAPTJACK_5_N003,CAPTJACK_5_N003,CAPTJACK_5_N003,RTPD,LMP,LMP_PRC,CAPTJACK_5_N003,ALL,1,29.9,1
";
        let bytes = make_zip(&[("20200101_20200102_PRC_RTPD_LMP_RTPD_v1.csv", csv)]);
        let options = TableOptions::new()
            .sort_by(&["OPR_DT", "OPR_HR"])
            .columns(&LMP_COLUMNS);
        let table = read_table(&bytes, &options)?;
        assert_eq!(table.columns(), LMP_COLUMNS);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "OPR_HR"), Some("1"));
        assert_eq!(table.get(0, "MW"), Some("29.9"));
        assert_eq!(table.get(1, "MW"), Some("30.1"));
        Ok(())
    }

    #[test]
    fn test_read_table_keeps_columns() -> Result<(), OasisError> {
        let bytes = make_zip(&[("fcst.csv", "OPR_DT,TAC_AREA_NAME,MW\n2020-01-01,CA ISO-TAC,21000\n")]);
        let table = read_table(&bytes, &TableOptions::new())?;
        assert_eq!(table.columns(), &["OPR_DT", "TAC_AREA_NAME", "MW"]);
        Ok(())
    }

    #[test]
    fn test_read_table_xml_payload() {
        let bytes = make_zip(&[("error.xml", NO_DATA_XML)]);
        match read_table(&bytes, &TableOptions::new()) {
            Err(OasisError::NoDataAvailable { code, .. }) => {
                assert_eq!(code.as_deref(), Some("1000"))
            }
            other => panic!("expected no data, got {:?}", other),
        }
    }

    #[test]
    fn test_read_table_bad_zip() {
        let res = read_table(b"not a zip", &TableOptions::new());
        assert!(matches!(res, Err(OasisError::BadArchive(_))));
    }

    #[test]
    fn test_request_no_data() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/oasisapi/SingleZip")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("queryname".into(), "PRC_LMP".into()),
                Matcher::UrlEncoded("startdatetime".into(), "20200101T08:00-0000".into()),
                Matcher::UrlEncoded("enddatetime".into(), "20200102T08:00-0000".into()),
                Matcher::UrlEncoded("node".into(), "CAPTJACK_5_N003".into()),
            ]))
            .with_status(200)
            .with_header(
                "content-disposition",
                "inline; filename=20200101_20200102_PRC_LMP_DAM_20200102_00_00_00_v1.xml.zip;",
            )
            .with_body(make_zip(&[("error.xml", NO_DATA_XML)]))
            .create();

        let oasis = mock_oasis(&server);
        match oasis.request(&lmp_query(&oasis)) {
            Err(OasisError::NoDataAvailable { code, description }) => {
                assert_eq!(code.as_deref(), Some("1000"));
                assert_eq!(
                    description.as_deref(),
                    Some("No data returned for the specified selection")
                );
            }
            other => panic!("expected no data, got {:?}", other),
        }
        mock.assert();
    }

    #[test]
    fn test_request_without_disposition() -> Result<(), OasisError> {
        let mut server = Server::new();
        let body = make_zip(&[("report.csv", "A,B\n1,2\n")]);
        let mock = server
            .mock("GET", "/oasisapi/SingleZip")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.clone())
            .create();

        let oasis = mock_oasis(&server);
        let bytes = oasis.request(&lmp_query(&oasis))?;
        assert_eq!(bytes, body);
        mock.assert();
        Ok(())
    }

    #[test]
    fn test_request_server_error() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/oasisapi/SingleZip")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("<html>Service unavailable</html>")
            .create();

        let oasis = mock_oasis(&server);
        let res = oasis.request(&lmp_query(&oasis));
        assert!(matches!(res, Err(OasisError::Http(_))));
        mock.assert();
    }

    #[test]
    fn test_fetch() -> Result<(), OasisError> {
        let csv = "OPR_DT,OPR_HR,NODE,PRC
2020-01-01,10,CAPTJACK_5_N003,31.5
2020-01-01,2,CAPTJACK_5_N003,25.25
2020-01-01,1,CAPTJACK_5_N003,24.0
";
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/oasisapi/SingleZip")
            .match_query(Matcher::UrlEncoded("resultformat".into(), "6".into()))
            .with_status(200)
            .with_header(
                "content-disposition",
                "inline; filename=20200101_20200102_PRC_LMP_DAM_20200102_00_00_00_v1.csv.zip;",
            )
            .with_body(make_zip(&[("PRC_LMP_DAM.csv", csv)]))
            .create();

        let oasis = mock_oasis(&server);
        let options = TableOptions::new()
            .sort_by(&["OPR_DT", "OPR_HR"])
            .columns(&LMP_COLUMNS);
        let table = oasis.fetch(&lmp_query(&oasis), &options)?;
        assert_eq!(table.columns(), LMP_COLUMNS);
        assert_eq!(table.len(), 3);
        assert_eq!(table.column("OPR_HR")?, vec![Some("1"), Some("2"), Some("10")]);
        assert_eq!(table.column("MW")?, vec![Some("24.0"), Some("25.25"), Some("31.5")]);
        assert_eq!(table.get(0, "INTERVALSTARTTIME_GMT"), None);
        mock.assert();
        Ok(())
    }
}
