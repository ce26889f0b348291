use std::{fmt, str::FromStr};

use jiff::{civil::Date, civil::DateTime, Timestamp, ToSpan};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    de::deserialize_gmt_timestamp,
    error::OasisError,
    table::{Table, LMP_COLUMNS},
    Oasis, OasisQuery, TableOptions, RESULT_FORMAT_CSV,
};
use crate::interval::month::Month;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Market {
    /// Day-ahead market
    #[default]
    Dam,
    /// Real-time market, 5 minute intervals
    Rtm,
    /// Real-time pre-dispatch, 15 minute intervals
    Rtpd,
}

impl Market {
    /// The OASIS report with the prices for this market.
    pub fn query_name(&self) -> &'static str {
        match self {
            Market::Dam => "PRC_LMP",
            Market::Rtm => "PRC_INTVL_LMP",
            Market::Rtpd => "PRC_RTPD_LMP",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Dam => write!(f, "DAM"),
            Market::Rtm => write!(f, "RTM"),
            Market::Rtpd => write!(f, "RTPD"),
        }
    }
}

impl FromStr for Market {
    type Err = OasisError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAM" => Ok(Market::Dam),
            "RTM" => Ok(Market::Rtm),
            "RTPD" => Ok(Market::Rtpd),
            _ => Err(OasisError::InvalidMarket(s.to_string())),
        }
    }
}

/// A CAISO pricing node, e.g. `TH_SP15_GEN-APND`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub node: String,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node(node='{}')", self.node)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Node {
    pub fn new<S: Into<String>>(node: S) -> Node {
        Node { node: node.into() }
    }

    /// SP15 trading hub
    pub fn sp15() -> Node {
        Node::new("TH_SP15_GEN-APND")
    }

    /// NP15 trading hub
    pub fn np15() -> Node {
        Node::new("TH_NP15_GEN-APND")
    }

    /// ZP26 trading hub
    pub fn zp26() -> Node {
        Node::new("TH_ZP26_GEN-APND")
    }

    /// Southern California Edison default load aggregation point
    pub fn sce_dlap() -> Node {
        Node::new("DLAP_SCE-APND")
    }

    /// Pacific Gas & Electric default load aggregation point
    pub fn pgae_dlap() -> Node {
        Node::new("DLAP_PGAE-APND")
    }

    /// San Diego Gas & Electric default load aggregation point
    pub fn sdge_dlap() -> Node {
        Node::new("DLAP_SDGE-APND")
    }

    pub fn lmp_query(
        &self,
        oasis: &Oasis,
        start: DateTime,
        end: DateTime,
        market: Market,
    ) -> Result<OasisQuery, OasisError> {
        Ok(OasisQuery::new(market.query_name())
            .param("market_run_id", market)
            .param("startdatetime", oasis.utc_string(start)?)
            .param("enddatetime", oasis.utc_string(end)?)
            .param("version", 1)
            .param("node", &self.node)
            .param("resultformat", RESULT_FORMAT_CSV))
    }

    /// Get the locational marginal prices between `start` (inclusive) and
    /// `end` (exclusive).  If `end` is `None`, get one day of prices.
    ///
    /// Rows are sorted by operating date and hour.
    pub fn get_lmps(
        &self,
        oasis: &Oasis,
        start: DateTime,
        end: Option<DateTime>,
        market: Market,
    ) -> Result<Table, OasisError> {
        let end = match end {
            Some(end) => end,
            None => start.checked_add(1.day())?,
        };
        oasis.validate_date_range(start, end)?;
        info!("getting {} lmps for {} from {} to {}", market, self.node, start, end);

        let query = self.lmp_query(oasis, start, end, market)?;
        let options = TableOptions::new()
            .sort_by(&["OPR_DT", "OPR_HR"])
            .columns(&LMP_COLUMNS);
        oasis.fetch(&query, &options)
    }

    /// Get the day-ahead prices for a whole month.
    pub fn get_month_lmps(&self, oasis: &Oasis, year: i16, month: i8) -> Result<Table, OasisError> {
        let month = Month::new(year, month)?;
        let start = month.start_date().at(0, 0, 0, 0);
        let end = month.end_date()?.at(0, 0, 0, 0);
        self.get_lmps(oasis, start, Some(end), Market::Dam)
    }
}

/// One row of a price report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LmpRecord {
    #[serde(
        rename = "INTERVALSTARTTIME_GMT",
        deserialize_with = "deserialize_gmt_timestamp"
    )]
    pub interval_start: Timestamp,
    #[serde(
        rename = "INTERVALENDTIME_GMT",
        deserialize_with = "deserialize_gmt_timestamp"
    )]
    pub interval_end: Timestamp,
    #[serde(rename = "OPR_DT")]
    pub opr_date: Date,
    #[serde(rename = "OPR_HR")]
    pub opr_hour: u8,
    #[serde(rename = "OPR_INTERVAL")]
    pub opr_interval: Option<u8>,
    #[serde(rename = "NODE")]
    pub node: String,
    #[serde(rename = "MARKET_RUN_ID")]
    pub market_run_id: String,
    /// One of LMP, MCE, MCC, MCL, MGHG
    #[serde(rename = "LMP_TYPE")]
    pub lmp_type: String,
    #[serde(rename = "MW")]
    pub price: Decimal,
}

impl LmpRecord {
    pub fn from_table(table: &Table) -> Result<Vec<LmpRecord>, OasisError> {
        table.records()
    }
}
