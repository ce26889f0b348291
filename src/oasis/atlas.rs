use jiff::civil::DateTime;
use log::info;

use super::{error::OasisError, table::Table, Oasis, OasisQuery, TableOptions, RESULT_FORMAT_CSV};

/// Reference data about the network, e.g. the list of pricing nodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Atlas;

impl Atlas {
    pub fn new() -> Atlas {
        Atlas
    }

    pub fn pnodes_query(
        &self,
        oasis: &Oasis,
        start: DateTime,
        end: DateTime,
    ) -> Result<OasisQuery, OasisError> {
        Ok(OasisQuery::new("ATL_PNODE")
            .param("startdatetime", oasis.utc_string(start)?)
            .param("enddatetime", oasis.utc_string(end)?)
            .param("Pnode_type", "ALL")
            .param("version", 1)
            .param("resultformat", RESULT_FORMAT_CSV))
    }

    /// Get the pricing nodes and aggregated pricing nodes that existed between
    /// `start` and `end`.  The report columns are kept as is.
    pub fn get_pnodes(
        &self,
        oasis: &Oasis,
        start: DateTime,
        end: DateTime,
    ) -> Result<Table, OasisError> {
        oasis.validate_date_range(start, end)?;
        info!("getting the pricing nodes from {} to {}", start, end);
        let query = self.pnodes_query(oasis, start, end)?;
        oasis.fetch(&query, &TableOptions::new())
    }
}
