use jiff::civil::DateTime;
use log::info;

use super::{
    error::OasisError, table::Table, validate_date_order, Oasis, OasisQuery, TableOptions,
    RESULT_FORMAT_CSV,
};

/// System load forecasts.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemDemand;

impl SystemDemand {
    pub fn new() -> SystemDemand {
        SystemDemand
    }

    fn forecast_query(
        &self,
        oasis: &Oasis,
        query_name: &str,
        start: DateTime,
        end: DateTime,
    ) -> Result<OasisQuery, OasisError> {
        Ok(oasis
            .query(query_name, start, end)?
            .param("resultformat", RESULT_FORMAT_CSV))
    }

    fn get_forecast(
        &self,
        oasis: &Oasis,
        query_name: &str,
        start: DateTime,
        end: DateTime,
    ) -> Result<Table, OasisError> {
        validate_date_order(start, end)?;
        info!("getting {} from {} to {}", query_name, start, end);
        let query = self.forecast_query(oasis, query_name, start, end)?;
        oasis.fetch(&query, &TableOptions::new())
    }

    /// Get the daily peak demand forecast between `start` and `end`.
    pub fn get_peak_demand_forecast(
        &self,
        oasis: &Oasis,
        start: DateTime,
        end: DateTime,
    ) -> Result<Table, OasisError> {
        self.get_forecast(oasis, "SLD_FCST_PEAK", start, end)
    }

    /// Get the demand forecast between `start` and `end`.
    pub fn get_demand_forecast(
        &self,
        oasis: &Oasis,
        start: DateTime,
        end: DateTime,
    ) -> Result<Table, OasisError> {
        self.get_forecast(oasis, "SLD_FCST", start, end)
    }
}
