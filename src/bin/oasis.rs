use std::{error::Error, io, path::Path};

use caiso_oasis::{
    interval::month::Month,
    oasis::{atlas::Atlas, node::Market, node::Node, system_demand::SystemDemand, table::Table, Oasis},
};
use clap::{Parser, Subcommand, ValueEnum};
use jiff::civil::DateTime;
use log::{info, warn};
use tabled::{builder::Builder, settings::Style};

#[derive(Parser, Debug)]
#[command(version, about = "Download CAISO OASIS reports", long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod.  Loads .env/{env}.env if it exists
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
    Table,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locational marginal prices for one node
    Lmps {
        #[arg(short, long)]
        node: String,
        /// Start datetime, e.g. 2024-01-01 or 2024-01-01T06:00, inclusive
        #[arg(short, long)]
        start: DateTime,
        /// End datetime, exclusive.  Defaults to one day after start
        #[arg(long)]
        end: Option<DateTime>,
        /// One of DAM, RTM, RTPD
        #[arg(short, long, default_value = "DAM")]
        market: Market,
    },
    /// Day-ahead prices for one node for a whole month
    MonthLmps {
        #[arg(short, long)]
        node: String,
        /// Month, e.g. 2024-01
        #[arg(short, long)]
        month: Month,
    },
    /// List of pricing nodes
    Pnodes {
        #[arg(short, long)]
        start: DateTime,
        #[arg(long)]
        end: DateTime,
    },
    /// System demand forecast
    DemandForecast {
        #[arg(short, long)]
        start: DateTime,
        #[arg(long)]
        end: DateTime,
        /// Get the daily peak forecast instead
        #[arg(long)]
        peak: bool,
    },
}

fn print_table(table: &Table, format: Format) -> Result<(), Box<dyn Error>> {
    match format {
        Format::Csv => table.write_csv(io::stdout().lock())?,
        Format::Json => println!("{}", serde_json::to_string_pretty(table)?),
        Format::Table => {
            let mut builder = Builder::default();
            builder.push_record(table.columns().iter().map(|e| e.as_str()));
            for row in table.rows() {
                builder.push_record(row.iter().map(|e| e.as_deref().unwrap_or("")));
            }
            let mut tbl = builder.build();
            tbl.with(Style::modern());
            println!("{}", tbl);
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if let Err(e) = dotenvy::from_path(Path::new(&env_file)) {
        warn!("Not loading {}: {}", env_file, e);
    }

    let oasis = Oasis::from_env()?;
    let table = match args.command {
        Command::Lmps {
            node,
            start,
            end,
            market,
        } => Node::new(node).get_lmps(&oasis, start, end, market)?,
        Command::MonthLmps { node, month } => {
            Node::new(node).get_month_lmps(&oasis, month.year(), month.month())?
        }
        Command::Pnodes { start, end } => Atlas::new().get_pnodes(&oasis, start, end)?,
        Command::DemandForecast { start, end, peak } => {
            let demand = SystemDemand::new();
            if peak {
                demand.get_peak_demand_forecast(&oasis, start, end)?
            } else {
                demand.get_demand_forecast(&oasis, start, end)?
            }
        }
    };
    info!("got {} rows", table.len());
    print_table(&table, args.format)?;

    Ok(())
}
