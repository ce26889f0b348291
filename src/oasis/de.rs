use std::fmt;

use jiff::{fmt::strtime, Timestamp};
use serde::{
    de::{self, Visitor},
    Deserializer,
};

/// OASIS reports interval boundaries as `2020-01-01T08:00:00-00:00`.
pub fn deserialize_gmt_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    struct GmtVisitor;

    impl Visitor<'_> for GmtVisitor {
        type Value = Timestamp;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a timestamp string with an offset, e.g. 2020-01-01T08:00:00-00:00")
        }

        fn visit_str<E>(self, v: &str) -> Result<Timestamp, E>
        where
            E: de::Error,
        {
            strtime::parse("%Y-%m-%dT%H:%M:%S%:z", v)
                .and_then(|tm| tm.to_timestamp())
                .map_err(E::custom)
        }
    }

    deserializer.deserialize_str(GmtVisitor)
}
