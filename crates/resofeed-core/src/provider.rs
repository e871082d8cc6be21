//! Static per-provider admission tuning.
//!
//! The large multiple-listing feeds publish per-minute request quotas; a
//! recognized base URL implies a default admission configuration even when
//! the caller supplied none.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::admission::AdmissionConfig;

/// Feed providers with known rate quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownProvider {
    Spark,
    Bridge,
    MlsGrid,
    Trestle,
}

impl KnownProvider {
    /// Detects a provider from the base URL.
    pub fn from_base_url(base_url: &str) -> Option<Self> {
        if base_url.contains("api.mlsgrid.com") {
            Some(Self::MlsGrid)
        } else if base_url.contains("api.bridgedataoutput.com") {
            Some(Self::Bridge)
        } else if base_url.contains("sparkapi.com") {
            Some(Self::Spark)
        } else if base_url.contains("api-trestle.corelogic.com") {
            Some(Self::Trestle)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spark => "spark",
            Self::Bridge => "bridge",
            Self::MlsGrid => "mlsgrid",
            Self::Trestle => "trestle",
        }
    }

    /// Published per-minute admission quota for this provider.
    pub const fn admission_config(self) -> AdmissionConfig {
        let points = match self {
            Self::Spark => 300,
            Self::Bridge => 334,
            Self::MlsGrid => 120,
            Self::Trestle => 100,
        };

        AdmissionConfig {
            duration: Duration::from_secs(60),
            points,
        }
    }
}

impl Display for KnownProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_feed_hosts() {
        assert_eq!(
            KnownProvider::from_base_url("https://replication.sparkapi.com/Reso/OData"),
            Some(KnownProvider::Spark)
        );
        assert_eq!(
            KnownProvider::from_base_url("https://api.bridgedataoutput.com/api/v2/OData"),
            Some(KnownProvider::Bridge)
        );
        assert_eq!(
            KnownProvider::from_base_url("https://api.mlsgrid.com/v2"),
            Some(KnownProvider::MlsGrid)
        );
        assert_eq!(
            KnownProvider::from_base_url("https://api-trestle.corelogic.com/trestle/odata"),
            Some(KnownProvider::Trestle)
        );
        assert_eq!(
            KnownProvider::from_base_url("https://my-reso-api.test/odata"),
            None
        );
    }

    #[test]
    fn tuning_table_matches_published_quotas() {
        assert_eq!(KnownProvider::Spark.admission_config().points, 300);
        assert_eq!(KnownProvider::Bridge.admission_config().points, 334);
        assert_eq!(KnownProvider::MlsGrid.admission_config().points, 120);
        assert_eq!(KnownProvider::Trestle.admission_config().points, 100);

        for provider in [
            KnownProvider::Spark,
            KnownProvider::Bridge,
            KnownProvider::MlsGrid,
            KnownProvider::Trestle,
        ] {
            assert_eq!(
                provider.admission_config().duration,
                Duration::from_secs(60)
            );
        }
    }
}
