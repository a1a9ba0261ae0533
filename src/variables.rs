//! Physical variables, dataset families and native frequencies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Native temporal resolution of a source file or variable.
///
/// Ordered finest first, so the finest group of a dataset is its minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Hourly or any other whole-hour sub-daily step
    Hourly,
    Daily,
    Monthly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical quantity carried in a site table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetVariable {
    /// Air temperature (K)
    Tair,
    /// Daily maximum air temperature (K)
    Tmax,
    /// Daily minimum air temperature (K)
    Tmin,
    /// Precipitation flux (kg m-2 s-1)
    Precipf,
    /// Downwelling shortwave radiation (W m-2)
    Swdown,
    /// Downwelling longwave radiation (W m-2)
    Lwdown,
    /// Air pressure (Pa)
    Press,
    /// Specific humidity (kg kg-1)
    Qair,
    /// Eastward wind component (m s-1)
    Uas,
    /// Northward wind component (m s-1)
    Vas,
    /// Wind speed (m s-1)
    Wind,
}

impl MetVariable {
    pub const ALL: [MetVariable; 11] = [
        MetVariable::Tair,
        MetVariable::Tmax,
        MetVariable::Tmin,
        MetVariable::Precipf,
        MetVariable::Swdown,
        MetVariable::Lwdown,
        MetVariable::Press,
        MetVariable::Qair,
        MetVariable::Uas,
        MetVariable::Vas,
        MetVariable::Wind,
    ];

    /// Column header used in output tables
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Tair => "tair",
            Self::Tmax => "tmax",
            Self::Tmin => "tmin",
            Self::Precipf => "precipf",
            Self::Swdown => "swdown",
            Self::Lwdown => "lwdown",
            Self::Press => "press",
            Self::Qair => "qair",
            Self::Uas => "uas",
            Self::Vas => "vas",
            Self::Wind => "wind",
        }
    }
}

impl fmt::Display for MetVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Kind of archive a dataset comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFamily {
    /// Hourly or sub-daily reanalysis, one file per year carrying every variable
    Reanalysis,
    /// CMIP-style model output, one variable per file, daily or monthly
    ClimateModel,
}

impl DatasetFamily {
    /// Fixed output columns of an assembled site table
    #[must_use]
    pub const fn output_columns(self) -> &'static [MetVariable] {
        match self {
            Self::Reanalysis => &[
                MetVariable::Tair,
                MetVariable::Precipf,
                MetVariable::Swdown,
                MetVariable::Lwdown,
                MetVariable::Press,
                MetVariable::Qair,
                MetVariable::Wind,
            ],
            Self::ClimateModel => &[
                MetVariable::Tmax,
                MetVariable::Tmin,
                MetVariable::Precipf,
                MetVariable::Swdown,
                MetVariable::Lwdown,
                MetVariable::Press,
                MetVariable::Qair,
                MetVariable::Wind,
            ],
        }
    }

    /// Source variable names in the archives of this family
    #[must_use]
    pub fn default_sources(self) -> BTreeMap<MetVariable, String> {
        let pairs: &[(MetVariable, &str)] = match self {
            Self::Reanalysis => &[
                (MetVariable::Tair, "tair"),
                (MetVariable::Precipf, "precipf"),
                (MetVariable::Swdown, "swdown"),
                (MetVariable::Lwdown, "lwdown"),
                (MetVariable::Press, "psurf"),
                (MetVariable::Qair, "qair"),
                (MetVariable::Wind, "wind"),
            ],
            Self::ClimateModel => &[
                (MetVariable::Tmax, "tasmax"),
                (MetVariable::Tmin, "tasmin"),
                (MetVariable::Precipf, "pr"),
                (MetVariable::Swdown, "rsds"),
                (MetVariable::Lwdown, "rlds"),
                (MetVariable::Press, "psl"),
                (MetVariable::Qair, "huss"),
                (MetVariable::Uas, "uas"),
                (MetVariable::Vas, "vas"),
            ],
        };
        pairs.iter().map(|(v, s)| (*v, (*s).to_string())).collect()
    }
}

impl fmt::Display for DatasetFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reanalysis => f.write_str("reanalysis"),
            Self::ClimateModel => f.write_str("climate_model"),
        }
    }
}
