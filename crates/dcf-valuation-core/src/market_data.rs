//! Risk-free rate sourcing.
//!
//! The valuation engine only ever sees a single risk-free percentage per
//! jurisdiction. Where that number comes from (a live bond-yield lookup or
//! the static fallback table below) is hidden behind [`RiskFreeRateSource`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::types::{Currency, Rate};
use crate::valuation::wacc::risk_free_rate_from_percent;
use crate::DcfResult;

/// Rate used for jurisdictions without a table entry.
const DEFAULT_RATE_PCT: Decimal = dec!(6.0);

/// Jurisdiction of the company being valued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    India,
    USA,
    UK,
    Germany,
    France,
    Other(String),
}

impl Country {
    pub fn currency(&self) -> Currency {
        match self {
            Country::India => Currency::INR,
            Country::USA => Currency::USD,
            Country::UK => Currency::GBP,
            Country::Germany | Country::France => Currency::EUR,
            Country::Other(_) => Currency::INR,
        }
    }
}

impl std::str::FromStr for Country {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "india" | "in" => Country::India,
            "usa" | "us" | "united states" => Country::USA,
            "uk" | "gb" | "united kingdom" => Country::UK,
            "germany" | "de" => Country::Germany,
            "france" | "fr" => Country::France,
            _ => Country::Other(s.trim().to_string()),
        })
    }
}

/// Anything able to quote a 10-year government bond yield, in percent.
pub trait RiskFreeRateSource {
    fn risk_free_rate_pct(&self, country: &Country) -> DcfResult<Decimal>;
}

/// Static per-country fallback yields (percent).
#[derive(Debug, Clone)]
pub struct StaticRiskFreeRates {
    rates: HashMap<Country, Decimal>,
    default_pct: Decimal,
}

impl Default for StaticRiskFreeRates {
    fn default() -> Self {
        let rates = HashMap::from([
            (Country::India, dec!(6.3)),
            (Country::USA, dec!(4.4)),
            (Country::UK, dec!(4.7)),
            (Country::Germany, dec!(2.4)),
            (Country::France, dec!(3.0)),
        ]);
        StaticRiskFreeRates {
            rates,
            default_pct: DEFAULT_RATE_PCT,
        }
    }
}

impl StaticRiskFreeRates {
    pub fn with_rate(mut self, country: Country, pct: Decimal) -> Self {
        self.rates.insert(country, pct);
        self
    }
}

impl RiskFreeRateSource for StaticRiskFreeRates {
    fn risk_free_rate_pct(&self, country: &Country) -> DcfResult<Decimal> {
        let pct = self.rates.get(country).copied().unwrap_or_else(|| {
            debug!(?country, default = %self.default_pct, "no fallback yield, using default");
            self.default_pct
        });
        Ok(pct)
    }
}

/// Look up the risk-free rate and convert it to a fraction, checking the
/// 0–20% domain.
pub fn resolve_risk_free_rate(
    source: &impl RiskFreeRateSource,
    country: &Country,
) -> DcfResult<Rate> {
    let pct = source.risk_free_rate_pct(country)?;
    risk_free_rate_from_percent(pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValuationError;

    struct FixedSource(Decimal);

    impl RiskFreeRateSource for FixedSource {
        fn risk_free_rate_pct(&self, _country: &Country) -> DcfResult<Decimal> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_fallback_table() {
        let src = StaticRiskFreeRates::default();
        assert_eq!(src.risk_free_rate_pct(&Country::USA).unwrap(), dec!(4.4));
        assert_eq!(src.risk_free_rate_pct(&Country::Germany).unwrap(), dec!(2.4));
        assert_eq!(
            src.risk_free_rate_pct(&Country::Other("Brazil".into())).unwrap(),
            dec!(6.0)
        );
    }

    #[test]
    fn test_override() {
        let src = StaticRiskFreeRates::default().with_rate(Country::India, dec!(6.85));
        assert_eq!(
            resolve_risk_free_rate(&src, &Country::India).unwrap(),
            dec!(0.0685)
        );
    }

    #[test]
    fn test_source_is_opaque() {
        // Same percentage from any source gives the same fraction.
        let live = FixedSource(dec!(4.4));
        let table = StaticRiskFreeRates::default();
        assert_eq!(
            resolve_risk_free_rate(&live, &Country::USA).unwrap(),
            resolve_risk_free_rate(&table, &Country::USA).unwrap()
        );
    }

    #[test]
    fn test_out_of_domain_rejected() {
        let err = resolve_risk_free_rate(&FixedSource(dec!(35)), &Country::USA).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidCapitalStructure(_)));
    }

    #[test]
    fn test_country_parsing() {
        assert_eq!("USA".parse::<Country>().unwrap(), Country::USA);
        assert_eq!("united kingdom".parse::<Country>().unwrap(), Country::UK);
        assert_eq!(
            "Japan".parse::<Country>().unwrap(),
            Country::Other("Japan".into())
        );
        assert_eq!(Country::France.currency(), Currency::EUR);
    }
}
