//! External data providers. Each provider degrades to documented defaults on
//! failure; a provider outage never fails a forecast request on its own.

pub mod energy;
pub mod location;
pub mod narrative;
pub mod weather;

pub use energy::{EiaEnergyClient, EnergyPriceProvider};
pub use location::{CensusLocationClient, LocationProvider};
pub use narrative::{AnthropicClient, NarrativeProvider, NarrativeStream};
pub use weather::{ClimateProvider, OpenWeatherClient};
