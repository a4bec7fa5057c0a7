use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Plumber,
    Electrician,
    Furniture,
    Handyman,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Plumber,
        Service::Electrician,
        Service::Furniture,
        Service::Handyman,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Plumber => "plumber",
            Service::Electrician => "electrician",
            Service::Furniture => "furniture",
            Service::Handyman => "handyman",
        }
    }

    /// Get the display name for this service.
    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Plumber => "Plumber",
            Service::Electrician => "Electrician",
            Service::Furniture => "Furniture assembly",
            Service::Handyman => "Handyman",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Service::ALL
            .into_iter()
            .find(|service| service.as_str() == lower)
            .ok_or_else(|| ApiError::InvalidQuery(format!("unknown service: {}", s)))
    }
}

/// A master returned by the search API. Distance is computed server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Master {
    pub name: String,
    pub rating: f64,
    pub jobs: u32,
    pub price_from: u32,
    #[serde(default)]
    pub tagline: String,
    pub phone: String,
    pub distance_km: f64,
}

impl Master {
    pub fn summary_line(&self) -> String {
        format!(
            "{:.1} stars, {} jobs, ~{:.1} km, from {}",
            self.rating, self.jobs, self.distance_km, self.price_from
        )
    }

    pub fn tel_uri(&self) -> String {
        format!("tel:{}", self.phone)
    }

    pub fn sms_uri(&self) -> String {
        format!("sms:{}", self.phone)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MastersResponse {
    #[serde(default)]
    pub items: Vec<Master>,
}
