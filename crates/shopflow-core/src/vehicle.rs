//! Vehicle context model and the capability seams that supply it.
//!
//! The controller never extracts vehicle attributes itself; it merges
//! records produced by external collaborators (a free-text extractor and a
//! VIN decoder) and gates diagnostics on the record being complete.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Year, make, model and engine for the vehicle under diagnosis.
///
/// All fields are optional; empty means "not yet known". The record is
/// read-only to the core except for [`Vehicle::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
}

impl Vehicle {
    /// True when every field is present.
    ///
    /// Diagnostics are withheld entirely while this is false and a trouble
    /// code is active.
    pub fn is_complete(&self) -> bool {
        self.year.is_some() && self.make.is_some() && self.model.is_some() && self.engine.is_some()
    }

    /// Fills empty fields from `other` without overwriting known ones.
    ///
    /// Merge order therefore decides precedence: earlier-established
    /// attributes always win.
    pub fn merge(&mut self, other: &Vehicle) {
        if self.year.is_none() {
            self.year = other.year;
        }
        if self.make.is_none() {
            self.make = other.make.clone();
        }
        if self.model.is_none() {
            self.model = other.model.clone();
        }
        if self.engine.is_none() {
            self.engine = other.engine.clone();
        }
    }

    /// Short display form, e.g. `"2018 Ford F-150 5.0L"`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if let Some(make) = &self.make {
            parts.push(make.clone());
        }
        if let Some(model) = &self.model {
            parts.push(model.clone());
        }
        if let Some(engine) = &self.engine {
            parts.push(engine.clone());
        }
        parts.join(" ")
    }
}

/// Capability: pulls partial vehicle attributes out of free text.
///
/// Implementations live outside the core. Failure to recognize anything is
/// not an error; an empty record is returned instead.
#[async_trait]
pub trait VehicleExtractor: Send + Sync {
    /// Extracts whatever year/make/model/engine attributes the text carries.
    async fn extract(&self, text: &str) -> Result<Vehicle>;
}

/// Capability: resolves a 17-character VIN to a vehicle record.
///
/// Implementations are expected to cache lookups; the controller calls
/// this once per VIN sighting and merges the result.
#[async_trait]
pub trait VinDecoder: Send + Sync {
    /// Decodes a VIN. `Ok(None)` means the VIN is unknown to the decoder.
    async fn decode(&self, vin: &str) -> Result<Option<Vehicle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_vehicle() -> Vehicle {
        Vehicle {
            year: Some(2018),
            make: Some("Ford".to_string()),
            model: Some("F-150".to_string()),
            engine: Some("5.0L".to_string()),
        }
    }

    #[test]
    fn test_is_complete() {
        assert!(full_vehicle().is_complete());
        let mut v = full_vehicle();
        v.engine = None;
        assert!(!v.is_complete());
        assert!(!Vehicle::default().is_complete());
    }

    #[test]
    fn test_merge_does_not_overwrite() {
        let mut v = Vehicle {
            make: Some("Toyota".to_string()),
            ..Default::default()
        };
        v.merge(&full_vehicle());
        assert_eq!(v.make.as_deref(), Some("Toyota"));
        assert_eq!(v.model.as_deref(), Some("F-150"));
        assert_eq!(v.year, Some(2018));
    }

    #[test]
    fn test_describe() {
        assert_eq!(full_vehicle().describe(), "2018 Ford F-150 5.0L");
        assert_eq!(Vehicle::default().describe(), "");
    }
}
