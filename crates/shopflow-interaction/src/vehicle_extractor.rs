//! Free-text vehicle attribute extraction and VIN decoding.
//!
//! The extractor pulls year/make/model/engine out of user prose with
//! regex and a known-make table; a 17-character VIN, when present, is
//! routed through the [`VinDecoder`] capability and its result merged
//! first. Unrecognized text yields an empty record, never an error.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use shopflow_core::error::Result;
use shopflow_core::vehicle::{Vehicle, VehicleExtractor, VinDecoder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19[5-9][0-9]|20[0-4][0-9])\b").expect("year pattern is valid"));

static ENGINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-9]\.[0-9])\s*(l|liter|litre|t|turbo)?\b").expect("engine pattern is valid")
});

// VINs never use I, O, or Q.
static VIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-HJ-NPR-Z0-9]{17}\b").expect("VIN pattern is valid"));

/// Alias to canonical make, lowercased alias first.
const MAKES: &[(&str, &str)] = &[
    ("chevy", "Chevrolet"),
    ("chevrolet", "Chevrolet"),
    ("gmc", "GMC"),
    ("cadillac", "Cadillac"),
    ("ford", "Ford"),
    ("lincoln", "Lincoln"),
    ("dodge", "Dodge"),
    ("ram", "Ram"),
    ("chrysler", "Chrysler"),
    ("jeep", "Jeep"),
    ("toyota", "Toyota"),
    ("lexus", "Lexus"),
    ("honda", "Honda"),
    ("acura", "Acura"),
    ("nissan", "Nissan"),
    ("infiniti", "Infiniti"),
    ("subaru", "Subaru"),
    ("mazda", "Mazda"),
    ("hyundai", "Hyundai"),
    ("kia", "Kia"),
    ("volkswagen", "Volkswagen"),
    ("vw", "Volkswagen"),
    ("audi", "Audi"),
    ("bmw", "BMW"),
    ("mercedes", "Mercedes-Benz"),
    ("volvo", "Volvo"),
];

/// Regex/table-driven implementation of the vehicle extraction capability.
pub struct RegexVehicleExtractor {
    vin_decoder: Option<Arc<dyn VinDecoder>>,
}

impl RegexVehicleExtractor {
    pub fn new() -> Self {
        Self { vin_decoder: None }
    }

    /// Attaches a VIN decoder so embedded VINs resolve to full records.
    pub fn with_vin_decoder(decoder: Arc<dyn VinDecoder>) -> Self {
        Self {
            vin_decoder: Some(decoder),
        }
    }

    fn extract_from_text(text: &str) -> Vehicle {
        let mut vehicle = Vehicle::default();

        if let Some(m) = YEAR_PATTERN.find(text) {
            vehicle.year = m.as_str().parse().ok();
        }

        // Tokenize once and match makes per token. Lowercasing happens per
        // token so offsets into the original text are never needed
        // (lowercasing can change byte lengths for non-ASCII input).
        let tokens: Vec<&str> = text.split_whitespace().map(trim_token).collect();
        let mut make_index = None;
        'makes: for (index, token) in tokens.iter().enumerate() {
            let word = token.to_lowercase();
            for (alias, canonical) in MAKES {
                if word == *alias {
                    vehicle.make = Some((*canonical).to_string());
                    make_index = Some(index);
                    break 'makes;
                }
            }
        }

        // Model: the first token after the make that is not a year or an
        // engine size. Good enough for prose like "2018 Ford F-150 5.0L".
        if let Some(index) = make_index {
            for token in &tokens[index + 1..] {
                if token.is_empty()
                    || YEAR_PATTERN.is_match(token)
                    || ENGINE_PATTERN.is_match(token)
                {
                    continue;
                }
                vehicle.model = Some((*token).to_string());
                break;
            }
        }

        if let Some(caps) = ENGINE_PATTERN.captures(text) {
            let displacement = &caps[1];
            let suffix = caps
                .get(2)
                .map(|m| m.as_str().to_lowercase())
                .unwrap_or_default();
            let engine = if suffix.starts_with('t') {
                format!("{}T", displacement)
            } else {
                format!("{}L", displacement)
            };
            vehicle.engine = Some(engine);
        }

        vehicle
    }
}

impl Default for RegexVehicleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-')
}

#[async_trait]
impl VehicleExtractor for RegexVehicleExtractor {
    async fn extract(&self, text: &str) -> Result<Vehicle> {
        let mut vehicle = Vehicle::default();

        // VIN first: decoded attributes outrank guesses from prose.
        if let (Some(decoder), Some(vin)) = (&self.vin_decoder, VIN_PATTERN.find(text)) {
            match decoder.decode(vin.as_str()).await {
                Ok(Some(decoded)) => vehicle.merge(&decoded),
                Ok(None) => {
                    tracing::debug!(vin = vin.as_str(), "VIN not known to decoder");
                }
                Err(e) => {
                    // Extraction must stay best-effort.
                    tracing::warn!(error = %e, "VIN decode failed, falling back to text");
                }
            }
        }

        vehicle.merge(&Self::extract_from_text(text));
        Ok(vehicle)
    }
}

/// In-memory VIN decoder with interior caching.
///
/// Stands in for the external VIN service and its persistent cache; the
/// controller only sees the [`VinDecoder`] trait.
#[derive(Default)]
pub struct MemoryVinDecoder {
    entries: RwLock<HashMap<String, Vehicle>>,
}

impl MemoryVinDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a VIN -> vehicle mapping.
    pub async fn insert(&self, vin: impl Into<String>, vehicle: Vehicle) {
        self.entries.write().await.insert(vin.into(), vehicle);
    }
}

#[async_trait]
impl VinDecoder for MemoryVinDecoder {
    async fn decode(&self, vin: &str) -> Result<Option<Vehicle>> {
        Ok(self.entries.read().await.get(vin).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extracts_full_record_from_prose() {
        let extractor = RegexVehicleExtractor::new();
        let vehicle = extractor
            .extract("P0302 misfire on my 2018 Ford F-150 5.0L")
            .await
            .unwrap();

        assert_eq!(vehicle.year, Some(2018));
        assert_eq!(vehicle.make.as_deref(), Some("Ford"));
        assert_eq!(vehicle.model.as_deref(), Some("F-150"));
        assert_eq!(vehicle.engine.as_deref(), Some("5.0L"));
        assert!(vehicle.is_complete());
    }

    #[tokio::test]
    async fn test_make_alias_resolves() {
        let extractor = RegexVehicleExtractor::new();
        let vehicle = extractor.extract("it's a 2016 chevy silverado 5.3l").await.unwrap();
        assert_eq!(vehicle.make.as_deref(), Some("Chevrolet"));
        assert_eq!(vehicle.model.as_deref(), Some("silverado"));
    }

    #[tokio::test]
    async fn test_unrecognized_text_yields_empty_record() {
        let extractor = RegexVehicleExtractor::new();
        let vehicle = extractor.extract("the car is making a noise").await.unwrap();
        assert_eq!(vehicle, Vehicle::default());
    }

    #[tokio::test]
    async fn test_vin_decoding_outranks_prose() {
        let decoder = Arc::new(MemoryVinDecoder::new());
        decoder
            .insert(
                "1FTEW1EG5JFA12345",
                Vehicle {
                    year: Some(2018),
                    make: Some("Ford".to_string()),
                    model: Some("F-150".to_string()),
                    engine: Some("3.5L".to_string()),
                },
            )
            .await;

        let extractor = RegexVehicleExtractor::with_vin_decoder(decoder);
        let vehicle = extractor
            .extract("VIN is 1FTEW1EG5JFA12345, I think it's a 5.0L")
            .await
            .unwrap();

        // Decoded engine wins over the prose guess.
        assert_eq!(vehicle.engine.as_deref(), Some("3.5L"));
    }

    #[tokio::test]
    async fn test_non_ascii_text_before_make() {
        let extractor = RegexVehicleExtractor::new();

        // Characters whose lowercase form changes byte length (e.g. 'İ')
        // must not shift the make/model scan.
        let vehicle = extractor.extract("İ my car is a ford").await.unwrap();
        assert_eq!(vehicle.make.as_deref(), Some("Ford"));
        assert_eq!(vehicle.model, None);

        let vehicle = extractor
            .extract("İstanbul-plated 2016 chevy silverado 5.3l")
            .await
            .unwrap();
        assert_eq!(vehicle.make.as_deref(), Some("Chevrolet"));
        assert_eq!(vehicle.model.as_deref(), Some("silverado"));
        assert_eq!(vehicle.engine.as_deref(), Some("5.3L"));
    }

    #[tokio::test]
    async fn test_turbo_engine_suffix() {
        let extractor = RegexVehicleExtractor::new();
        let vehicle = extractor.extract("2015 Volkswagen GTI 2.0T").await.unwrap();
        assert_eq!(vehicle.engine.as_deref(), Some("2.0T"));
    }
}
