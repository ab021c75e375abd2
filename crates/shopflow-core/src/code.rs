//! Diagnostic trouble code parsing and classification.
//!
//! A trouble code is a five-character identifier reported by a vehicle's
//! onboard computer: one family letter (`P`, `B`, `U`, `C`) followed by
//! four digits, e.g. `P0302`. The family letter is a coarse subsystem
//! signal used during domain classification.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Coarse subsystem family derived from a trouble code's first letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeFamily {
    /// P-codes: engine, fuel, emissions, transmission.
    Powertrain,
    /// B-codes: body electrical, airbags, HVAC.
    Body,
    /// U-codes: module communication networks.
    Network,
    /// C-codes: brakes, steering, suspension.
    Chassis,
}

/// A validated diagnostic trouble code, stored uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TroubleCode(String);

impl TroubleCode {
    /// Parses a single trouble code token, case-insensitive.
    ///
    /// Returns `None` for anything that is not exactly a family letter
    /// followed by four digits. Malformed code text is never an error
    /// condition for the controller; it is simply ignored.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.len() != 5 {
            return None;
        }
        let mut chars = token.chars();
        let family = chars.next()?;
        if !matches!(family.to_ascii_uppercase(), 'P' | 'B' | 'U' | 'C') {
            return None;
        }
        if !chars.all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self(token.to_ascii_uppercase()))
    }

    /// Returns the code as text, e.g. `"P0302"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Subsystem family from the leading letter.
    pub fn family(&self) -> CodeFamily {
        match self.0.as_bytes()[0] {
            b'P' => CodeFamily::Powertrain,
            b'B' => CodeFamily::Body,
            b'U' => CodeFamily::Network,
            _ => CodeFamily::Chassis,
        }
    }

    /// Numeric portion of the code.
    pub fn number(&self) -> u16 {
        self.0[1..].parse().unwrap_or(0)
    }

    /// True for the P0300..P0312 misfire range.
    pub fn is_misfire(&self) -> bool {
        self.family() == CodeFamily::Powertrain && (300..=312).contains(&self.number())
    }

    /// Cylinder number for single-cylinder misfire codes.
    ///
    /// `P0301`..`P0312` name the cylinder directly; `P0300` (random or
    /// multiple misfire) carries no cylinder and returns `None`.
    pub fn misfire_cylinder(&self) -> Option<u8> {
        if !self.is_misfire() {
            return None;
        }
        match self.number() - 300 {
            0 => None,
            n => Some(n as u8),
        }
    }

    /// True for the EVAP leak/system code range (P0440..P0457).
    pub fn is_evap(&self) -> bool {
        self.family() == CodeFamily::Powertrain && (440..=457).contains(&self.number())
    }

    /// True for lean-condition codes (P0171 bank 1, P0174 bank 2).
    pub fn is_lean(&self) -> bool {
        self.family() == CodeFamily::Powertrain && matches!(self.number(), 171 | 174)
    }
}

impl std::fmt::Display for TroubleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts every trouble code from free text.
///
/// Matching is case-insensitive. The result is deduplicated while
/// preserving first-seen order, which is what feeds the session's
/// `active_codes` set.
pub fn extract_codes(text: &str) -> Vec<TroubleCode> {
    static PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b[PBUC][0-9]{4}\b").expect("trouble code pattern is valid")
    });

    let mut found = Vec::new();
    for m in PATTERN.find_iter(text) {
        if let Some(code) = TroubleCode::parse(m.as_str()) {
            if !found.contains(&code) {
                found.push(code);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_code() {
        let code = TroubleCode::parse("p0302").unwrap();
        assert_eq!(code.as_str(), "P0302");
        assert_eq!(code.family(), CodeFamily::Powertrain);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TroubleCode::parse("X0302").is_none());
        assert!(TroubleCode::parse("P030").is_none());
        assert!(TroubleCode::parse("P03022").is_none());
        assert!(TroubleCode::parse("P030a").is_none());
    }

    #[test]
    fn test_family_mapping() {
        assert_eq!(
            TroubleCode::parse("U0100").unwrap().family(),
            CodeFamily::Network
        );
        assert_eq!(
            TroubleCode::parse("C1234").unwrap().family(),
            CodeFamily::Chassis
        );
        assert_eq!(
            TroubleCode::parse("B1342").unwrap().family(),
            CodeFamily::Body
        );
    }

    #[test]
    fn test_misfire_cylinder() {
        assert_eq!(
            TroubleCode::parse("P0302").unwrap().misfire_cylinder(),
            Some(2)
        );
        assert_eq!(TroubleCode::parse("P0300").unwrap().misfire_cylinder(), None);
        assert!(TroubleCode::parse("P0300").unwrap().is_misfire());
        assert!(!TroubleCode::parse("P0420").unwrap().is_misfire());
    }

    #[test]
    fn test_extract_codes_dedup_in_order() {
        let codes = extract_codes("Got p0302 and P0171, then P0302 again");
        let text: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(text, vec!["P0302", "P0171"]);
    }

    #[test]
    fn test_extract_ignores_embedded_tokens() {
        assert!(extract_codes("part number XP03021 should not match").is_empty());
        assert!(extract_codes("no codes here").is_empty());
    }
}
