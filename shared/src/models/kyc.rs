//! Seller KYC Model
//!
//! Identifiers are never stored in clear: only a salted hash and the last
//! four characters leave the submission handler.

use super::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KycKind {
    Pan,
    Aadhaar,
    Bank,
}

impl KycKind {
    pub const ALL: [KycKind; 3] = [KycKind::Pan, KycKind::Aadhaar, KycKind::Bank];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pan => "pan",
            Self::Aadhaar => "aadhaar",
            Self::Bank => "bank",
        }
    }
}

impl fmt::Display for KycKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KycKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pan" => Ok(Self::Pan),
            "aadhaar" => Ok(Self::Aadhaar),
            "bank" => Ok(Self::Bank),
            other => Err(ParseEnumError::new("kyc kind", other)),
        }
    }
}

/// Public view of a KYC submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KycRecord {
    pub seller_id: i64,
    pub kind: KycKind,
    pub holder_name: String,
    pub identifier_last4: String,
    pub ifsc_code: Option<String>,
    pub verified: bool,
    pub submitted_at: i64,
    pub verified_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KycState {
    Verified,
    Pending,
    NotSubmitted,
}

impl KycState {
    pub fn of(record: Option<&KycRecord>) -> Self {
        match record {
            Some(r) if r.verified => Self::Verified,
            Some(_) => Self::Pending,
            None => Self::NotSubmitted,
        }
    }
}

/// Per-kind verification summary of a seller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KycStatus {
    pub pan: KycState,
    pub aadhaar: KycState,
    pub bank: KycState,
    pub is_fully_verified: bool,
    pub records: Vec<KycRecord>,
}

impl KycStatus {
    pub fn from_records(records: Vec<KycRecord>) -> Self {
        let state = |kind: KycKind| KycState::of(records.iter().find(|r| r.kind == kind));
        let pan = state(KycKind::Pan);
        let aadhaar = state(KycKind::Aadhaar);
        let bank = state(KycKind::Bank);
        Self {
            pan,
            aadhaar,
            bank,
            is_fully_verified: [pan, aadhaar, bank]
                .iter()
                .all(|s| *s == KycState::Verified),
            records,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPanRequest {
    pub holder_name: String,
    pub pan_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAadhaarRequest {
    pub holder_name: String,
    pub aadhaar_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBankRequest {
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyKycRequest {
    pub verified: bool,
}
