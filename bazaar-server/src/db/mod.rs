//! PostgreSQL access, one module per aggregate
//!
//! Row structs mirror the tables; status columns are TEXT and are parsed
//! into the shared enums on the way out.

pub mod cart;
pub mod catalog;
pub mod kyc;
pub mod ledger;
pub mod orders;
pub mod payouts;

use shared::models::ParseEnumError;
use std::str::FromStr;

use crate::store::{StoreError, StoreResult};

/// Parse a TEXT status column
pub(crate) fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .parse()
        .map_err(|e: ParseEnumError| StoreError::Corrupt(e.to_string()))
}
