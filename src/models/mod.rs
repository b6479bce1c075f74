use chrono::{NaiveDateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};

/// Declares an enum that is stored as TEXT.
///
/// Generates `as_str`, `FromStr` (case-insensitive), `Display`, `ALL`
/// and the conversions used when reading and writing rows.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Convert to database string
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!(
                    "Invalid {}: {}. Must be one of: {}",
                    $label,
                    s,
                    [$($text),+].join(", ")
                ))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

pub mod appointment;
pub mod audit_log;
pub mod department;
pub mod dispensation;
pub mod doctor;
pub mod facility;
pub mod invoice;
pub mod medical_record;
pub mod medicine;
pub mod patient;
pub mod payment;
pub mod payroll;
pub mod prescription;
pub mod schedule;
pub mod shift;
pub mod staff;
pub mod user;

pub use appointment::*;
pub use audit_log::*;
pub use department::*;
pub use dispensation::*;
pub use doctor::*;
pub use facility::*;
pub use invoice::*;
pub use medical_record::*;
pub use medicine::*;
pub use patient::*;
pub use payment::*;
pub use payroll::*;
pub use prescription::*;
pub use schedule::*;
pub use shift::*;
pub use staff::*;
pub use user::*;

/// Current UTC time as stored in TIMESTAMP columns
pub fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Human-facing reference such as `PAT-20240131-X7K2QA`
pub fn reference_number(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}-{}-{}", prefix, Utc::now().format("%Y%m%d"), suffix)
}

/// Round money to cents, halves away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
