//! Type definitions for the Quarters SDK
//!
//! Configuration, identifiers and the resource payloads exchanged with the
//! Quarters API.

pub mod identifiers;
pub mod options;
pub mod resources;

pub use identifiers::RequestId;
pub use options::{DEFAULT_API_URL, DEFAULT_QUARTERS_URL, QuartersConfig, QuartersOptions};
pub use resources::{
    Account, Balance, CreatedRequest, TokenAmount, TransferRequest, UserProfile,
};
