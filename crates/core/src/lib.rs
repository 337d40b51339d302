//! # MedLedger Core
//!
//! Authorization and consent-evaluation engine for a permissioned,
//! multi-organization EHR ledger. Hospitals, doctors, patients, diagnostics
//! centers, pharmacies, insurers, and researchers submit and query documents
//! in one flat key-value namespace, and every operation is gated by the
//! caller's role, unique id, and organization plus the consent state a
//! patient has granted.
//!
//! The crate is pure domain logic against two injected boundaries:
//!
//! - a [`medledger_store::StateStore`] holding the shared ledger state, with
//!   the enclosing transaction's id and logical timestamp in
//!   [`medledger_store::TxMeta`];
//! - an [`identity::IdentityContext`] supplying the caller's attributes.
//!
//! **No transport concerns**: HTTP/gRPC routing, wallets, and identity
//! issuance belong to the surrounding infrastructure. Each operation runs as
//! one serializable transaction; documents are re-read before every mutation
//! and either the whole operation commits or none of it does.

pub mod config;
pub mod consent;
pub mod constants;
pub mod docs;
pub mod error;
pub mod identity;
pub mod insurance;
pub mod keys;
pub mod pharmacy;
pub mod queries;
pub mod records;
pub mod registry;
pub mod response;
pub mod rewards;
mod validation;

pub use config::LedgerPolicy;
pub use consent::{can_view_patient_data, ConsentService, GrantOutcome};
pub use error::{LedgerError, LedgerResult};
pub use identity::{resolve_caller, Caller, IdentityContext, Role};
pub use insurance::InsuranceService;
pub use pharmacy::{DispenseOutcome, PharmacyService, StockUpdateOutcome};
pub use queries::{HistoryEntry, PatientWithRecords, QueryService};
pub use records::RecordService;
pub use registry::{DoctorProfilePatch, RegistryService};
pub use rewards::{RewardOutcome, RewardService};
