//! Category tags and fixed document values.
//!
//! Category tags double as the `docType` discriminator stored inside each
//! document, since range scans select by category prefix and the value must
//! stay self-describing.

use crate::identity::Role;

pub const DOC_HOSPITAL: &str = "hospital";
pub const DOC_DOCTOR: &str = "doctor";
pub const DOC_PATIENT: &str = "patient";
pub const DOC_CONSENT: &str = "consent";
pub const DOC_RECORD: &str = "record";
pub const DOC_DESCRIPTION: &str = "description";
pub const DOC_MEDICINE_STOCK: &str = "medicineStock";
pub const DOC_INSURANCE: &str = "insurance";
pub const DOC_CLAIM: &str = "claim";
pub const DOC_REWARD: &str = "reward";
pub const DOC_DIAGNOSTICS: &str = "diagnostics";
pub const DOC_PHARMACY: &str = "pharmacy";
pub const DOC_RESEARCHER: &str = "researcher";
pub const DOC_INSURANCE_AGENT: &str = "insuranceAgent";

/// Profile status assigned to newly onboarded entities.
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Separator embedded in the legacy plain doctor key shape
/// `{hospitalId}_DOCTOR_{doctorId}`.
pub const DOCTOR_KEY_INFIX: &str = "_DOCTOR_";

/// Entity roles whose consent grant credits the patient's reward balance.
pub const REWARDABLE_ROLES: &[Role] = &[Role::Researcher, Role::InsuranceAdmin];
