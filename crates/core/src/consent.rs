//! Consent and access ledger.
//!
//! Two structures track who may see a patient's data: the patient document's
//! `authorizedEntities` list (grown by grants, never auto-shrunk) and the
//! per-(patient, entity) consent record. Doctor-path checks consult the list;
//! researcher-path checks consult the consent record's status, which is what
//! revocation flips.
//!
//! [`can_view_patient_data`] is the single authorization predicate for every
//! "read patient data" path in the system. Query and record operations must
//! call it rather than re-deriving role rules locally.

use medledger_store::{StateStore, TxMeta};

use crate::config::LedgerPolicy;
use crate::constants::{DOC_CONSENT, REWARDABLE_ROLES};
use crate::docs::{read_doc, require_doc, write_doc, ConsentDoc, ConsentStatus, PatientDoc};
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Caller, Role};
use crate::keys;
use crate::rewards;
use crate::validation::required_id;

/// Decides whether `caller` may read data belonging to `patient_id`.
///
/// - patients see only themselves;
/// - doctors see patients whose `authorizedEntities` contains them;
/// - hospitals see everything;
/// - researchers see patients with an approved consent record for them;
/// - diagnostics centers, pharmacies, and insurance admins have broad
///   category access;
/// - every other identity, including ones with missing or unrecognized
///   attributes, is denied.
pub fn can_view_patient_data<S: StateStore>(
    store: &S,
    caller: &Caller,
    patient_id: &str,
) -> LedgerResult<bool> {
    let (role, caller_id) = match (caller.role, caller.unique_id.as_deref()) {
        (Some(role), Some(id)) => (role, id),
        _ => return Ok(false),
    };

    let allowed = match role {
        Role::Patient => caller_id == patient_id,
        Role::Hospital | Role::Diagnostics | Role::Pharmacy | Role::InsuranceAdmin => true,
        Role::Doctor => {
            let patient: Option<PatientDoc> = read_doc(store, &keys::patient(patient_id)?)?;
            patient
                .map(|p| p.authorized_entities.iter().any(|e| e == caller_id))
                .unwrap_or(false)
        }
        Role::Researcher => has_approved_consent(store, patient_id, caller_id)?,
        Role::ResearchAdmin | Role::InsuranceAgent => false,
    };

    if !allowed {
        tracing::debug!(role = %role, caller = caller_id, patient = patient_id, "patient data access denied");
    }
    Ok(allowed)
}

/// Whether an approved consent record exists for `(patient_id, entity_id)`.
pub fn has_approved_consent<S: StateStore>(
    store: &S,
    patient_id: &str,
    entity_id: &str,
) -> LedgerResult<bool> {
    let consent: Option<ConsentDoc> = read_doc(store, &keys::consent(patient_id, entity_id)?)?;
    Ok(consent.map(|c| c.status == ConsentStatus::Approved).unwrap_or(false))
}

/// Outcome of a grant operation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantOutcome {
    pub patient_id: String,
    pub entity_id: String,
    /// False when the entity was already in `authorizedEntities`.
    pub newly_authorized: bool,
    /// Points credited to the patient by this grant (0 for non-rewardable
    /// entity roles, or re-grants under a no-re-award policy).
    pub reward_credited: u64,
}

/// Consent operations, scoped to one transaction.
pub struct ConsentService<'a, S: StateStore> {
    store: &'a mut S,
    policy: &'a LedgerPolicy,
    caller: &'a Caller,
    tx: &'a TxMeta,
}

impl<'a, S: StateStore> ConsentService<'a, S> {
    pub fn new(
        store: &'a mut S,
        policy: &'a LedgerPolicy,
        caller: &'a Caller,
        tx: &'a TxMeta,
    ) -> Self {
        Self {
            store,
            policy,
            caller,
            tx,
        }
    }

    /// Grants `entity_id` access to the calling patient's data.
    ///
    /// Adds the entity to `authorizedEntities` (idempotent: membership and
    /// the patient's `updatedAt` are untouched when already present) and
    /// writes or overwrites the consent record with status approved.
    ///
    /// Granting to a rewardable entity role (researcher, insurance admin)
    /// credits the patient's reward balance. Under the default policy this
    /// happens on every grant call, re-grants included.
    ///
    /// # Errors
    ///
    /// `Validation` on bad ids or an unrecognized entity role, `NotFound`
    /// when the patient is absent, `Authorization` unless the caller is the
    /// patient themself.
    pub fn grant_access(
        &mut self,
        patient_id: &str,
        entity_id: &str,
        entity_role: &str,
    ) -> LedgerResult<GrantOutcome> {
        let patient_id = required_id(patient_id, "patientId")?;
        let entity_id = required_id(entity_id, "entityId")?;
        let entity_role = Role::parse(entity_role).ok_or_else(|| {
            LedgerError::Validation(format!("entityRole {entity_role:?} is not a known role"))
        })?;

        let patient_key = keys::patient(patient_id.as_str())?;
        let mut patient: PatientDoc =
            require_doc(&*self.store, &patient_key, "patient", patient_id.as_str())?;

        let caller_id = self.caller.require_role(Role::Patient)?;
        if caller_id != patient_id.as_str() {
            return Err(LedgerError::Authorization(
                "a patient can only grant access to their own data".into(),
            ));
        }

        let newly_authorized = !patient
            .authorized_entities
            .iter()
            .any(|e| e == entity_id.as_str());
        if newly_authorized {
            patient.authorized_entities.push(entity_id.as_str().to_owned());
            patient.updated_at = self.tx.timestamp;
            write_doc(self.store, &patient_key, &patient)?;
        }

        let consent = ConsentDoc {
            doc_type: DOC_CONSENT.to_owned(),
            patient_id: patient_id.as_str().to_owned(),
            entity_id: entity_id.as_str().to_owned(),
            entity_role: entity_role.as_str().to_owned(),
            status: ConsentStatus::Approved,
            granted_at: self.tx.timestamp,
            revoked_at: None,
        };
        write_doc(
            self.store,
            &keys::consent(patient_id.as_str(), entity_id.as_str())?,
            &consent,
        )?;

        let rewardable = REWARDABLE_ROLES.contains(&entity_role);
        let reward_credited = if rewardable && (newly_authorized || self.policy.reward_on_regrant())
        {
            let points = self.policy.consent_reward_points();
            rewards::credit_points(self.store, patient_id.as_str(), points, self.tx)?;
            points
        } else {
            0
        };

        Ok(GrantOutcome {
            patient_id: patient_id.into_inner(),
            entity_id: entity_id.into_inner(),
            newly_authorized,
            reward_credited,
        })
    }

    /// Revokes a previously granted consent.
    ///
    /// Flips the consent record to revoked and stamps `revokedAt`. The
    /// patient's `authorizedEntities` list is left untouched (it never
    /// auto-shrinks), so only consent-checked paths (researcher
    /// reads) lose access. Revoking an already-revoked consent is a no-op.
    pub fn revoke_consent(
        &mut self,
        patient_id: &str,
        entity_id: &str,
    ) -> LedgerResult<ConsentDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let entity_id = required_id(entity_id, "entityId")?;

        let caller_id = self.caller.require_role(Role::Patient)?;
        if caller_id != patient_id.as_str() {
            return Err(LedgerError::Authorization(
                "a patient can only revoke consent on their own data".into(),
            ));
        }

        let key = keys::consent(patient_id.as_str(), entity_id.as_str())?;
        let mut consent: ConsentDoc =
            require_doc(&*self.store, &key, "consent", entity_id.as_str())?;

        if consent.status != ConsentStatus::Revoked {
            consent.status = ConsentStatus::Revoked;
            consent.revoked_at = Some(self.tx.timestamp);
            write_doc(self.store, &key, &consent)?;
        }
        Ok(consent)
    }

    /// Reads a consent record. Visible to the patient, the named entity, and
    /// hospitals.
    pub fn get_consent(&self, patient_id: &str, entity_id: &str) -> LedgerResult<ConsentDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let entity_id = required_id(entity_id, "entityId")?;

        let caller_id = self.caller.require_id()?;
        let permitted = match self.caller.role {
            Some(Role::Hospital) => true,
            Some(Role::Patient) => caller_id == patient_id.as_str(),
            Some(_) => caller_id == entity_id.as_str(),
            None => false,
        };
        if !permitted {
            return Err(LedgerError::Authorization(
                "caller is not permitted to view this consent record".into(),
            ));
        }

        require_doc(
            &*self.store,
            &keys::consent(patient_id.as_str(), entity_id.as_str())?,
            "consent",
            entity_id.as_str(),
        )
    }
}
