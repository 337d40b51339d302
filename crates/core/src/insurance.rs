//! Insurance policies and claims.
//!
//! Policies are issued by insurer-side identities; claims are raised by
//! patients against a policy and move through the one-way lifecycle
//! PENDING → APPROVED. The claim's `patientId` always comes from the caller
//! identity, never from request input.

use medledger_store::{StateStore, TxMeta};

use crate::config::LedgerPolicy;
use crate::constants::{DOC_CLAIM, DOC_INSURANCE};
use crate::docs::{
    read_doc, require_doc, write_doc, ClaimDoc, ClaimStatus, InsurancePolicyDoc, PatientDoc,
};
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Caller, Role};
use crate::keys;
use crate::validation::{positive_int, required_id, required_text};

/// Insurance operations, scoped to one transaction.
pub struct InsuranceService<'a, S: StateStore> {
    store: &'a mut S,
    policy: &'a LedgerPolicy,
    caller: &'a Caller,
    tx: &'a TxMeta,
}

impl<'a, S: StateStore> InsuranceService<'a, S> {
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

    /// Issues an insurance policy for a patient.
    ///
    /// Restricted to insurance admins and agents in the insurer
    /// organization. Agent-issued policies are capped at the configured
    /// coverage amount (inclusive).
    pub fn issue_insurance(
        &mut self,
        policy_number: &str,
        patient_id: &str,
        coverage_amount: &str,
        insurance_company: &str,
    ) -> LedgerResult<InsurancePolicyDoc> {
        let policy_number = required_id(policy_number, "policyNumber")?;
        let patient_id = required_id(patient_id, "patientId")?;
        let insurance_company = required_text(insurance_company, "insuranceCompany")?;
        let coverage_amount = positive_int(coverage_amount, "coverageAmount")?;

        let (role, caller_id) = self
            .caller
            .require_any_role(&[Role::InsuranceAdmin, Role::InsuranceAgent])?;
        self.caller.require_org(self.policy.insurer_org())?;

        require_doc::<_, PatientDoc>(
            &*self.store,
            &keys::patient(patient_id.as_str())?,
            "patient",
            patient_id.as_str(),
        )?;

        let key = keys::insurance(policy_number.as_str())?;
        if read_doc::<_, InsurancePolicyDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "insurance policy",
                id: policy_number.into_inner(),
            });
        }

        if role == Role::InsuranceAgent && coverage_amount > self.policy.agent_coverage_cap() {
            return Err(LedgerError::BusinessRule(format!(
                "agents may not issue coverage above {}",
                self.policy.agent_coverage_cap()
            )));
        }

        let policy = InsurancePolicyDoc {
            doc_type: DOC_INSURANCE.to_owned(),
            policy_number: policy_number.into_inner(),
            insurance_id: caller_id.to_owned(),
            insurance_company: insurance_company.into_inner(),
            patient_id: patient_id.into_inner(),
            coverage_amount,
            claims: Vec::new(),
            created_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &policy)?;
        Ok(policy)
    }

    /// Raises a claim against a policy on behalf of the calling patient.
    ///
    /// The claim id has the form `claim-<txid>` and the claim starts
    /// PENDING. The patient id on the claim is the caller's identity.
    pub fn create_claim(
        &mut self,
        policy_number: &str,
        amount: &str,
        reason: &str,
    ) -> LedgerResult<ClaimDoc> {
        let policy_number = required_id(policy_number, "policyNumber")?;
        let reason = required_text(reason, "reason")?;
        let amount = positive_int(amount, "amount")?;

        let patient_id = self.caller.require_role(Role::Patient)?.to_owned();

        let policy: InsurancePolicyDoc = require_doc(
            &*self.store,
            &keys::insurance(policy_number.as_str())?,
            "insurance policy",
            policy_number.as_str(),
        )?;

        let claim_id = format!("claim-{}", self.tx.id);
        let claim = ClaimDoc {
            doc_type: DOC_CLAIM.to_owned(),
            claim_id: claim_id.clone(),
            policy_number: policy_number.into_inner(),
            patient_id,
            insurance_id: policy.insurance_id,
            insurance_company: policy.insurance_company,
            amount,
            reason: reason.into_inner(),
            status: ClaimStatus::Pending,
            requested_at: self.tx.timestamp,
            approved_at: None,
        };
        write_doc(self.store, &keys::claim(&claim_id)?, &claim)?;
        Ok(claim)
    }

    /// Approves a pending claim.
    ///
    /// Restricted to insurance admins and agents in the insurer
    /// organization. The PENDING → APPROVED transition is one-way:
    /// re-approving an approved claim is rejected, so `approvedAt` is set
    /// exactly once.
    pub fn approve_claim(&mut self, claim_id: &str) -> LedgerResult<ClaimDoc> {
        let claim_id = required_id(claim_id, "claimId")?;

        self.caller
            .require_any_role(&[Role::InsuranceAdmin, Role::InsuranceAgent])?;
        self.caller.require_org(self.policy.insurer_org())?;

        let key = keys::claim(claim_id.as_str())?;
        let mut claim: ClaimDoc = require_doc(&*self.store, &key, "claim", claim_id.as_str())?;

        if claim.status == ClaimStatus::Approved {
            return Err(LedgerError::BusinessRule(format!(
                "claim {} is already approved",
                claim_id.as_str()
            )));
        }

        claim.status = ClaimStatus::Approved;
        claim.approved_at = Some(self.tx.timestamp);
        write_doc(self.store, &key, &claim)?;
        Ok(claim)
    }

    /// Reads a policy document. Visible to insurer-side roles, hospitals,
    /// and the insured patient.
    pub fn get_policy(&self, policy_number: &str) -> LedgerResult<InsurancePolicyDoc> {
        let policy_number = required_id(policy_number, "policyNumber")?;
        let policy: InsurancePolicyDoc = require_doc(
            &*self.store,
            &keys::insurance(policy_number.as_str())?,
            "insurance policy",
            policy_number.as_str(),
        )?;

        let caller_id = self.caller.require_id()?;
        let permitted = match self.caller.role {
            Some(Role::InsuranceAdmin) | Some(Role::InsuranceAgent) | Some(Role::Hospital) => true,
            Some(Role::Patient) => caller_id == policy.patient_id,
            _ => false,
        };
        if !permitted {
            return Err(LedgerError::Authorization(
                "caller is not permitted to view this policy".into(),
            ));
        }
        Ok(policy)
    }
}
