//! Patient reward-point ledger.
//!
//! Balances are credited by consent-granting events (see the consent module)
//! and by explicit credit operations, and debited by use operations. A
//! balance can never go negative: debits check the balance first and fail
//! whole.

use medledger_store::{StateStore, TxMeta};

use crate::config::LedgerPolicy;
use crate::constants::DOC_REWARD;
use crate::docs::{read_doc, write_doc, RewardDoc};
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Caller, Role};
use crate::keys;
use crate::validation::{positive_int, required_id};

/// Credits `points` to the patient's balance, creating the reward document on
/// first use. Returns the new balance.
///
/// Internal building block shared with the consent grant path; authorization
/// is the caller's concern.
pub(crate) fn credit_points<S: StateStore>(
    store: &mut S,
    patient_id: &str,
    points: u64,
    tx: &TxMeta,
) -> LedgerResult<u64> {
    let key = keys::reward(patient_id)?;
    let mut reward: RewardDoc = read_doc(store, &key)?.unwrap_or(RewardDoc {
        doc_type: DOC_REWARD.to_owned(),
        patient_id: patient_id.to_owned(),
        balance: 0,
        updated_at: tx.timestamp,
    });
    reward.balance += points;
    reward.updated_at = tx.timestamp;
    write_doc(store, &key, &reward)?;
    Ok(reward.balance)
}

/// Outcome of a reward credit or debit.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardOutcome {
    pub patient_id: String,
    pub balance: u64,
}

/// Reward operations, scoped to one transaction.
pub struct RewardService<'a, S: StateStore> {
    store: &'a mut S,
    caller: &'a Caller,
    tx: &'a TxMeta,
}

impl<'a, S: StateStore> RewardService<'a, S> {
    pub fn new(
        store: &'a mut S,
        _policy: &'a LedgerPolicy,
        caller: &'a Caller,
        tx: &'a TxMeta,
    ) -> Self {
        Self { store, caller, tx }
    }

    /// Credits reward points to a patient.
    ///
    /// Permitted to researchers and insurance admins for any patient, and to
    /// patients for themselves only.
    pub fn credit_reward(&mut self, patient_id: &str, points: &str) -> LedgerResult<RewardOutcome> {
        let patient_id = required_id(patient_id, "patientId")?;
        let points = positive_int(points, "points")?;

        let (role, caller_id) = self.caller.require_any_role(&[
            Role::Researcher,
            Role::InsuranceAdmin,
            Role::Patient,
        ])?;
        if role == Role::Patient && caller_id != patient_id.as_str() {
            return Err(LedgerError::Authorization(
                "a patient can only credit their own reward balance".into(),
            ));
        }

        crate::docs::require_doc::<_, crate::docs::PatientDoc>(
            &*self.store,
            &keys::patient(patient_id.as_str())?,
            "patient",
            patient_id.as_str(),
        )?;

        let balance = credit_points(self.store, patient_id.as_str(), points, self.tx)?;
        Ok(RewardOutcome {
            patient_id: patient_id.into_inner(),
            balance,
        })
    }

    /// Spends reward points from the calling patient's balance.
    ///
    /// # Errors
    ///
    /// `BusinessRule` when the balance is insufficient; the balance is left
    /// unchanged.
    pub fn use_reward(&mut self, patient_id: &str, amount: &str) -> LedgerResult<RewardOutcome> {
        let patient_id = required_id(patient_id, "patientId")?;
        let amount = positive_int(amount, "amount")?;

        let caller_id = self.caller.require_role(Role::Patient)?;
        if caller_id != patient_id.as_str() {
            return Err(LedgerError::Authorization(
                "a patient can only spend their own reward balance".into(),
            ));
        }

        let key = keys::reward(patient_id.as_str())?;
        let mut reward: RewardDoc = read_doc(&*self.store, &key)?.unwrap_or(RewardDoc {
            doc_type: DOC_REWARD.to_owned(),
            patient_id: patient_id.as_str().to_owned(),
            balance: 0,
            updated_at: self.tx.timestamp,
        });

        if reward.balance < amount {
            return Err(LedgerError::BusinessRule(format!(
                "insufficient reward balance: have {}, need {}",
                reward.balance, amount
            )));
        }

        reward.balance -= amount;
        reward.updated_at = self.tx.timestamp;
        write_doc(self.store, &key, &reward)?;
        Ok(RewardOutcome {
            patient_id: patient_id.into_inner(),
            balance: reward.balance,
        })
    }

    /// Reads a patient's reward balance. Patients see only their own balance;
    /// hospitals, researchers, and insurance admins may read any.
    pub fn get_reward_balance(&self, patient_id: &str) -> LedgerResult<RewardOutcome> {
        let patient_id = required_id(patient_id, "patientId")?;
        let (role, caller_id) = self.caller.require_any_role(&[
            Role::Patient,
            Role::Hospital,
            Role::Researcher,
            Role::InsuranceAdmin,
        ])?;
        if role == Role::Patient && caller_id != patient_id.as_str() {
            return Err(LedgerError::Authorization(
                "a patient can only view their own reward balance".into(),
            ));
        }

        let reward: Option<RewardDoc> = read_doc(&*self.store, &keys::reward(patient_id.as_str())?)?;
        Ok(RewardOutcome {
            patient_id: patient_id.into_inner(),
            balance: reward.map(|r| r.balance).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryService;
    use chrono::{TimeZone, Utc};
    use medledger_store::MemLedger;

    fn tx(id: &str) -> TxMeta {
        TxMeta::new(id, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    fn setup_patient(ledger: &mut MemLedger, policy: &LedgerPolicy) {
        let hospital = Caller::known(Role::Hospital, "H1", "Org1");
        let boot = tx("tx-boot");
        let mut registry = RegistryService::new(ledger, policy, &hospital, &boot);
        registry
            .register_hospital("H1", "City General", "Pune")
            .expect("hospital should register");
        registry
            .register_patient("H1", "P1", "Asha Rao", "1990-01-15", None)
            .expect("patient should register");
    }

    #[test]
    fn test_credit_and_use_reward_flow() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        setup_patient(&mut ledger, &policy);

        let researcher = Caller::known(Role::Researcher, "R1", "Org2");
        let t1 = tx("tx1");
        let credited = RewardService::new(&mut ledger, &policy, &researcher, &t1)
            .credit_reward("P1", "10")
            .expect("credit should succeed");
        assert_eq!(credited.balance, 10);

        let patient = Caller::known(Role::Patient, "P1", "Org1");
        let t2 = tx("tx2");
        let spent = RewardService::new(&mut ledger, &policy, &patient, &t2)
            .use_reward("P1", "5")
            .expect("spend should succeed");
        assert_eq!(spent.balance, 5);
    }

    #[test]
    fn test_use_reward_rejects_insufficient_balance_and_keeps_balance() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        setup_patient(&mut ledger, &policy);

        let patient = Caller::known(Role::Patient, "P1", "Org1");
        let t1 = tx("tx1");
        RewardService::new(&mut ledger, &policy, &patient, &t1)
            .credit_reward("P1", "5")
            .expect("self credit should succeed");

        let t2 = tx("tx2");
        let err = RewardService::new(&mut ledger, &policy, &patient, &t2)
            .use_reward("P1", "100")
            .expect_err("overspend should be rejected");
        assert!(matches!(err, LedgerError::BusinessRule(_)));

        let t3 = tx("tx3");
        let balance = RewardService::new(&mut ledger, &policy, &patient, &t3)
            .get_reward_balance("P1")
            .expect("read should succeed");
        assert_eq!(balance.balance, 5);
    }

    #[test]
    fn test_patient_cannot_credit_another_patient() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        setup_patient(&mut ledger, &policy);

        let other = Caller::known(Role::Patient, "P2", "Org1");
        let t = tx("tx1");
        let err = RewardService::new(&mut ledger, &policy, &other, &t)
            .credit_reward("P1", "10")
            .expect_err("foreign credit should be rejected");
        assert!(matches!(err, LedgerError::Authorization(_)));
    }

    #[test]
    fn test_use_reward_rejects_zero_and_garbage_amounts() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        setup_patient(&mut ledger, &policy);

        let patient = Caller::known(Role::Patient, "P1", "Org1");
        let t = tx("tx1");
        let mut service = RewardService::new(&mut ledger, &policy, &patient, &t);
        assert!(matches!(
            service.use_reward("P1", "0"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            service.use_reward("P1", "lots"),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_balance_read_defaults_to_zero() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        setup_patient(&mut ledger, &policy);

        let hospital = Caller::known(Role::Hospital, "H1", "Org1");
        let t = tx("tx1");
        let balance = RewardService::new(&mut ledger, &policy, &hospital, &t)
            .get_reward_balance("P1")
            .expect("read should succeed");
        assert_eq!(balance.balance, 0);
    }
}
