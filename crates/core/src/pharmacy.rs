//! Pharmacy stock and dispensing.
//!
//! Stock documents are keyed by `(pharmacyId, medicineName)` so every
//! pharmacy manages its own shelf. Dispensing mutates two documents, the
//! stock entry and the clinical record, inside the one enclosing
//! transaction; the backing ledger commits or aborts both together, so no
//! compensation logic exists here.

use medledger_store::{StateStore, TxMeta};

use crate::config::LedgerPolicy;
use crate::constants::DOC_MEDICINE_STOCK;
use crate::docs::{
    read_doc, require_doc, write_doc, ClinicalRecordDoc, DispenseHistoryEntry, DispensedMedicine,
    MedicineStockDoc,
};
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Caller, Role};
use crate::keys;
use crate::validation::{non_negative_int, positive_int, required_id};

/// Outcome of a stock update, reporting both quantities for auditability.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateOutcome {
    pub pharmacy_id: String,
    pub medicine_name: String,
    pub previous_quantity: u64,
    pub new_quantity: u64,
}

/// Outcome of a dispense operation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseOutcome {
    pub patient_id: String,
    pub record_id: String,
    pub medicine_name: String,
    pub quantity: u64,
    pub remaining_stock: u64,
}

/// Pharmacy operations, scoped to one transaction.
pub struct PharmacyService<'a, S: StateStore> {
    store: &'a mut S,
    policy: &'a LedgerPolicy,
    caller: &'a Caller,
    tx: &'a TxMeta,
}

impl<'a, S: StateStore> PharmacyService<'a, S> {
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

    /// Sets the calling pharmacy's stock level for a medicine.
    ///
    /// The new quantity overwrites the old one (this is a stock-take, not an
    /// increment); accumulated dispense history is preserved.
    pub fn update_medicine_stock(
        &mut self,
        medicine_name: &str,
        new_stock: &str,
    ) -> LedgerResult<StockUpdateOutcome> {
        let medicine_name = required_id(medicine_name, "medicineName")?;
        let new_quantity = non_negative_int(new_stock, "newStock")?;

        let pharmacy_id = self.caller.require_role(Role::Pharmacy)?.to_owned();
        self.caller.require_org(self.policy.pharmacy_org())?;

        let key = keys::medicine_stock(&pharmacy_id, medicine_name.as_str())?;
        let existing: Option<MedicineStockDoc> = read_doc(&*self.store, &key)?;
        let previous_quantity = existing.as_ref().map(|s| s.quantity).unwrap_or(0);

        let stock = MedicineStockDoc {
            doc_type: DOC_MEDICINE_STOCK.to_owned(),
            pharmacy_id: pharmacy_id.clone(),
            medicine_name: medicine_name.as_str().to_owned(),
            quantity: new_quantity,
            dispensed_history: existing.map(|s| s.dispensed_history).unwrap_or_default(),
            updated_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &stock)?;

        Ok(StockUpdateOutcome {
            pharmacy_id,
            medicine_name: medicine_name.into_inner(),
            previous_quantity,
            new_quantity,
        })
    }

    /// Dispenses a prescribed medicine against a clinical record.
    ///
    /// The record's `prescription` field must exactly equal `medicine_name`
    /// (single-drug prescriptions only). Decrements the pharmacy's stock and
    /// appends one entry to the stock document's `dispensedHistory` and one
    /// to the record's `dispensedMedicines`.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing record or stock entry, `BusinessRule` on a
    /// prescription mismatch or insufficient stock.
    pub fn dispense_medicine(
        &mut self,
        patient_id: &str,
        record_id: &str,
        medicine_name: &str,
        quantity: &str,
    ) -> LedgerResult<DispenseOutcome> {
        let patient_id = required_id(patient_id, "patientId")?;
        let record_id = required_id(record_id, "recordId")?;
        let medicine_name = required_id(medicine_name, "medicineName")?;
        let quantity = positive_int(quantity, "quantity")?;

        let pharmacy_id = self.caller.require_role(Role::Pharmacy)?.to_owned();

        let record_key = keys::record(patient_id.as_str(), record_id.as_str())?;
        let mut record: ClinicalRecordDoc =
            require_doc(&*self.store, &record_key, "record", record_id.as_str())?;

        if record.prescription.as_deref() != Some(medicine_name.as_str()) {
            return Err(LedgerError::BusinessRule(format!(
                "prescription on record {} does not match medicine {}",
                record_id.as_str(),
                medicine_name.as_str()
            )));
        }

        let stock_key = keys::medicine_stock(&pharmacy_id, medicine_name.as_str())?;
        let mut stock: MedicineStockDoc = require_doc(
            &*self.store,
            &stock_key,
            "medicine stock",
            medicine_name.as_str(),
        )?;

        if quantity > stock.quantity {
            return Err(LedgerError::BusinessRule(format!(
                "not enough stock of {}: have {}, need {}",
                medicine_name.as_str(),
                stock.quantity,
                quantity
            )));
        }

        stock.quantity -= quantity;
        stock.dispensed_history.push(DispenseHistoryEntry {
            patient_id: patient_id.as_str().to_owned(),
            record_id: record_id.as_str().to_owned(),
            quantity,
            dispensed_at: self.tx.timestamp,
        });
        stock.updated_at = self.tx.timestamp;

        record.dispensed_medicines.push(DispensedMedicine {
            medicine_name: medicine_name.as_str().to_owned(),
            quantity,
            pharmacy_id: pharmacy_id.clone(),
            dispensed_at: self.tx.timestamp,
        });
        record.updated_at = self.tx.timestamp;

        // Both writes land in the same transaction; the ledger commits or
        // aborts them together.
        write_doc(self.store, &stock_key, &stock)?;
        write_doc(self.store, &record_key, &record)?;

        Ok(DispenseOutcome {
            patient_id: patient_id.into_inner(),
            record_id: record_id.into_inner(),
            medicine_name: medicine_name.into_inner(),
            quantity,
            remaining_stock: stock.quantity,
        })
    }

    /// Reads the calling pharmacy's stock entry for a medicine.
    pub fn get_medicine_stock(&self, medicine_name: &str) -> LedgerResult<MedicineStockDoc> {
        let medicine_name = required_id(medicine_name, "medicineName")?;
        let pharmacy_id = self.caller.require_role(Role::Pharmacy)?;
        require_doc(
            &*self.store,
            &keys::medicine_stock(pharmacy_id, medicine_name.as_str())?,
            "medicine stock",
            medicine_name.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::ConsentService;
    use crate::records::RecordService;
    use crate::registry::RegistryService;
    use chrono::{TimeZone, Utc};
    use medledger_store::MemLedger;

    fn tx(id: &str) -> TxMeta {
        TxMeta::new(id, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    /// Registers hospital/patient/doctor, grants access, and writes one
    /// record prescribing paracetamol. Returns the record id.
    fn setup_prescribed_record(ledger: &mut MemLedger, policy: &LedgerPolicy) -> String {
        let hospital = Caller::known(Role::Hospital, "H1", "Org1");
        let boot = tx("tx-boot");
        let mut registry = RegistryService::new(ledger, policy, &hospital, &boot);
        registry
            .register_hospital("H1", "City General", "Pune")
            .expect("hospital should register");
        registry
            .register_patient("H1", "P1", "Asha Rao", "1990-01-15", None)
            .expect("patient should register");

        let patient = Caller::known(Role::Patient, "P1", "Org1");
        let t_grant = tx("tx-grant");
        ConsentService::new(ledger, policy, &patient, &t_grant)
            .grant_access("P1", "D1", "doctor")
            .expect("grant should succeed");

        let doctor = Caller::known(Role::Doctor, "D1", "Org1");
        let t_rec = tx("tx-rec");
        RecordService::new(ledger, policy, &doctor, &t_rec)
            .add_record("P1", "flu", Some("paracetamol"))
            .expect("record should be created")
            .record_id
    }

    fn stock_doc(ledger: &MemLedger, pharmacy: &str, medicine: &str) -> MedicineStockDoc {
        read_doc(
            ledger,
            &keys::medicine_stock(pharmacy, medicine).expect("key should build"),
        )
        .expect("read should succeed")
        .expect("stock should exist")
    }

    #[test]
    fn test_update_stock_overwrites_and_reports_both_quantities() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let pharmacy = Caller::known(Role::Pharmacy, "Ph1", "Org1");

        let t1 = tx("tx1");
        let first = PharmacyService::new(&mut ledger, &policy, &pharmacy, &t1)
            .update_medicine_stock("paracetamol", "10")
            .expect("stock update should succeed");
        assert_eq!(first.previous_quantity, 0);
        assert_eq!(first.new_quantity, 10);

        let t2 = tx("tx2");
        let second = PharmacyService::new(&mut ledger, &policy, &pharmacy, &t2)
            .update_medicine_stock("paracetamol", "4")
            .expect("stock update should succeed");
        assert_eq!(second.previous_quantity, 10);
        assert_eq!(second.new_quantity, 4);
    }

    #[test]
    fn test_update_stock_rejects_negative_or_garbage() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let pharmacy = Caller::known(Role::Pharmacy, "Ph1", "Org1");
        let t = tx("tx1");
        let mut service = PharmacyService::new(&mut ledger, &policy, &pharmacy, &t);

        assert!(matches!(
            service.update_medicine_stock("paracetamol", "-1"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            service.update_medicine_stock("paracetamol", "many"),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_update_stock_requires_pharmacy_role_and_org() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let t = tx("tx1");

        let doctor = Caller::known(Role::Doctor, "D1", "Org1");
        assert!(matches!(
            PharmacyService::new(&mut ledger, &policy, &doctor, &t)
                .update_medicine_stock("paracetamol", "10"),
            Err(LedgerError::Authorization(_))
        ));

        let wrong_org = Caller::known(Role::Pharmacy, "Ph1", "Org2");
        assert!(matches!(
            PharmacyService::new(&mut ledger, &policy, &wrong_org, &t)
                .update_medicine_stock("paracetamol", "10"),
            Err(LedgerError::Authorization(_))
        ));
    }

    #[test]
    fn test_dispense_decrements_stock_and_appends_to_both_documents() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let record_id = setup_prescribed_record(&mut ledger, &policy);

        let pharmacy = Caller::known(Role::Pharmacy, "Ph1", "Org1");
        let t1 = tx("tx-stock");
        PharmacyService::new(&mut ledger, &policy, &pharmacy, &t1)
            .update_medicine_stock("paracetamol", "10")
            .expect("stock should be set");

        let t2 = tx("tx-disp");
        let outcome = PharmacyService::new(&mut ledger, &policy, &pharmacy, &t2)
            .dispense_medicine("P1", &record_id, "paracetamol", "5")
            .expect("dispense should succeed");
        assert_eq!(outcome.remaining_stock, 5);

        let stock = stock_doc(&ledger, "Ph1", "paracetamol");
        assert_eq!(stock.quantity, 5);
        assert_eq!(stock.dispensed_history.len(), 1);
        assert_eq!(stock.dispensed_history[0].record_id, record_id);

        let record: ClinicalRecordDoc = read_doc(
            &ledger,
            &keys::record("P1", &record_id).expect("key should build"),
        )
        .expect("read should succeed")
        .expect("record should exist");
        assert_eq!(record.dispensed_medicines.len(), 1);
        assert_eq!(record.dispensed_medicines[0].quantity, 5);
        assert_eq!(record.dispensed_medicines[0].pharmacy_id, "Ph1");
    }

    #[test]
    fn test_dispense_rejects_insufficient_stock_without_mutation() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let record_id = setup_prescribed_record(&mut ledger, &policy);

        let pharmacy = Caller::known(Role::Pharmacy, "Ph1", "Org1");
        let t1 = tx("tx-stock");
        PharmacyService::new(&mut ledger, &policy, &pharmacy, &t1)
            .update_medicine_stock("paracetamol", "10")
            .expect("stock should be set");

        let t2 = tx("tx-d1");
        PharmacyService::new(&mut ledger, &policy, &pharmacy, &t2)
            .dispense_medicine("P1", &record_id, "paracetamol", "5")
            .expect("first dispense should succeed");

        let t3 = tx("tx-d2");
        let err = PharmacyService::new(&mut ledger, &policy, &pharmacy, &t3)
            .dispense_medicine("P1", &record_id, "paracetamol", "6")
            .expect_err("overdraw should be rejected");
        assert!(matches!(err, LedgerError::BusinessRule(_)));
        assert!(err.to_string().contains("not enough stock"));

        // Neither document changed on the failed call.
        let stock = stock_doc(&ledger, "Ph1", "paracetamol");
        assert_eq!(stock.quantity, 5);
        assert_eq!(stock.dispensed_history.len(), 1);
    }

    #[test]
    fn test_dispense_rejects_prescription_mismatch() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let record_id = setup_prescribed_record(&mut ledger, &policy);

        let pharmacy = Caller::known(Role::Pharmacy, "Ph1", "Org1");
        let t1 = tx("tx-stock");
        PharmacyService::new(&mut ledger, &policy, &pharmacy, &t1)
            .update_medicine_stock("ibuprofen", "10")
            .expect("stock should be set");

        let t2 = tx("tx-d1");
        let err = PharmacyService::new(&mut ledger, &policy, &pharmacy, &t2)
            .dispense_medicine("P1", &record_id, "ibuprofen", "2")
            .expect_err("mismatch should be rejected");
        assert!(matches!(err, LedgerError::BusinessRule(_)));
    }

    #[test]
    fn test_dispense_against_missing_stock_is_not_found() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let record_id = setup_prescribed_record(&mut ledger, &policy);

        let pharmacy = Caller::known(Role::Pharmacy, "Ph1", "Org1");
        let t = tx("tx1");
        let err = PharmacyService::new(&mut ledger, &policy, &pharmacy, &t)
            .dispense_medicine("P1", &record_id, "paracetamol", "1")
            .expect_err("missing stock should be rejected");
        assert!(matches!(
            err,
            LedgerError::NotFound { what: "medicine stock", .. }
        ));
    }
}
