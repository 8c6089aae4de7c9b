//! LMDB implementation of GovernanceStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use gavel_store::{GovernanceStore, StoreError};
use gavel_types::ProposalId;

use crate::LmdbError;

const TREASURY_KEY: &[u8] = b"treasury";

pub struct LmdbGovernanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) treasury_db: Database<Bytes, Bytes>,
}

fn decode_key(key: &[u8]) -> Result<ProposalId, LmdbError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| LmdbError::Serialization("invalid proposal key length".into()))?;
    Ok(ProposalId::from_be_bytes(arr))
}

impl GovernanceStore for LmdbGovernanceStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.proposals_db
            .put(&mut wtxn, &id.to_be_bytes(), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .proposals_db
            .get(&rtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("proposal {}", id)))?;
        Ok(val.to_vec())
    }

    fn list_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut proposals = Vec::new();
        let iter = self.proposals_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            proposals.push((decode_key(key)?, val.to_vec()));
        }
        Ok(proposals)
    }

    fn proposal_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.proposals_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }

    fn put_treasury(&self, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.treasury_db
            .put(&mut wtxn, TREASURY_KEY, data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_treasury(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .treasury_db
            .get(&rtxn, TREASURY_KEY)
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn commit_execution(
        &self,
        id: ProposalId,
        proposal: &[u8],
        treasury: &[u8],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.proposals_db
            .put(&mut wtxn, &id.to_be_bytes(), proposal)
            .map_err(LmdbError::from)?;
        self.treasury_db
            .put(&mut wtxn, TREASURY_KEY, treasury)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).expect("open env");
        (dir, env)
    }

    #[test]
    fn proposals_list_in_id_order() {
        let (_dir, env) = temp_env();
        let store = env.governance_store();
        for raw in [300u64, 2, 17] {
            store
                .put_proposal(ProposalId::new(raw), &raw.to_le_bytes())
                .unwrap();
        }
        let ids: Vec<u64> = store
            .list_proposals()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.raw())
            .collect();
        assert_eq!(ids, vec![2, 17, 300]);
        assert_eq!(store.proposal_count().unwrap(), 3);
    }

    #[test]
    fn put_overwrites_existing_record() {
        let (_dir, env) = temp_env();
        let store = env.governance_store();
        let id = ProposalId::new(0);
        store.put_proposal(id, b"open").unwrap();
        store.put_proposal(id, b"executed").unwrap();
        assert_eq!(store.get_proposal(id).unwrap(), b"executed");
        assert_eq!(store.proposal_count().unwrap(), 1);
    }

    #[test]
    fn missing_proposal_is_not_found() {
        let (_dir, env) = temp_env();
        let err = env
            .governance_store()
            .get_proposal(ProposalId::new(9))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn treasury_absent_until_written() {
        let (_dir, env) = temp_env();
        let store = env.governance_store();
        assert_eq!(store.get_treasury().unwrap(), None);
        store.put_treasury(b"funds").unwrap();
        assert_eq!(store.get_treasury().unwrap().as_deref(), Some(&b"funds"[..]));
    }

    #[test]
    fn execution_commit_writes_both_records() {
        let (_dir, env) = temp_env();
        let store = env.governance_store();
        let id = ProposalId::new(1);
        store.put_proposal(id, b"open").unwrap();
        store.put_treasury(b"1000").unwrap();

        store.commit_execution(id, b"purchased", b"900").unwrap();
        assert_eq!(store.get_proposal(id).unwrap(), b"purchased");
        assert_eq!(store.get_treasury().unwrap().as_deref(), Some(&b"900"[..]));
        assert_eq!(store.proposal_count().unwrap(), 1);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        {
            let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
            env.governance_store()
                .put_proposal(ProposalId::new(4), b"persisted")
                .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        assert_eq!(
            env.governance_store().get_proposal(ProposalId::new(4)).unwrap(),
            b"persisted"
        );
    }
}
