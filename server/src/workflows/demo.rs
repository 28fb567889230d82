//! Demo write workflow: one parent row plus one child row referencing it,
//! inside a single explicit transaction.
//!
//! Exactly one terminal call per begun transaction on every path: commit on
//! success, rollback on any insert failure, and commit's own failure handling
//! is already terminal so no second rollback is issued for it.

use crate::models::{Country, State};
use crate::txn::{Params, TxnError, TxnManager, TxnPool};
use crate::types::{CountryId, StateId, TxnId};
use tracing::warn;

const INSERT_COUNTRY: &str = "INSERT INTO country_m \
     (country_recid, country_name, is_active, created_on) \
     VALUES(:id, :name, :isActive, :createdOn)";

const INSERT_STATE: &str = "INSERT INTO state_m \
     (state_recid, state_name, is_active, created_on, country_recid) \
     VALUES(:id, :name, :isActive, :createdOn, :cid)";

const DEMO_COUNTRY: &str = "India";
const DEMO_STATE: &str = "Maharashtra";

/// Keys written by one successful demo transaction.
#[derive(Debug, Clone, Copy)]
pub struct DemoWriteOutcome {
    pub txn_id: TxnId,
    pub country_id: CountryId,
    pub state_id: StateId,
}

/// Runs the full demo write. Any failure after `begin` rolls the transaction
/// back before the error surfaces.
pub async fn run_demo_write<P: TxnPool>(
    manager: &TxnManager<P>,
) -> Result<DemoWriteOutcome, TxnError> {
    let txn_id = manager.begin().await?;
    match insert_demo_rows(manager, txn_id).await {
        Ok((country_id, state_id)) => {
            manager.commit(txn_id).await?;
            Ok(DemoWriteOutcome {
                txn_id,
                country_id,
                state_id,
            })
        }
        Err(err) => {
            if let Err(rollback_err) = manager.rollback(txn_id).await {
                warn!(
                    txn_id = %txn_id,
                    error = %rollback_err,
                    "rollback of failed demo write also failed"
                );
            }
            Err(err)
        }
    }
}

async fn insert_demo_rows<P: TxnPool>(
    manager: &TxnManager<P>,
    txn_id: TxnId,
) -> Result<(CountryId, StateId), TxnError> {
    let country = Country::new(DEMO_COUNTRY);
    manager
        .execute(txn_id, INSERT_COUNTRY, &country_params(&country))
        .await?;

    let state = State::new(DEMO_STATE, country.country_recid);
    manager
        .execute(txn_id, INSERT_STATE, &state_params(&state))
        .await?;

    Ok((country.country_recid, state.state_recid))
}

fn country_params(country: &Country) -> Params {
    Params::new()
        .with("id", *country.country_recid.as_uuid())
        .with("name", country.country_name.as_str())
        .with("isActive", country.is_active)
        .with("createdOn", country.created_on)
}

fn state_params(state: &State) -> Params {
    Params::new()
        .with("id", *state.state_recid.as_uuid())
        .with("name", state.state_name.as_str())
        .with("isActive", state.is_active)
        .with("createdOn", state.created_on)
        .with("cid", *state.country_recid.as_uuid())
}
