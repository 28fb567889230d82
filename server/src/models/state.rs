use crate::types::{CountryId, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row in `state_m`, the child table referencing `country_m` by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub state_recid: StateId,
    pub state_name: String,
    pub is_active: bool,
    pub created_on: DateTime<Utc>,
    pub country_recid: CountryId,
}

impl State {
    pub fn new(name: impl Into<String>, country: CountryId) -> Self {
        Self {
            state_recid: StateId::new(),
            state_name: name.into(),
            is_active: true,
            created_on: Utc::now(),
            country_recid: country,
        }
    }
}
