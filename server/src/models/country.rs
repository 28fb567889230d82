use crate::types::CountryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row in `country_m`, the parent table of the demo write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub country_recid: CountryId,
    pub country_name: String,
    pub is_active: bool,
    pub created_on: DateTime<Utc>,
}

impl Country {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            country_recid: CountryId::new(),
            country_name: name.into(),
            is_active: true,
            created_on: Utc::now(),
        }
    }
}
