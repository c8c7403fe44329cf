//! Information system records

use crate::ids::InformationSystemId;
use crate::threat::Threat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An information system under threat modeling
///
/// Owns its threats; `threats` is in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationSystem {
    pub id: InformationSystemId,
    pub title: String,
    pub description: Option<String>,
    /// Reference to the uploaded architecture diagram, if any
    pub diagram: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub threats: Vec<Threat>,
}

impl InformationSystem {
    pub fn new(title: impl Into<String>, description: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: InformationSystemId::new(),
            title: title.into(),
            description,
            diagram: None,
            created_at,
            threats: Vec::new(),
        }
    }
}
