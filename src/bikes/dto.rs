use serde::{Deserialize, Serialize};

use crate::db::{Bike, BikeSize};
use crate::error::AppResult;
use crate::extractors::{require_text, Validate};

/// Request body for bike creation; new bikes start available.
#[derive(Debug, Deserialize)]
pub struct CreateBikeRequest {
    #[serde(rename = "tamanho")]
    pub size: BikeSize,
    #[serde(rename = "modelo")]
    pub model: String,
}

impl Validate for CreateBikeRequest {
    fn validate(&self) -> AppResult<()> {
        require_text("modelo", &self.model, 80)
    }
}

/// Request body for bike update; every field is replaced.
#[derive(Debug, Deserialize)]
pub struct UpdateBikeRequest {
    #[serde(rename = "tamanho")]
    pub size: BikeSize,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "disponivel")]
    pub available: bool,
}

impl Validate for UpdateBikeRequest {
    fn validate(&self) -> AppResult<()> {
        require_text("modelo", &self.model, 80)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicBike {
    pub id: i64,
    #[serde(rename = "tamanho")]
    pub size: BikeSize,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "disponivel")]
    pub available: bool,
}

impl From<Bike> for PublicBike {
    fn from(b: Bike) -> Self {
        Self {
            id: b.id,
            size: b.size,
            model: b.model,
            available: b.available,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BikeList {
    pub bikes: Vec<PublicBike>,
}
