use serde::Deserialize;
use utoipa::IntoParams;
use validator::{Validate, ValidationErrors};

use crate::{dto::validation::validate_match_id, state::MatchId};

/// Path parameters of the `/matches/{id}` routes.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct MatchPath {
    /// Match identifier as minted by the keeper.
    pub id: String,
}

impl Validate for MatchPath {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_match_id(&self.id) {
            errors.add("id", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl MatchPath {
    /// Validate the path and convert it into a [`MatchId`].
    pub fn into_match_id(self) -> Result<MatchId, ValidationErrors> {
        self.validate()?;
        MatchId::parse(&self.id).map_err(|_| ValidationErrors::new())
    }
}
