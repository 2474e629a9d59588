use serde::{Deserialize, Serialize};

use super::money::Money;

/// A bookable rental property. Reference data, never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalUnit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub nightly_rate: Money,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub extra_bed_allowed: bool,
}

impl std::fmt::Display for RentalUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# {}", self.name)?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Nightly rate: {}", self.nightly_rate)?;
        writeln!(
            f,
            "Extra bed: {}",
            if self.extra_bed_allowed {
                "available"
            } else {
                "not available"
            }
        )?;
        if let Some(ref desc) = self.description
            && !desc.is_empty()
        {
            writeln!(f, "\n{desc}")?;
        }
        Ok(())
    }
}
