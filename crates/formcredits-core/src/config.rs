//! Ledger configuration.
//!
//! All tunable amounts (signup bonus, per-method form costs, purchasable
//! packs) live in an explicit [`CreditConfig`] injected into the ledger, so
//! tests can exercise arbitrary values.

use serde::{Deserialize, Serialize};

/// Default signup bonus in credits.
pub const DEFAULT_SIGNUP_BONUS: u64 = 5;

/// Default cost of a manually built form.
pub const DEFAULT_MANUAL_FORM_COST: u64 = 1;

/// Default cost of a form imported from a file.
pub const DEFAULT_FILE_IMPORT_COST: u64 = 1;

/// Default cost of an AI-generated form.
pub const DEFAULT_AI_FORM_COST: u64 = 2;

/// How a form was created. Determines the credit cost of publishing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationMethod {
    /// Built by hand in the form builder.
    Manual,

    /// Imported from an uploaded file.
    FileImport,

    /// Generated by the AI chat flow.
    Ai,
}

/// A purchasable credit pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPack {
    /// Machine-readable pack id (sent to the payment processor).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Credits granted on purchase.
    pub quantity: u64,

    /// Price in USD cents.
    pub price_cents: u64,
}

/// Configuration for the credit ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditConfig {
    /// One-time bonus granted when an account is created.
    pub signup_bonus: u64,

    /// Cost in credits of a manually built form.
    pub manual_form_cost: u64,

    /// Cost in credits of a file-imported form.
    pub file_import_cost: u64,

    /// Cost in credits of an AI-generated form.
    pub ai_form_cost: u64,

    /// Credit packs offered at checkout.
    pub packs: Vec<CreditPack>,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            signup_bonus: DEFAULT_SIGNUP_BONUS,
            manual_form_cost: DEFAULT_MANUAL_FORM_COST,
            file_import_cost: DEFAULT_FILE_IMPORT_COST,
            ai_form_cost: DEFAULT_AI_FORM_COST,
            packs: vec![
                CreditPack {
                    id: "starter".into(),
                    name: "Starter".into(),
                    quantity: 20,
                    price_cents: 499,
                },
                CreditPack {
                    id: "standard".into(),
                    name: "Standard".into(),
                    quantity: 50,
                    price_cents: 999,
                },
                CreditPack {
                    id: "jumbo".into(),
                    name: "Jumbo".into(),
                    quantity: 120,
                    price_cents: 1999,
                },
            ],
        }
    }
}

impl CreditConfig {
    /// Credit cost of publishing a form created with `method`.
    #[must_use]
    pub fn cost_of(&self, method: CreationMethod) -> u64 {
        match method {
            CreationMethod::Manual => self.manual_form_cost,
            CreationMethod::FileImport => self.file_import_cost,
            CreationMethod::Ai => self.ai_form_cost,
        }
    }

    /// Look up a pack by id.
    #[must_use]
    pub fn pack(&self, id: &str) -> Option<&CreditPack> {
        self.packs.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_costs_match_creation_methods() {
        let config = CreditConfig::default();

        assert_eq!(config.cost_of(CreationMethod::Manual), 1);
        assert_eq!(config.cost_of(CreationMethod::FileImport), 1);
        assert_eq!(config.cost_of(CreationMethod::Ai), 2);
    }

    #[test]
    fn pack_lookup() {
        let config = CreditConfig::default();

        let pack = config.pack("standard").unwrap();
        assert_eq!(pack.quantity, 50);
        assert!(config.pack("nonexistent").is_none());
    }

    #[test]
    fn creation_method_serde_snake_case() {
        let method: CreationMethod = serde_json::from_str("\"file_import\"").unwrap();
        assert_eq!(method, CreationMethod::FileImport);
    }
}
