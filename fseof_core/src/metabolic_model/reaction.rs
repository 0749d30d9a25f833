//! This module provides a struct for representing reactions
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule, as written in the model file (e.g. `b3916 or b1723`)
    #[builder(default = "None")]
    pub gene_reaction_rule: Option<String>,
    /// Lower flux bound
    #[builder(default = "crate::configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "crate::configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Reaction {
    /// Current (lower, upper) flux bounds
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower_bound, self.upper_bound)
    }

    /// Whether the reaction can carry flux in the reverse direction
    pub fn is_reversible(&self) -> bool {
        self.lower_bound < 0f64
    }

    /// Whether this is a boundary reaction (exchange, sink or demand), i.e. it only
    /// involves a single metabolite
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }

    /// Whether the reaction is knocked out (both bounds at zero)
    pub fn is_knocked_out(&self) -> bool {
        self.lower_bound == 0f64 && self.upper_bound == 0f64
    }

    /// Gene ids referenced by the gene reaction rule, in order of first appearance
    pub fn gene_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let Some(rule) = &self.gene_reaction_rule else {
            return ids;
        };
        for token in rule.split(|c: char| c.is_whitespace() || c == '(' || c == ')') {
            if token.is_empty() {
                continue;
            }
            match token.to_ascii_lowercase().as_str() {
                "and" | "or" | "not" => {}
                _ => {
                    if !ids.iter().any(|id| id == token) {
                        ids.push(token.to_string());
                    }
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_and_reversibility() {
        let mut metabolites = IndexMap::new();
        metabolites.insert("glc__D_e".to_string(), -1.0);
        let exchange = ReactionBuilder::default()
            .id("EX_glc__D_e")
            .metabolites(metabolites)
            .lower_bound(-10.)
            .upper_bound(1000.)
            .build()
            .unwrap();
        assert!(exchange.is_boundary());
        assert!(exchange.is_reversible());
        assert!(!exchange.is_knocked_out());
        assert_eq!(exchange.bounds(), (-10., 1000.));
    }

    #[test]
    fn gene_ids_from_rule() {
        let reaction = ReactionBuilder::default()
            .id("PFK")
            .gene_reaction_rule(Some("(b3916 and b1723) or not b3916".to_string()))
            .build()
            .unwrap();
        assert_eq!(reaction.gene_ids(), vec!["b3916", "b1723"]);

        let no_rule = ReactionBuilder::default().id("ATPM").build().unwrap();
        assert!(no_rule.gene_ids().is_empty());
    }
}
