//! This module provides the Gene struct
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// Structure Representing a Gene
///
/// Genes are only carried along so that reports can show which genes a target reaction
/// depends on, see [`Reaction::gene_reaction_rule`](crate::metabolic_model::reaction::Reaction)
#[derive(Builder, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Gene {
    /// Used to identify the gene
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable Gene Name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Notes about the gene
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Gene Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.id, name),
            None => write!(f, "{}", self.id),
        }
    }
}
