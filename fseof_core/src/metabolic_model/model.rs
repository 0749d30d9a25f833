//! This module provides the Model struct for representing an entire metabolic model
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use thiserror::Error;

use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};

/// Represents a Genome Scale Metabolic Model
///
/// Analyses never modify a model they are handed, they work on clones. A clone is
/// therefore the unit of isolation between sweep steps and between worker threads.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Gene Objects
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Whether the objective is maximized or minimized
    pub objective_sense: ObjectiveSense,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            objective_sense: ObjectiveSense::Maximize,
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// Metabolites in the reaction stoichiometry which are not yet part of the model are
    /// added with only their id.
    ///
    /// # Examples
    /// ```rust
    /// use fseof_core::metabolic_model::model::Model;
    /// use fseof_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction).unwrap();
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<(), ModelError> {
        if self.reactions.contains_key(&reaction.id) {
            return Err(ModelError::DuplicateReaction(reaction.id));
        }
        if reaction.lower_bound > reaction.upper_bound {
            return Err(ModelError::InvalidBounds {
                id: reaction.id,
                lower_bound: reaction.lower_bound,
                upper_bound: reaction.upper_bound,
            });
        }
        for met_id in reaction.metabolites.keys() {
            if !self.metabolites.contains_key(met_id) {
                self.metabolites
                    .insert(met_id.clone(), Metabolite::new(met_id));
            }
        }
        self.reactions.insert(reaction.id.clone(), reaction);
        Ok(())
    }

    /// Add a metabolite to the model, replacing one with the same id
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        self.metabolites.insert(metabolite.id.clone(), metabolite);
    }

    /// Add a gene to the model
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Get a reaction by id
    pub fn reaction(&self, id: &str) -> Result<&Reaction, ModelError> {
        self.reactions
            .get(id)
            .ok_or_else(|| ModelError::ReactionNotFound(id.to_string()))
    }

    /// Get a metabolite by id
    pub fn metabolite(&self, id: &str) -> Result<&Metabolite, ModelError> {
        self.metabolites
            .get(id)
            .ok_or_else(|| ModelError::MetaboliteNotFound(id.to_string()))
    }

    /// Ids of all reactions, in model order
    pub fn reaction_ids(&self) -> Vec<String> {
        self.reactions.keys().cloned().collect()
    }

    /// Set both bounds of a reaction
    pub fn set_reaction_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ModelError> {
        if lower_bound > upper_bound || lower_bound.is_nan() || upper_bound.is_nan() {
            return Err(ModelError::InvalidBounds {
                id: id.to_string(),
                lower_bound,
                upper_bound,
            });
        }
        let reaction = self
            .reactions
            .get_mut(id)
            .ok_or_else(|| ModelError::ReactionNotFound(id.to_string()))?;
        reaction.lower_bound = lower_bound;
        reaction.upper_bound = upper_bound;
        Ok(())
    }

    /// Set the lower bound of a reaction, raising the upper bound as well if needed
    pub fn set_reaction_lower_bound(&mut self, id: &str, lower_bound: f64) -> Result<(), ModelError> {
        let upper_bound = self.reaction(id)?.upper_bound.max(lower_bound);
        self.set_reaction_bounds(id, lower_bound, upper_bound)
    }

    /// Knock a reaction out by setting both of its bounds to zero
    pub fn knock_out_reaction(&mut self, id: &str) -> Result<(), ModelError> {
        self.set_reaction_bounds(id, 0f64, 0f64)
    }

    /// Make a single reaction the objective
    pub fn set_objective(&mut self, reaction_id: &str, sense: ObjectiveSense) -> Result<(), ModelError> {
        self.reaction(reaction_id)?;
        self.objective.clear();
        self.objective.insert(reaction_id.to_string(), 1f64);
        self.objective_sense = sense;
        Ok(())
    }

    /// Add a sink reaction consuming `metabolite_id`, returning the id of the new reaction
    ///
    /// The sink is named `{metabolite_id}{suffix}`, consumes one unit of the metabolite
    /// and has bounds `(0, 1000)`. If a reaction with that id already exists its id is
    /// returned and the model is left unchanged.
    pub fn add_sink_reaction(&mut self, metabolite_id: &str, suffix: &str) -> Result<String, ModelError> {
        self.metabolite(metabolite_id)?;
        let id = format!("{}{}", metabolite_id, suffix);
        if self.reactions.contains_key(&id) {
            return Ok(id);
        }
        let mut stoichiometry = IndexMap::new();
        stoichiometry.insert(metabolite_id.to_string(), -1f64);
        let sink = ReactionBuilder::default()
            .id(id.clone())
            .name(Some(format!("{} sink", metabolite_id)))
            .metabolites(stoichiometry)
            .lower_bound(0f64)
            .upper_bound(1000f64)
            .build()?;
        self.add_reaction(sink)?;
        Ok(id)
    }

    /// Stoichiometric matrix, metabolites as rows and reactions as columns (both in model order)
    pub fn stoichiometric_matrix(&self) -> Result<CsrMatrix<f64>, ModelError> {
        let mut coo = CooMatrix::new(self.metabolites.len(), self.reactions.len());
        for (column, reaction) in self.reactions.values().enumerate() {
            for (met_id, coefficient) in &reaction.metabolites {
                let row = self
                    .metabolites
                    .get_index_of(met_id)
                    .ok_or_else(|| ModelError::MetaboliteNotFound(met_id.clone()))?;
                coo.push(row, column, *coefficient);
            }
        }
        Ok(CsrMatrix::from(&coo))
    }

    /// Build the flux balance linear program for this model
    ///
    /// One variable per reaction (same id and bounds as the reaction), one steady state
    /// constraint `S v = 0` per metabolite (with the metabolite id), and the model objective.
    pub fn to_problem(&self) -> Result<Problem, ModelError> {
        let mut problem = Problem::new(self.objective_sense);
        for reaction in self.reactions.values() {
            problem.add_new_variable(&reaction.id, reaction.lower_bound, reaction.upper_bound)?;
        }
        let stoichiometry = self.stoichiometric_matrix()?;
        for (met_id, row) in self.metabolites.keys().zip(stoichiometry.row_iter()) {
            if row.nnz() == 0 {
                continue;
            }
            problem.add_constraint(
                met_id,
                crate::optimize::constraint::Constraint::new_equality(
                    row.col_indices(),
                    row.values(),
                    0f64,
                ),
            )?;
        }
        for (reaction_id, coefficient) in &self.objective {
            let index = self
                .reactions
                .get_index_of(reaction_id)
                .ok_or_else(|| ModelError::ReactionNotFound(reaction_id.clone()))?;
            problem.add_new_linear_objective_term(index, *coefficient)?;
        }
        Ok(problem)
    }
}

/// Errors associated with the Model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Reaction {0} is not in the model")]
    ReactionNotFound(String),
    #[error("Metabolite {0} is not in the model")]
    MetaboliteNotFound(String),
    #[error("A reaction with id {0} already exists in the model")]
    DuplicateReaction(String),
    #[error("Invalid bounds for reaction {id}: lower bound {lower_bound} > upper bound {upper_bound}")]
    InvalidBounds {
        id: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    #[error("Unable to build reaction: {0}")]
    ReactionBuilder(String),
    #[error("Unable to build optimization problem: {0}")]
    Problem(#[from] ProblemError),
}

impl From<crate::metabolic_model::reaction::ReactionBuilderError> for ModelError {
    fn from(err: crate::metabolic_model::reaction::ReactionBuilderError) -> Self {
        ModelError::ReactionBuilder(err.to_string())
    }
}
