//! Module providing JSON IO for Models, using the COBRA JSON schema
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder, ReactionBuilderError};
use crate::optimize::objective::ObjectiveSense;

// region JSON Model
/// Represents a JSON serialized model, used for reading and writing models in json format
#[derive(Serialize, Deserialize)]
struct JsonModel {
    metabolites: Vec<JsonMetabolite>,
    reactions: Vec<JsonReaction>,
    #[serde(default)]
    genes: Vec<JsonGene>,
    id: Option<String>,
    compartments: Option<IndexMap<String, String>>,
    version: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonMetabolite {
    id: String,
    name: Option<String>,
    compartment: Option<String>,
    charge: Option<i32>,
    formula: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct JsonReaction {
    id: String,
    name: Option<String>,
    metabolites: IndexMap<String, f64>,
    lower_bound: f64,
    upper_bound: f64,
    #[serde(default)]
    gene_reaction_rule: String,
    objective_coefficient: Option<f64>,
    subsystem: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct JsonGene {
    id: String,
    name: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}
// endregion JSON Model

// region Conversions
/// Notes and annotations are kept as JSON strings, their structure differs between models
fn value_to_string(value: Option<Value>) -> Option<String> {
    value.map(|v| v.to_string())
}

fn string_to_value(value: &Option<String>) -> Option<Value> {
    value
        .as_ref()
        .map(|s| serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())))
}

impl From<JsonGene> for Gene {
    fn from(g: JsonGene) -> Self {
        Self {
            id: g.id,
            name: g.name,
            notes: value_to_string(g.notes),
            annotation: value_to_string(g.annotation),
        }
    }
}

impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.unwrap_or_default(),
            formula: m.formula,
            notes: value_to_string(m.notes),
            annotation: value_to_string(m.annotation),
        }
    }
}

impl From<&Gene> for JsonGene {
    fn from(g: &Gene) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            notes: string_to_value(&g.notes),
            annotation: string_to_value(&g.annotation),
        }
    }
}

impl From<&Metabolite> for JsonMetabolite {
    fn from(m: &Metabolite) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            compartment: m.compartment.clone(),
            charge: Some(m.charge),
            formula: m.formula.clone(),
            notes: string_to_value(&m.notes),
            annotation: string_to_value(&m.annotation),
        }
    }
}

impl Model {
    /// Read a model from a COBRA JSON file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = fs::read_to_string(path.as_ref())
            .map_err(|err| JsonError::UnableToRead(format!("{:?}", err)))?;
        Model::from_json_str(&model_str)
    }

    /// Parse a model from a COBRA JSON string
    pub fn from_json_str(data: &str) -> Result<Model, JsonError> {
        let json_model = serde_json::from_str::<JsonModel>(data)
            .map_err(|err| JsonError::UnableToParse(format!("{:?}", err)))?;
        Model::from_json(json_model)
    }

    /// Write the model to a COBRA JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Serialize the model as a COBRA JSON string
    pub fn to_json_string(&self) -> Result<String, JsonError> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    fn from_json(json_model: JsonModel) -> Result<Self, JsonError> {
        let mut model = Model::new_empty();
        model.id = json_model.id;
        model.compartments = json_model.compartments;
        model.version = json_model.version;
        json_model
            .genes
            .into_iter()
            .for_each(|g| model.add_gene(Gene::from(g)));
        json_model
            .metabolites
            .into_iter()
            .for_each(|m| model.add_metabolite(Metabolite::from(m)));
        for rxn in json_model.reactions {
            let rule = if rxn.gene_reaction_rule.trim().is_empty() {
                None
            } else {
                Some(rxn.gene_reaction_rule)
            };
            let new_reaction: Reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .metabolites(rxn.metabolites)
                .name(rxn.name)
                .gene_reaction_rule(rule)
                .lower_bound(rxn.lower_bound)
                .upper_bound(rxn.upper_bound)
                .subsystem(rxn.subsystem)
                .notes(value_to_string(rxn.notes))
                .annotation(value_to_string(rxn.annotation))
                .build()?;
            // Genes only referenced in rules still belong to the model
            for gene_id in new_reaction.gene_ids() {
                if !model.genes.contains_key(&gene_id) {
                    model.add_gene(Gene {
                        id: gene_id,
                        name: None,
                        notes: None,
                        annotation: None,
                    });
                }
            }
            model.add_reaction(new_reaction)?;
            if let Some(coef) = rxn.objective_coefficient {
                if coef != 0f64 {
                    model.objective.insert(rxn.id, coef);
                }
            }
        }
        model.objective_sense = ObjectiveSense::Maximize;
        Ok(model)
    }

    fn to_json(&self) -> JsonModel {
        let reactions = self
            .reactions
            .values()
            .map(|r| JsonReaction {
                id: r.id.clone(),
                name: r.name.clone(),
                metabolites: r.metabolites.clone(),
                lower_bound: r.lower_bound,
                upper_bound: r.upper_bound,
                gene_reaction_rule: r.gene_reaction_rule.clone().unwrap_or_default(),
                objective_coefficient: self.objective.get(&r.id).copied(),
                subsystem: r.subsystem.clone(),
                notes: string_to_value(&r.notes),
                annotation: string_to_value(&r.annotation),
            })
            .collect();
        JsonModel {
            metabolites: self.metabolites.values().map(JsonMetabolite::from).collect(),
            reactions,
            genes: self.genes.values().map(JsonGene::from).collect(),
            id: self.id.clone(),
            compartments: self.compartments.clone(),
            version: self.version.clone(),
        }
    }
}
// endregion Conversions

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Unable to build reaction")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),
    #[error("Serde json parse error")]
    SerdeJsonParseError(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}
