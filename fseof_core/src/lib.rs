//! Core rust implementation of FSEOF, FVSEOF and FSEOF_FS, methods for finding gene
//! up- and down-regulation targets in genome scale metabolic models by scanning the flux
//! distribution while enforcing increasing product formation.

pub mod analysis;
pub mod configuration;
pub mod fseof;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
