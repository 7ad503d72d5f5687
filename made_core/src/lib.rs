//! Core rust implementation of MADE (Metabolic Adjustment by Differential Expression), fitting
//! gene states of a constraint based metabolic model to differential expression data.

pub mod configuration;
pub mod io;
pub mod made;
pub mod metabolic_model;
pub mod optimize;
mod utils;
