//! Layered NEAT: neuro-evolution of augmenting topologies over feed-forward genomes
//! whose nodes are arranged in layers.
//!
//! A [`Population`] owns a pool of [`Brain`]s, groups them into [`Species`] by genome
//! distance and breeds the next generation from fitness-proportionate selection,
//! mutation and crossover. Structural mutations are numbered by the run's
//! [`InnovationManager`] so that genes from different lineages can be aligned.

pub mod brain;
pub mod connection;
pub mod error;
pub mod genome;
pub mod innovation;
pub mod node;
pub mod population;
pub mod settings;
pub mod species;

pub use brain::Brain;
pub use connection::{Connection, Innovation};
pub use error::NeatError;
pub use genome::Genome;
pub use innovation::InnovationManager;
pub use node::{sigmoid, Node, NodeId};
pub use population::{Generation, Population};
pub use settings::{DistanceSettings, GenomeSettings, MutationSettings, PopulationSettings};
pub use species::Species;
