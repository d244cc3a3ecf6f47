//! Configuration for genomes and populations.
//!
//! Every struct deserializes from partial JSON; missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::NeatError;

/// Probabilities and step sizes used by `Genome::mutate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationSettings {
    /// Chance that the weights of a genome are perturbed at all.
    pub weight_mutation_rate: f32,
    /// Half-width of the uniform nudge applied to a weight.
    pub weight_mutation_step: f32,
    /// Chance, per connection, of nudging rather than resetting.
    pub weight_mutation_step_rate: f32,
    /// Chance, per connection that was not nudged, of drawing a fresh weight.
    pub weight_reset_rate: f32,
    /// Fresh weights are drawn from `[-new_weight_range, new_weight_range]`.
    pub new_weight_range: f32,
    pub add_connection_rate: f32,
    pub add_node_rate: f32,
    /// Chance that a gene disabled in both crossover parents comes back enabled.
    pub reenable_rate: f32,
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self {
            weight_mutation_rate: 0.8,
            weight_mutation_step: 0.25,
            weight_mutation_step_rate: 0.9,
            weight_reset_rate: 1.0,
            new_weight_range: 2.0,
            add_connection_rate: 0.08,
            add_node_rate: 0.03,
            reenable_rate: 0.25,
        }
    }
}

/// Coefficients of the compatibility distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceSettings {
    pub coeff_disjoint: f32,
    pub coeff_weights: f32,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            coeff_disjoint: 1.0,
            coeff_weights: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeSettings {
    pub inputs: usize,
    pub outputs: usize,
    /// Number of bias nodes, 0 or 1.
    pub bias: usize,
    pub mutation: MutationSettings,
    pub distance: DistanceSettings,
}

impl Default for GenomeSettings {
    fn default() -> Self {
        Self {
            inputs: 1,
            outputs: 1,
            bias: 0,
            mutation: MutationSettings::default(),
            distance: DistanceSettings::default(),
        }
    }
}

impl GenomeSettings {
    pub fn new(inputs: usize, outputs: usize, bias: usize) -> Self {
        Self {
            inputs,
            outputs,
            bias,
            ..Default::default()
        }
    }

    /// Input plus bias nodes, all of which sit on layer 0.
    pub fn sensors(&self) -> usize {
        self.inputs + self.bias
    }

    pub fn validate(&self) -> Result<(), NeatError> {
        if self.inputs == 0 {
            return Err(invalid("genome needs at least one input"));
        }
        if self.outputs == 0 {
            return Err(invalid("genome needs at least one output"));
        }
        if self.bias > 1 {
            return Err(invalid(format!("bias must be 0 or 1, got {}", self.bias)));
        }
        let m = &self.mutation;
        for (name, rate) in [
            ("weight_mutation_rate", m.weight_mutation_rate),
            ("weight_mutation_step_rate", m.weight_mutation_step_rate),
            ("weight_reset_rate", m.weight_reset_rate),
            ("add_connection_rate", m.add_connection_rate),
            ("add_node_rate", m.add_node_rate),
            ("reenable_rate", m.reenable_rate),
        ] {
            probability(name, rate)?;
        }
        non_negative("weight_mutation_step", m.weight_mutation_step)?;
        non_negative("new_weight_range", m.new_weight_range)?;
        non_negative("coeff_disjoint", self.distance.coeff_disjoint)?;
        non_negative("coeff_weights", self.distance.coeff_weights)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationSettings {
    pub size: usize,
    pub genome: GenomeSettings,
    /// Agents closer than this to a species champion join that species.
    pub species_distance_threshold: f32,
    /// Fraction of each species dropped before reproduction.
    pub cull_rate: f32,
    /// Generations without improvement after which a species is removed.
    pub max_staleness: usize,
    pub crossover_rate: f32,
    pub inter_species_crossover_rate: f32,
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self {
            size: 150,
            genome: GenomeSettings::default(),
            species_distance_threshold: 2.0,
            cull_rate: 0.5,
            max_staleness: 15,
            crossover_rate: 0.75,
            inter_species_crossover_rate: 0.0001,
        }
    }
}

impl PopulationSettings {
    pub fn new(size: usize, genome: GenomeSettings) -> Self {
        Self {
            size,
            genome,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, NeatError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), NeatError> {
        self.genome.validate()?;
        if self.size == 0 {
            return Err(invalid("population size must be at least 1"));
        }
        if self.species_distance_threshold.is_nan() || self.species_distance_threshold <= 0.0 {
            return Err(invalid(format!(
                "species_distance_threshold must be positive, got {}",
                self.species_distance_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.cull_rate) {
            return Err(invalid(format!(
                "cull_rate must be in [0, 1), got {}",
                self.cull_rate
            )));
        }
        probability("crossover_rate", self.crossover_rate)?;
        probability("inter_species_crossover_rate", self.inter_species_crossover_rate)
    }
}

fn invalid(reason: impl Into<String>) -> NeatError {
    NeatError::InvalidSettings(reason.into())
}

fn probability(name: &str, value: f32) -> Result<(), NeatError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{} must be in [0, 1], got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), NeatError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = PopulationSettings::new(100, GenomeSettings::new(4, 3, 1));
        assert!(settings.validate().is_ok());
        assert_eq!(settings.genome.sensors(), 5);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "size": 50,
            "genome": { "inputs": 2, "outputs": 1, "mutation": { "add_node_rate": 0.2 } },
            "cull_rate": 0.25
        }"#;
        let settings = PopulationSettings::from_json(json).unwrap();
        assert_eq!(settings.size, 50);
        assert_eq!(settings.genome.inputs, 2);
        assert_eq!(settings.genome.bias, 0);
        assert_eq!(settings.genome.mutation.add_node_rate, 0.2);
        assert_eq!(settings.genome.mutation.add_connection_rate, 0.08);
        assert_eq!(settings.cull_rate, 0.25);
        assert_eq!(settings.max_staleness, 15);
    }

    #[test]
    fn rejects_bad_values() {
        let mut settings = PopulationSettings::new(10, GenomeSettings::new(2, 1, 2));
        assert!(matches!(
            settings.validate(),
            Err(NeatError::InvalidSettings(_))
        ));
        settings.genome.bias = 1;
        settings.genome.mutation.add_node_rate = 1.5;
        assert!(settings.validate().is_err());
        settings.genome.mutation.add_node_rate = 0.5;
        settings.cull_rate = 1.0;
        assert!(settings.validate().is_err());
        settings.cull_rate = 0.5;
        settings.size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            PopulationSettings::from_json("{ size: }"),
            Err(NeatError::Settings(_))
        ));
    }
}
