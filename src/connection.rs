use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use rand::Rng;

use crate::node::NodeId;
use crate::settings::MutationSettings;

pub type Innovation = usize;

/// A directed, weighted edge. Two connections are the same gene when they share an
/// innovation number, whatever their endpoints, weight or enabled flag.
#[derive(Clone, Copy, Debug)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f32,
    pub enabled: bool,
    pub innovation: Innovation,
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.innovation == other.innovation
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.innovation.hash(state);
    }
}

impl Display for Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.enabled {
            f.write_fmt(format_args!(
                "[{}] ----({:+.3})----> [{}]",
                self.from, self.weight, self.to
            ))?;
        } else {
            f.write_fmt(format_args!(
                "[{}] /-/-({:+.3})/-/-> [{}]",
                self.from, self.weight, self.to
            ))?;
        }
        f.write_fmt(format_args!(" I.N.: {}", self.innovation))
    }
}

impl Connection {
    pub const WEIGHT_LIMIT: f32 = 4.0;

    pub fn new(from: NodeId, to: NodeId, weight: f32, innovation: Innovation) -> Self {
        Self {
            from,
            to,
            weight,
            enabled: true,
            innovation,
        }
    }

    /// Nudges the weight by a bounded uniform step, or failing that may draw a fresh one.
    pub fn mutate_weight<R: Rng + ?Sized>(&mut self, settings: &MutationSettings, rng: &mut R) {
        if rng.gen_range(0.0..1.0) < settings.weight_mutation_step_rate {
            let step = settings.weight_mutation_step;
            self.weight = clamp_weight(self.weight + rng.gen_range(-step..=step));
        } else if rng.gen_range(0.0..1.0) < settings.weight_reset_rate {
            self.weight = random_weight(settings, rng);
        }
    }
}

pub fn clamp_weight(weight: f32) -> f32 {
    weight.clamp(-Connection::WEIGHT_LIMIT, Connection::WEIGHT_LIMIT)
}

pub(crate) fn random_weight<R: Rng + ?Sized>(settings: &MutationSettings, rng: &mut R) -> f32 {
    let range = settings.new_weight_range;
    clamp_weight(rng.gen_range(-range..=range))
}
