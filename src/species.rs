use std::fmt::{Display, Formatter};

use log::debug;
use rand::Rng;

use crate::brain::Brain;
use crate::error::NeatError;
use crate::innovation::InnovationManager;

/// A cluster of brains close to a shared champion.
///
/// Members are indices into the population's current pool of brains, so every method
/// that reads them takes that pool. The champion is an owned clone and outlives the
/// generation it was found in.
#[derive(Clone, Debug)]
pub struct Species<B: Brain> {
    pub champion: B,
    /// Fitness of the champion.
    pub fitness: f32,
    pub avg_adjusted_fitness: f32,
    /// Generations since the champion last improved.
    pub staleness: usize,
    members: Vec<usize>,
}

impl<B: Brain> Species<B> {
    pub fn new(founder: usize, pool: &[B]) -> Self {
        let champion = pool[founder].clone();
        Self {
            fitness: champion.fitness(),
            champion,
            avg_adjusted_fitness: 0.0,
            staleness: 0,
            members: vec![founder],
        }
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn should_contain(&self, brain: &B, threshold: f32) -> bool {
        self.champion.distance(brain) < threshold
    }

    pub fn add(&mut self, member: usize) {
        self.members.push(member);
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Orders members by fitness, best first, and promotes a strictly better leader to
    /// champion. Any other outcome counts as a stale generation.
    pub fn sort(&mut self, pool: &[B]) {
        self.members
            .sort_by(|a, b| pool[*b].fitness().total_cmp(&pool[*a].fitness()));
        match self.members.first() {
            Some(best) if pool[*best].fitness() > self.fitness => {
                self.champion = pool[*best].clone();
                self.fitness = self.champion.fitness();
                self.staleness = 0;
            }
            _ => self.staleness += 1,
        }
    }

    /// Drops the worst `rate` of the members, unless fewer than two would remain.
    /// Call `sort` first.
    pub fn cull(&mut self, rate: f32) {
        let len = self.members.len() as f32;
        if len * (1.0 - rate) < 2.0 {
            return;
        }
        let keep = self.members.len() - (len * rate) as usize;
        self.members.truncate(keep);
    }

    /// Mean of `fitness / len` over the members, divided once more by `len`.
    pub fn update_avg_adjusted_fitness(&mut self, pool: &[B]) {
        let len = self.members.len() as f32;
        self.avg_adjusted_fitness = 0.0;
        if self.members.is_empty() {
            return;
        }
        for member in self.members.iter() {
            self.avg_adjusted_fitness += pool[*member].fitness() / len;
        }
        self.avg_adjusted_fitness /= len;
    }

    /// Fitness-proportionate (roulette) selection over the members' raw fitness.
    pub fn select_brain<'a, R: Rng + ?Sized>(
        &self,
        pool: &'a [B],
        rng: &mut R,
    ) -> Result<&'a B, NeatError> {
        let total: f32 = self.members.iter().map(|m| pool[*m].fitness()).sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(NeatError::DegenerateSelection { total });
        }
        let target = rng.gen_range(0.0..1.0) * total;
        let mut running = 0.0;
        for member in self.members.iter() {
            running += pool[*member].fitness();
            if target < running {
                return Ok(&pool[*member]);
            }
        }
        // rounding can leave `target` a hair above the last running sum
        self.members
            .last()
            .map(|m| &pool[*m])
            .ok_or(NeatError::DegenerateSelection { total })
    }

    /// Mutated clone of a selected member.
    pub fn generate_child<R: Rng + ?Sized>(
        &self,
        pool: &[B],
        innovation_manager: &mut InnovationManager,
        rng: &mut R,
    ) -> Result<B, NeatError> {
        let mut child = self.select_brain(pool, rng)?.clone();
        child.mutate(innovation_manager, rng);
        Ok(child)
    }

    /// Crossover of a member of `self` with a member of `other`, fitter parent first.
    pub fn mate<R: Rng + ?Sized>(
        &self,
        other: &Species<B>,
        pool: &[B],
        rng: &mut R,
    ) -> Result<B, NeatError> {
        let first = self.select_brain(pool, rng)?;
        let second = other.select_brain(pool, rng)?;
        debug!(
            "mating brains of fitness {} and {}",
            first.fitness(),
            second.fitness()
        );
        if first.fitness() > second.fitness() {
            Ok(first.crossover(second, rng))
        } else {
            Ok(second.crossover(first, rng))
        }
    }
}

impl<B: Brain> Display for Species<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Population: {}", self.members.len())?;
        writeln!(f, "Fitness: {}", self.fitness)?;
        writeln!(f, "Staleness: {}", self.staleness)?;
        writeln!(f, "Adjusted fitness: {}", self.avg_adjusted_fitness)?;
        writeln!(f, "Members: {:?}", self.members)?;
        write!(f, "Champion: {}", self.champion.genome())
    }
}
