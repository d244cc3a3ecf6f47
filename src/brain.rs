use rand::Rng;

use crate::genome::Genome;
use crate::innovation::InnovationManager;

/// An agent driven by a genome. Implementors supply the fitness hook; the evolutionary
/// operations are provided on top of the genome.
///
/// `Clone` must produce an independent copy, which deriving it over an owned `Genome`
/// does.
pub trait Brain: Clone {
    fn create(genome: Genome) -> Self;

    fn genome(&self) -> &Genome;

    fn genome_mut(&mut self) -> &mut Genome;

    fn fitness(&self) -> f32;

    fn set_fitness(&mut self, fitness: f32);

    /// Generation this brain was born in.
    fn generation(&self) -> usize;

    fn set_generation(&mut self, generation: usize);

    /// Feeds inputs to the network, reads its outputs and scores them. Must be
    /// non-negative and must not alter the genome's structure.
    fn evaluate_fitness(&mut self) -> f32;

    fn mutate<R: Rng + ?Sized>(&mut self, innovation_manager: &mut InnovationManager, rng: &mut R) {
        self.genome_mut().mutate(innovation_manager, rng);
    }

    /// Child of `self` and `other`; `self` is expected to be the fitter parent.
    fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> Self {
        let same_fitness = self.fitness() == other.fitness();
        Self::create(Genome::crossover(
            self.genome(),
            other.genome(),
            same_fitness,
            rng,
        ))
    }

    fn distance(&self, other: &Self) -> f32 {
        self.genome().distance(other.genome())
    }
}
