use std::fmt::{Display, Formatter};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::brain::Brain;
use crate::error::NeatError;
use crate::genome::Genome;
use crate::innovation::InnovationManager;
use crate::settings::{GenomeSettings, PopulationSettings};
use crate::species::Species;

pub type Generation = usize;

/// One evolutionary run: the current pool of brains, its species, the all-time
/// champion and the run's innovation history and random stream.
pub struct Population<B: Brain> {
    settings: PopulationSettings,
    genome_settings: Arc<GenomeSettings>,
    brains: Vec<B>,
    species: Vec<Species<B>>,
    global_champion: Option<B>,
    champion_history: Vec<B>,
    generation: Generation,
    innovation_manager: InnovationManager,
    rng: StdRng,
}

impl<B: Brain> Population<B> {
    pub fn new(settings: PopulationSettings) -> Result<Self, NeatError> {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Same settings and seed give the same run, provided fitness evaluation is
    /// deterministic.
    pub fn with_seed(settings: PopulationSettings, seed: u64) -> Result<Self, NeatError> {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: PopulationSettings, mut rng: StdRng) -> Result<Self, NeatError> {
        settings.validate()?;
        let genome_settings = Arc::new(settings.genome.clone());
        let mut innovation_manager = InnovationManager::new(&genome_settings);
        let brains = (0..settings.size)
            .map(|_| {
                let mut brain = B::create(Genome::new(genome_settings.clone(), &mut innovation_manager));
                brain.mutate(&mut innovation_manager, &mut rng);
                brain
            })
            .collect();
        Ok(Self {
            settings,
            genome_settings,
            brains,
            species: vec![],
            global_champion: None,
            champion_history: vec![],
            generation: 0,
            innovation_manager,
            rng,
        })
    }

    pub fn settings(&self) -> &PopulationSettings {
        &self.settings
    }

    pub fn genome_settings(&self) -> &Arc<GenomeSettings> {
        &self.genome_settings
    }

    pub fn brains(&self) -> &[B] {
        &self.brains
    }

    pub fn species(&self) -> &[Species<B>] {
        &self.species
    }

    pub fn global_champion(&self) -> Option<&B> {
        self.global_champion.as_ref()
    }

    /// Every brain that became global champion, oldest first.
    pub fn champion_history(&self) -> &[B] {
        &self.champion_history
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn innovation_manager(&self) -> &InnovationManager {
        &self.innovation_manager
    }

    /// Assigns every brain to the first species whose champion is close enough,
    /// founding a new species otherwise. Species left without members are dropped.
    pub fn speciate(&mut self) {
        for species in self.species.iter_mut() {
            species.clear();
        }
        let threshold = self.settings.species_distance_threshold;
        for (idx, brain) in self.brains.iter().enumerate() {
            match self
                .species
                .iter_mut()
                .find(|s| s.should_contain(brain, threshold))
            {
                Some(species) => species.add(idx),
                None => {
                    debug!("brain {} founds species {}", idx, self.species.len());
                    self.species.push(Species::new(idx, &self.brains));
                }
            }
        }
        self.species.retain(|s| !s.is_empty());
    }

    /// Runs one generation. Returns whether a new global champion was found.
    ///
    /// On error the generation counter, the pool of brains and the global champion are
    /// left as they were; the species keep this generation's ranking and are rebuilt by
    /// the next call.
    pub fn evolve(&mut self) -> Result<bool, NeatError> {
        self.speciate();

        for brain in self.brains.iter_mut() {
            let fitness = brain.evaluate_fitness();
            brain.set_fitness(fitness);
        }

        for species in self.species.iter_mut() {
            species.sort(&self.brains);
            species.cull(self.settings.cull_rate);
            species.update_avg_adjusted_fitness(&self.brains);
        }
        self.species
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        let total = self.adjusted_fitness_sum()?;
        let best = self.species.first().map(|s| s.champion.clone());
        self.remove_unfit_species(total);

        let generation = self.generation + 1;
        let next = self.reproduce(generation)?;
        let new_champion = best.map_or(false, |best| self.update_global_champion(best));
        self.generation = generation;
        self.brains = next;
        info!(
            "generation {}: {} species, best fitness {}",
            self.generation,
            self.species.len(),
            self.species.first().map_or(0.0, |s| s.fitness)
        );
        Ok(new_champion)
    }

    fn update_global_champion(&mut self, best: B) -> bool {
        let improved = self
            .global_champion
            .as_ref()
            .map_or(true, |champion| best.fitness() > champion.fitness());
        if improved {
            info!(
                "new champion brain - generation {} - fitness {}",
                self.generation,
                best.fitness()
            );
            self.champion_history.push(best.clone());
            self.global_champion = Some(best);
        }
        improved
    }

    fn adjusted_fitness_sum(&self) -> Result<f32, NeatError> {
        let total: f32 = self.species.iter().map(|s| s.avg_adjusted_fitness).sum();
        if total.is_finite() && total > 0.0 {
            Ok(total)
        } else {
            Err(NeatError::DegenerateSelection { total })
        }
    }

    /// Drops stale species and species whose share of `total` earns them less than one
    /// offspring. If that would drop every species, the best-ranked one with a positive
    /// adjusted fitness survives.
    fn remove_unfit_species(&mut self, total: f32) {
        let size = self.settings.size as f32;
        let max_staleness = self.settings.max_staleness;
        let doomed = self
            .species
            .iter()
            .map(|s| s.staleness >= max_staleness || size * (s.avg_adjusted_fitness / total) < 1.0)
            .collect::<Vec<_>>();
        if doomed.iter().all(|d| *d) {
            let Some(keep) = self.species.iter().position(|s| s.avg_adjusted_fitness > 0.0) else {
                return;
            };
            warn!("every species is stale or unfit, keeping species {}", keep);
            let survivor = self.species.swap_remove(keep);
            self.species = vec![survivor];
            return;
        }
        let mut doomed = doomed.into_iter();
        let before = self.species.len();
        self.species.retain(|_| !doomed.next().unwrap_or(false));
        debug!("removed {} species", before - self.species.len());
    }

    fn reproduce(&mut self, generation: Generation) -> Result<Vec<B>, NeatError> {
        let total = self.adjusted_fitness_sum()?;
        let size = self.settings.size;
        let mut next = Vec::with_capacity(size);
        for idx in 0..self.species.len() {
            let mut best = self.species[idx].champion.clone();
            best.set_generation(generation);
            next.push(best);
            let share = self.species[idx].avg_adjusted_fitness / total;
            let offspring = ((size as f32 * share).floor() as usize).saturating_sub(1);
            for _ in 0..offspring {
                next.push(self.generate_offspring(idx, generation)?);
            }
        }
        while next.len() < size {
            next.push(self.generate_offspring(0, generation)?);
        }
        next.truncate(size);
        Ok(next)
    }

    fn generate_offspring(&mut self, idx: usize, generation: Generation) -> Result<B, NeatError> {
        let species = &self.species[idx];
        let rng = &mut self.rng;
        let mut offspring = if rng.gen_range(0.0..1.0) < self.settings.crossover_rate {
            let other = if rng.gen_range(0.0..1.0) < self.settings.inter_species_crossover_rate {
                &self.species[rng.gen_range(0..self.species.len())]
            } else {
                species
            };
            species.mate(other, &self.brains, rng)?
        } else {
            species.generate_child(&self.brains, &mut self.innovation_manager, rng)?
        };
        offspring.set_generation(generation);
        Ok(offspring)
    }

    /// Evolves until the global champion reaches `fitness_goal` or `max_generations`
    /// generations have run, and returns the champion.
    pub fn learn(&mut self, max_generations: Generation, fitness_goal: f32) -> Result<Option<&B>, NeatError> {
        for _ in 0..max_generations {
            if self.global_champion.as_ref().map_or(false, |c| c.fitness() >= fitness_goal) {
                break;
            }
            self.evolve()?;
        }
        Ok(self.global_champion.as_ref())
    }
}

impl<B: Brain> Display for Population<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "POPULATION:")?;
        writeln!(f, "Size: {}", self.settings.size)?;
        writeln!(f, "Generation: {}", self.generation)?;
        writeln!(f, "{} species:", self.species.len())?;
        for (i, species) in self.species.iter().enumerate() {
            writeln!(f, "Species {}", i + 1)?;
            write!(f, "{}", species)?;
        }
        Ok(())
    }
}
