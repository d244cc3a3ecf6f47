use layered_neat::{Brain, Genome, GenomeSettings, Population, PopulationSettings};

const XOR: [([f32; 2], f32); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

#[derive(Clone, Debug)]
struct XorBrain {
    genome: Genome,
    fitness: f32,
    generation: usize,
}

impl Brain for XorBrain {
    fn create(genome: Genome) -> Self {
        Self {
            genome,
            fitness: 0.0,
            generation: 0,
        }
    }

    fn genome(&self) -> &Genome {
        &self.genome
    }

    fn genome_mut(&mut self) -> &mut Genome {
        &mut self.genome
    }

    fn fitness(&self) -> f32 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    fn generation(&self) -> usize {
        self.generation
    }

    fn set_generation(&mut self, generation: usize) {
        self.generation = generation;
    }

    // 4 minus the summed absolute error, squared to widen the gap near the goal
    fn evaluate_fitness(&mut self) -> f32 {
        let mut error = 0.0;
        for (inputs, expected) in XOR.iter() {
            match self.genome.generate_output_values(inputs) {
                Ok(outputs) => error += (outputs[0] - expected).abs(),
                Err(_) => return 0.0,
            }
        }
        (4.0 - error).max(0.0).powi(2)
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn xor_settings() -> PopulationSettings {
    let mut settings = PopulationSettings::new(150, GenomeSettings::new(2, 1, 1));
    settings.genome.mutation.add_node_rate = 0.05;
    settings
}

#[test]
fn xor_champion_improves() {
    init_logger();
    let mut population = Population::<XorBrain>::with_seed(xor_settings(), 42).unwrap();
    population.evolve().unwrap();
    let first = population.global_champion().unwrap().fitness();

    let champion = population.learn(60, 15.0).unwrap().unwrap();
    assert!(champion.fitness() >= first);
    assert!(champion.genome().is_topology_valid());

    let history = population.champion_history();
    assert!(!history.is_empty());
    for pair in history.windows(2) {
        assert!(pair[1].fitness() > pair[0].fitness());
    }
    for brain in population.brains() {
        assert!(brain.genome().validate().is_ok());
    }
    assert_eq!(population.brains().len(), 150);
}

#[test]
fn settings_load_from_partial_json() {
    init_logger();
    let settings = PopulationSettings::from_json(
        r#"{ "size": 20, "genome": { "inputs": 2, "outputs": 1, "bias": 1 }, "cull_rate": 0.25 }"#,
    )
    .unwrap();
    assert_eq!(settings.size, 20);
    assert_eq!(settings.cull_rate, 0.25);
    assert_eq!(settings.max_staleness, 15);

    let mut population = Population::<XorBrain>::with_seed(settings, 7).unwrap();
    for _ in 0..5 {
        population.evolve().unwrap();
    }
    assert_eq!(population.generation(), 5);
    assert!(population.species().iter().all(|s| !s.is_empty()));
}

#[test]
fn champion_outputs_stay_in_range() {
    init_logger();
    let mut population = Population::<XorBrain>::with_seed(xor_settings(), 3).unwrap();
    let mut champion = population.learn(10, f32::INFINITY).unwrap().unwrap().clone();
    for (inputs, _) in XOR.iter() {
        let outputs = champion.genome_mut().generate_output_values(inputs).unwrap();
        assert_eq!(outputs.len(), 1);
        assert!((0.0..=1.0).contains(&outputs[0]));
    }
    assert!(champion.genome_mut().generate_output_values(&[1.0]).is_err());
}
