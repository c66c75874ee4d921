use ordered_float::OrderedFloat;
use rand::Rng;
use rps_config::Config;
use rps_core::{squares_overlap, Individual, Kind, Position};

/// The whole arena. Ordered, fixed size after spawn; indices double as
/// identity in the pair scan.
pub type Population = Vec<Individual>;

/// What the frame loop should do after a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// More than one kind remains; schedule the next frame.
    Continue,
    /// Every individual shares this kind; render once more and stop.
    Settled(Kind),
}

/// Spawns the population cluster by cluster, in config order. Each
/// individual lands uniformly within `spawn_range` of its cluster center,
/// clamped into the world rectangle so every draw stays inside the clear
/// region.
pub fn spawn_population<R: Rng>(config: &Config, rng: &mut R) -> Population {
    let mut population = Vec::with_capacity(config.population_size());
    let max_x = (config.world.width - config.entity_size).max(0.0);
    let max_y = (config.world.height - config.entity_size).max(0.0);

    for cluster in &config.clusters {
        for _ in 0..cluster.count {
            let (mut x, mut y) = cluster.center;
            if config.spawn_range > 0.0 {
                x += rng.gen_range(-config.spawn_range..config.spawn_range);
                y += rng.gen_range(-config.spawn_range..config.spawn_range);
            }
            let position = Position::new(x.clamp(0.0, max_x), y.clamp(0.0, max_y));
            population.push(Individual::new(position, cluster.kind, config.speed));
        }
    }
    population
}

/// Moves every individual one step toward its nearest prey.
///
/// Targets come from a snapshot of the population as it stood on entry, so
/// every individual observes the same pre-move positions regardless of its
/// index. Ties on distance go to the first prey in population order. An
/// individual with no living prey stays put this frame.
pub fn move_pass(population: &mut Population) {
    let snapshot: Vec<(Kind, Position)> = population
        .iter()
        .map(|ind| (ind.kind, ind.position))
        .collect();

    for ind in population.iter_mut() {
        let prey = ind.kind.prey();
        let target = snapshot
            .iter()
            .filter(|(kind, _)| *kind == prey)
            .min_by_key(|(_, pos)| OrderedFloat(ind.position.distance(*pos)))
            .map(|(_, pos)| *pos);
        if let Some(target) = target {
            ind.step_toward(target);
        }
    }
}

/// Scans every ordered index pair (i, j), i != j, in population order and
/// converts the losing side of each overlapping mismatched pair.
///
/// Conversions take effect immediately, inside the scan. A single
/// individual can therefore convert more than once per frame depending on
/// pair order. That order dependence is observable behavior the arena is
/// defined by, not something to deduplicate away.
pub fn collision_pass(population: &mut Population, size: f32) {
    for i in 0..population.len() {
        for j in 0..population.len() {
            if i == j {
                continue;
            }
            if !squares_overlap(population[i].position, population[j].position, size) {
                continue;
            }
            let a = population[i].kind;
            let b = population[j].kind;
            if a == b {
                continue;
            }
            if a.prey() == b {
                population[j].convert(a);
            } else {
                population[i].convert(b);
            }
        }
    }
}

/// Per-kind population counts for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Census {
    pub rock: usize,
    pub paper: usize,
    pub scissor: usize,
}

impl Census {
    pub fn of(population: &Population) -> Self {
        let mut census = Census::default();
        for ind in population {
            match ind.kind {
                Kind::Rock => census.rock += 1,
                Kind::Paper => census.paper += 1,
                Kind::Scissor => census.scissor += 1,
            }
        }
        census
    }

    pub fn count(&self, kind: Kind) -> usize {
        match kind {
            Kind::Rock => self.rock,
            Kind::Paper => self.paper,
            Kind::Scissor => self.scissor,
        }
    }

    /// The one kind left standing, if the population is homogeneous.
    pub fn sole_survivor(&self) -> Option<Kind> {
        let mut survivor = None;
        for kind in Kind::ALL {
            if self.count(kind) > 0 {
                if survivor.is_some() {
                    return None;
                }
                survivor = Some(kind);
            }
        }
        survivor
    }
}

/// One simulation step: move, resolve collisions, take the census. The
/// render passes around it belong to the frame loop.
pub fn step(population: &mut Population, entity_size: f32) -> StepOutcome {
    move_pass(population);
    collision_pass(population, entity_size);
    match Census::of(population).sole_survivor() {
        Some(kind) => StepOutcome::Settled(kind),
        None => StepOutcome::Continue,
    }
}
