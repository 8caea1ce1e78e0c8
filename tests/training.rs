use anyhow::Result;
use evo_drive::{
    Error,
    agent::*,
    config::{Bootstrap, TrainerConfig},
    world::*,
};
use rand::{SeedableRng, rngs::StdRng};

const FAR: Position = [1000.0, 0.0, 0.0];
const CHECKPOINTS: usize = 10;

/// Controller that only moves agents when a test tells it to.
#[derive(Debug)]
struct Scripted {
    checkpoints: Vec<Position>,
    positions:   Vec<Position>,
    respawns:    usize,
    pending:     Vec<Event>,
}
impl Scripted {
    fn new() -> Self {
        Self {
            checkpoints: (0..CHECKPOINTS).map(|k| [20.0 * k as f32, 0.0, 0.0]).collect(),
            positions:   Vec::new(),
            respawns:    0,
            pending:     Vec::new(),
        }
    }
}
impl Controller for Scripted {
    fn checkpoints(&self) -> &[Position] {
        &self.checkpoints
    }

    fn respawn(&mut self, count: usize) {
        self.positions = vec![FAR; count];
        self.respawns += 1;
    }

    fn read_sensors(&mut self, _agent: usize, rays: &mut [f32]) -> Proprioception {
        rays.fill(0.0);
        Proprioception::default()
    }

    fn perform_actions(&mut self, _agent: usize, _actuation: Actuation) {}

    fn position(&self, agent: usize) -> Position {
        self.positions[agent]
    }

    fn step(&mut self, _dt: f32, mut emit: impl FnMut(Event)) {
        self.pending.drain(..).for_each(&mut emit);
    }
}

/// Store whose writes always fail.
#[derive(Debug, Default)]
struct ReadOnlyStore {
    brain: Option<SavedBrain>,
}
impl BrainStore for ReadOnlyStore {
    fn save(&mut self, _brain: &SavedBrain) -> evo_drive::Result<()> {
        Err(Error::PersistenceWrite { path: "read-only".into(), source: "disk full".into() })
    }

    fn load(&self) -> evo_drive::Result<SavedBrain> {
        self.brain.clone().ok_or_else(|| Error::PersistenceRead {
            path:   "read-only".into(),
            source: "empty".into(),
        })
    }
}

fn config() -> TrainerConfig {
    TrainerConfig { population_size: 20, seed: Some(7), ..Default::default() }
}

fn random_brain(sizes: &[usize]) -> Result<SavedBrain> {
    let mut network = Network::new(sizes)?;
    network.randomize_all(&mut StdRng::seed_from_u64(99));
    Ok(SavedBrain::from_network(&network))
}

/// Ticks until something other than [`TickOutcome::Running`] happens.
fn run_until_event<S: BrainStore>(
    trainer: &mut Trainer<Scripted, S>,
    dt: f32,
) -> Result<TickOutcome> {
    for _ in 0..1000 {
        let outcome = trainer.tick(dt)?;
        if outcome != TickOutcome::Running {
            return Ok(outcome);
        }
    }
    anyhow::bail!("trainer kept running")
}

#[test]
fn reaching_the_checkpoint_advances_and_mutates() -> Result<()> {
    let config = TrainerConfig { population_size: 100, ..config() };
    let mut trainer = Trainer::new(config, Scripted::new(), MemoryStore::new())?;
    trainer.controller_mut().positions[7] = [3.2, 0.0, 0.0];
    let expected = SavedBrain::from_network(trainer.agents()[7].network());

    let outcome = trainer.tick(0.02)?;
    assert_eq!(outcome, TickOutcome::CheckpointAdvanced { checkpoint: 1, lap: 0 });
    assert_eq!(trainer.store().brain(), Some(&expected));
    assert_eq!(trainer.store().saves(), 1);
    assert_eq!(trainer.parent(), Some(&expected));
    assert!(trainer.best().is_none());

    let status = trainer.status();
    assert!((status.deviation - 0.18).abs() < 1e-6);
    assert!((status.time_budget - 15.1).abs() < 1e-4);
    assert_eq!(status.loops_completed, 1);
    assert_eq!(status.best_distance_this_checkpoint, 10_000.0);
    assert_eq!(status.agents, 100);
    assert_eq!(trainer.controller().respawns, 2);

    let agents = trainer.agents();
    assert_ne!(agents[0].network(), agents[1].network());
    for agent in agents {
        assert!(agent.mutation().is_some_and(|d| (d.get() - 0.18).abs() < 1e-6));
        let child = SavedBrain::from_network(agent.network());
        assert_ne!(child, expected);
        let drift = child
            .weights
            .iter()
            .zip(&expected.weights)
            .chain(child.biases.iter().zip(&expected.biases))
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(drift <= 0.36 + 1e-6, "{drift}");
    }
    Ok(())
}

#[test]
fn timeout_persists_only_improvements() -> Result<()> {
    let config = TrainerConfig { time_budget: 1.0, ..config() };
    let mut trainer = Trainer::new(config, Scripted::new(), MemoryStore::new())?;
    trainer.controller_mut().positions[3] = [8.0, 0.0, 0.0];
    let expected = SavedBrain::from_network(trainer.agents()[3].network());

    assert_eq!(run_until_event(&mut trainer, 0.5)?, TickOutcome::TimedOut { saved: true });
    let status = trainer.status();
    assert_eq!(status.best_distance_this_checkpoint, 8.0);
    assert!((status.time_budget - 1.1).abs() < 1e-6);
    assert_eq!(status.loops_completed, 1);
    assert_eq!(status.checkpoint, 0);
    assert_eq!(trainer.store().brain(), Some(&expected));
    assert!(trainer.best().is_none());

    // regenerated agents start far away again and do not beat the stored distance
    assert_eq!(run_until_event(&mut trainer, 0.5)?, TickOutcome::TimedOut { saved: false });
    let status = trainer.status();
    assert_eq!(status.best_distance_this_checkpoint, 8.0);
    assert!((status.time_budget - 1.1).abs() < 1e-6);
    assert_eq!(status.loops_completed, 2);
    assert_eq!(trainer.store().saves(), 1);
    assert!(trainer.agents().iter().all(|agent| agent.mutation().is_some()));
    Ok(())
}

#[test]
fn resumed_generation_without_progress_is_not_saved() -> Result<()> {
    let brain = random_brain(&[15, 10, 5])?;
    let config = TrainerConfig { time_budget: 1.0, bootstrap: Bootstrap::Resume, ..config() };
    let mut trainer = Trainer::new(config, Scripted::new(), MemoryStore::with_brain(brain.clone()))?;
    assert_eq!(trainer.parent(), Some(&brain));
    assert!(trainer.agents().iter().all(|agent| agent.mutation().is_some()));

    for index in 0..trainer.agents().len() {
        trainer
            .controller_mut()
            .pending
            .push(Event::ObstacleHit { agent: index, kind: ObstacleKind::TerrainHazard });
    }
    assert_eq!(run_until_event(&mut trainer, 0.5)?, TickOutcome::TimedOut { saved: false });
    let status = trainer.status();
    assert_eq!(status.loops_completed, 1);
    assert_eq!(status.time_budget, 1.0);
    assert_eq!(trainer.store().saves(), 0);
    assert_eq!(trainer.parent(), Some(&brain));
    Ok(())
}

#[test]
fn timeout_ignores_agents_past_the_target_checkpoint() -> Result<()> {
    let config = TrainerConfig { time_budget: 1.0, ..config() };
    let mut trainer = Trainer::new(config, Scripted::new(), MemoryStore::new())?;
    let controller = trainer.controller_mut();
    controller.positions[3] = [8.0, 0.0, 0.0];
    controller.pending.push(Event::CheckpointReached { agent: 3, index: 4 });

    assert_eq!(trainer.tick(0.5)?, TickOutcome::Running);
    assert_eq!(trainer.best().map(|(index, agent)| (index, agent.checkpoint())), Some((3, 4)));
    assert_eq!(run_until_event(&mut trainer, 0.5)?, TickOutcome::TimedOut { saved: false });
    let status = trainer.status();
    assert_eq!(trainer.store().saves(), 0);
    assert_eq!(status.time_budget, 1.0);
    assert_eq!(status.best_distance_this_checkpoint, 10_000.0);
    Ok(())
}

#[test]
fn timeout_ignores_agents_on_another_lap() -> Result<()> {
    let config = TrainerConfig { time_budget: 1.0, ..config() };
    let mut trainer = Trainer::new(config, Scripted::new(), MemoryStore::new())?;
    let population = trainer.agents().len();
    let controller = trainer.controller_mut();
    controller.positions[3] = [8.0, 0.0, 0.0];
    controller.pending.extend([
        Event::CheckpointReached { agent: 3, index: 9 },
        Event::CheckpointReached { agent: 3, index: 0 },
    ]);
    controller.pending.extend(
        (0..population)
            .filter(|agent| *agent != 3)
            .map(|agent| Event::ObstacleHit { agent, kind: ObstacleKind::TerrainHazard }),
    );

    assert_eq!(trainer.tick(0.5)?, TickOutcome::Running);
    assert_eq!(trainer.agents()[3].laps_completed(), 1);
    assert_eq!(trainer.agents()[3].checkpoint(), 0);
    assert!(trainer.best().is_none());
    assert_eq!(run_until_event(&mut trainer, 0.5)?, TickOutcome::TimedOut { saved: false });
    assert_eq!(trainer.store().saves(), 0);
    assert_eq!(trainer.status().time_budget, 1.0);
    Ok(())
}

#[test]
fn eliminated_and_lapped_agents_are_not_candidates() -> Result<()> {
    let mut trainer = Trainer::new(config(), Scripted::new(), MemoryStore::new())?;
    let controller = trainer.controller_mut();
    controller.positions[2] = [1.0, 0.0, 0.0];
    controller.positions[5] = [2.0, 0.0, 0.0];
    controller.pending.extend([
        Event::ObstacleHit { agent: 2, kind: ObstacleKind::TerrainHazard },
        Event::CheckpointReached { agent: 5, index: 9 },
        Event::CheckpointReached { agent: 5, index: 0 },
        Event::ObstacleHit { agent: 11, kind: ObstacleKind::Other },
        Event::CheckpointReached { agent: 500, index: 1 },
    ]);

    assert_eq!(trainer.tick(0.1)?, TickOutcome::Running);
    assert!(trainer.agents()[2].is_eliminated());
    assert!(!trainer.agents()[11].is_eliminated());
    assert_eq!(trainer.agents()[5].laps_completed(), 1);
    let (best, _) = trainer.best().expect("agents at the start line still qualify");
    assert!(best != 2 && best != 5);
    assert_eq!(trainer.status().best_distance, 1000.0);
    Ok(())
}

#[test]
fn nobody_qualifying_leaves_no_best() -> Result<()> {
    let mut trainer = Trainer::new(config(), Scripted::new(), MemoryStore::new())?;
    for agent in 0..trainer.agents().len() {
        trainer
            .controller_mut()
            .pending
            .push(Event::ObstacleHit { agent, kind: ObstacleKind::TerrainHazard });
    }
    assert_eq!(trainer.tick(0.1)?, TickOutcome::Running);
    assert!(trainer.best().is_none());
    assert_eq!(trainer.status().best_distance, 10_000.0);
    Ok(())
}

#[test]
fn deviation_decays_to_the_floor_over_a_lap() -> Result<()> {
    let mut trainer = Trainer::new(config(), Scripted::new(), MemoryStore::new())?;
    for advance in 1..=CHECKPOINTS {
        let target = trainer.controller().checkpoints()[trainer.status().checkpoint];
        trainer.controller_mut().positions[0] = target;
        let outcome = trainer.tick(0.02)?;
        let expected = if advance == CHECKPOINTS {
            TickOutcome::CheckpointAdvanced { checkpoint: 0, lap: 1 }
        } else {
            TickOutcome::CheckpointAdvanced { checkpoint: advance, lap: 0 }
        };
        assert_eq!(outcome, expected);
        assert!(trainer.status().deviation >= 0.07);
    }
    let status = trainer.status();
    assert_eq!(status.deviation, 0.07);
    assert_eq!(status.loops_completed, CHECKPOINTS);
    assert_eq!(trainer.store().saves(), CHECKPOINTS);

    // a new lap needs agents that completed the previous one
    let start = trainer.controller().checkpoints()[0];
    trainer.controller_mut().positions[0] = start;
    assert_eq!(trainer.tick(0.02)?, TickOutcome::Running);
    assert!(trainer.best().is_none());
    Ok(())
}

#[test]
fn failed_write_keeps_training() -> Result<()> {
    let mut trainer = Trainer::new(config(), Scripted::new(), ReadOnlyStore::default())?;
    trainer.controller_mut().positions[4] = [0.5, 0.0, 0.0];
    let expected = SavedBrain::from_network(trainer.agents()[4].network());

    let outcome = trainer.tick(0.02)?;
    assert_eq!(outcome, TickOutcome::CheckpointAdvanced { checkpoint: 1, lap: 0 });
    assert_eq!(trainer.parent(), Some(&expected));
    assert!(trainer.agents().iter().all(|agent| agent.mutation().is_some()));
    Ok(())
}

#[test]
fn timeout_without_any_brain_starts_over_randomly() -> Result<()> {
    let config = TrainerConfig { time_budget: 1.0, ..config() };
    let mut trainer = Trainer::new(config, Scripted::new(), ReadOnlyStore::default())?;
    for agent in 0..trainer.agents().len() {
        trainer
            .controller_mut()
            .pending
            .push(Event::ObstacleHit { agent, kind: ObstacleKind::TerrainHazard });
    }
    let before = trainer.agents()[0].network().clone();

    assert_eq!(run_until_event(&mut trainer, 0.5)?, TickOutcome::TimedOut { saved: false });
    assert!(trainer.parent().is_none());
    assert_eq!(trainer.agents().len(), 20);
    assert!(trainer.agents().iter().all(|agent| agent.mutation().is_none()));
    assert_ne!(trainer.agents()[0].network(), &before);
    Ok(())
}

#[test]
fn foreign_stored_brain_is_not_adopted() -> Result<()> {
    let config = TrainerConfig { time_budget: 1.0, ..config() };
    let store = MemoryStore::with_brain(random_brain(&[15, 8, 5])?);
    let mut trainer = Trainer::new(config, Scripted::new(), store)?;
    for round in 1..=2 {
        for agent in 0..trainer.agents().len() {
            trainer
                .controller_mut()
                .pending
                .push(Event::ObstacleHit { agent, kind: ObstacleKind::TerrainHazard });
        }
        assert_eq!(run_until_event(&mut trainer, 0.5)?, TickOutcome::TimedOut { saved: false });
        assert_eq!(trainer.status().loops_completed, round);
        assert!(trainer.parent().is_none());
        assert!(trainer.agents().iter().all(|agent| agent.mutation().is_none()));
    }
    Ok(())
}

#[test]
fn resume_requires_a_fitting_brain() -> Result<()> {
    let config = TrainerConfig { bootstrap: Bootstrap::Resume, ..config() };
    let missing = Trainer::new(config.clone(), Scripted::new(), MemoryStore::new());
    assert!(matches!(missing, Err(Error::PersistenceRead { .. })));

    let foreign = MemoryStore::with_brain(random_brain(&[15, 8, 5])?);
    let mismatched = Trainer::new(config, Scripted::new(), foreign);
    assert!(matches!(mismatched, Err(Error::ShapeMismatch { .. })));
    Ok(())
}

#[test]
fn invalid_setup_is_rejected() {
    let empty = Scripted { checkpoints: Vec::new(), ..Scripted::new() };
    let result = Trainer::new(config(), empty, MemoryStore::new());
    assert!(matches!(result, Err(Error::NoCheckpoints)));

    let config = TrainerConfig { population_size: 0, ..config() };
    let result = Trainer::new(config, Scripted::new(), MemoryStore::new());
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn json_store_survives_a_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("best_brain.json");

    let mut trainer = Trainer::new(config(), Scripted::new(), JsonFileStore::new(&path))?;
    trainer.controller_mut().positions[9] = [1.0, 0.0, 0.0];
    let expected = SavedBrain::from_network(trainer.agents()[9].network());
    trainer.tick(0.02)?;
    assert!(path.exists());

    let config = TrainerConfig { bootstrap: Bootstrap::Resume, ..config() };
    let resumed = Trainer::new(config, Scripted::new(), JsonFileStore::new(&path))?;
    assert_eq!(resumed.parent(), Some(&expected));
    assert_eq!(resumed.store().load()?, expected);
    Ok(())
}
