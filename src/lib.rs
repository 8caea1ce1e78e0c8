/*
    # Genetic Data
    Agent
        - owns exactly one network and is dropped together with it
        - only tracks progress that is needed to score it (checkpoint, laps, eliminated)
        Brain - fixed topology feed-forward network
            Layers - dense weights (input x output) + biases, ReLU activation
        Body - environment interface
            Sensors - ray distances + proprioception (speed, steering, throttle, drifting)
            Actions - accelerate, reverse, left, right, handbrake (+ recover traction)
        Genome - flat persisted form of a brain
            layer sizes tag the topology, weights are stored output node major
    Controller
        - external simulation, only reachable through sensors/actions/positions/events
        respawn(count) - replace all vehicles
        step(dt, emit) - advance physics and report obstacle/checkpoint events
    Trainer
        - single best-of-population replicator
        tick(dt)
            drive all agents
            apply events
            evaluate - closest qualifying agent to the target checkpoint
            checkpoint reached -> persist, shrink deviation, regenerate, more time
            time exceeded -> persist on progress, regenerate
    BrainStore
        save(brain) - whole object overwrite
        load() -> brain
*/

pub mod agent;
pub mod config;
mod error;
pub mod world;

pub use error::*;
