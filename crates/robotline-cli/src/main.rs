//! Command-line driver for the production line simulation.
//!
//! `auto` runs a scenario under an autonomous policy, `interactive` hands
//! the orders to a human, and `check` replays a scenario twice to verify the
//! run is byte-identical.

mod interactive;
mod policy;
mod scenario;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use robotline_core::fixed::money_to_f64;
use robotline_core::scheduler::Scheduler;
use robotline_core::validation::validate_determinism;
use std::path::PathBuf;

use crate::policy::{drive, GreedyPolicy, PlannerPolicy, Policy};

#[derive(Parser)]
#[command(name = "robotline")]
#[command(about = "Deterministic, tick-based robot production line simulation")]
struct Cli {
    /// Path to a scenario JSON file (built-in scenario when omitted)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Override the scenario's PRNG seed
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run autonomously until a stop condition hits
    Auto {
        /// Stop after this many ticks (overrides the scenario's horizon)
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        /// Stop once the fleet reaches this size (overrides the scenario)
        #[arg(long)]
        robot_cap: Option<u32>,

        /// Which driver decides the orders
        #[arg(long, value_enum, default_value = "planner")]
        policy: PolicyKind,

        /// Print a status line every n ticks (0 for final summary only)
        #[arg(long, default_value = "100")]
        report_every: u64,
    },

    /// Drive the simulation from a line-oriented prompt
    Interactive {
        /// Stop after this many ticks (overrides the scenario's horizon)
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Replay the scenario twice and verify the runs are identical
    Check {
        /// Number of ticks to replay
        #[arg(short, long, default_value = "500")]
        ticks: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyKind {
    /// First legal order, every time
    Greedy,
    /// Build robots, sell, assemble, mine, and travel with intent
    Planner,
}

impl PolicyKind {
    fn build(self) -> Box<dyn Policy> {
        match self {
            PolicyKind::Greedy => Box::new(GreedyPolicy),
            PolicyKind::Planner => Box::new(PlannerPolicy),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut scenario = scenario::load(cli.scenario.as_deref(), cli.seed)?;

    match cli.command {
        Commands::Auto {
            ticks,
            robot_cap,
            policy,
            report_every,
        } => {
            scenario.limits.tick_horizon = Some(ticks);
            if robot_cap.is_some() {
                scenario.limits.robot_cap = robot_cap;
            }
            run_auto(scenario.into_scheduler(), policy.build(), report_every)
        }
        Commands::Interactive { ticks } => {
            if ticks.is_some() {
                scenario.limits.tick_horizon = ticks;
            }
            interactive::run(scenario.into_scheduler())
        }
        Commands::Check { ticks } => run_check(&scenario, ticks),
    }
}

fn run_auto(mut sched: Scheduler, mut policy: Box<dyn Policy>, report_every: u64) -> Result<()> {
    while !sched.is_over() {
        drive(policy.as_mut(), &mut sched);
        sched.advance_tick();

        let tick = sched.world().tick();
        if report_every > 0 && tick % report_every == 0 {
            print_summary(&sched);
        }
    }

    println!("run over at tick {}", sched.world().tick());
    print_summary(&sched);
    Ok(())
}

fn print_summary(sched: &Scheduler) {
    let snap = sched.snapshot();
    let busy = snap.robots.iter().filter(|r| !r.is_idle()).count();
    let stock: Vec<String> = snap
        .stockpile
        .iter()
        .map(|e| format!("{} x{}", e.name, e.quantity))
        .collect();
    println!(
        "tick {:>6} | money {:>8.2} | robots {:>3} ({busy} busy) | {}",
        snap.tick,
        money_to_f64(snap.money),
        snap.robots.len(),
        if stock.is_empty() {
            "stockpile empty".to_string()
        } else {
            stock.join(", ")
        }
    );
}

fn run_check(scenario: &robotline_core::data_loader::Scenario, ticks: u64) -> Result<()> {
    let snapshot = scenario
        .world
        .serialize()
        .map_err(|e| anyhow::anyhow!("snapshot failed: {e}"))?;

    let result = validate_determinism(&scenario.catalog, &snapshot, ticks, |sched| {
        let mut policy = PlannerPolicy;
        drive(&mut policy, sched);
    })?;

    if result.is_deterministic {
        println!(
            "deterministic: {} ticks, final hash {:#018x}",
            result.hash_log.len(),
            result.hash_log.last().map(|(_, h, _)| *h).unwrap_or(0)
        );
        Ok(())
    } else {
        anyhow::bail!("runs diverged at tick {:?}", result.divergence_tick)
    }
}
