use clap::{Parser, ValueEnum};

use petri_reach::config::AnalysisConfig;
use petri_reach::deadlock::{find_deadlock_with_oracle, DeadlockOutcome};
use petri_reach::net::{NetBuilder, NetModel};
use petri_reach::optimize::{minimize_marking, optimize_marking};
use petri_reach::order::OrderStrategy;
use petri_reach::reach::ReachabilitySolver;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Model {
    /// One token circulating over `n` places.
    Ring,
    /// Two processes sharing a lock.
    Mutex,
    /// Dining philosophers, each grabbing the left fork first.
    Philosophers,
    /// Producer and consumer around a one-slot buffer.
    Buffer,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Order {
    Bfs,
    Identity,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Net to analyze.
    #[arg(value_enum, default_value = "philosophers")]
    model: Model,

    /// Size parameter (ring length, number of philosophers).
    #[arg(short, long, value_name = "INT", default_value = "5")]
    n: usize,

    /// Variable ordering heuristic.
    #[arg(long, value_enum, default_value = "bfs")]
    order: Order,

    /// Unique table size (in bits, so the initial size is `2^size` buckets).
    #[arg(long, value_name = "INT", default_value = "16")]
    size: usize,

    /// Candidate markings tried by the deadlock search.
    #[arg(long, value_name = "INT", default_value = "100")]
    max_attempts: usize,

    /// Seed of the random deadlock objectives.
    #[arg(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Do not add place invariants to the deadlock program.
    #[arg(long)]
    no_invariants: bool,

    /// Write the reachable-set diagram to this file in DOT format.
    #[arg(long, value_name = "FILE")]
    dot: Option<std::path::PathBuf>,
}

fn ring(n: usize) -> petri_reach::Result<NetModel> {
    let mut builder = NetBuilder::new();
    let places: Vec<_> = (0..n).map(|i| builder.place(format!("p{}", i), i == 0)).collect();
    for i in 0..n {
        builder.transition(format!("t{}", i), [places[i]], [places[(i + 1) % n]]);
    }
    builder.build()
}

fn mutex() -> petri_reach::Result<NetModel> {
    let mut builder = NetBuilder::new();
    let lock = builder.place("lock", true);
    for i in 1..=2 {
        let idle = builder.place(format!("idle{}", i), true);
        let critical = builder.place(format!("critical{}", i), false);
        builder.transition(format!("enter{}", i), [idle, lock], [critical]);
        builder.transition(format!("leave{}", i), [critical], [idle, lock]);
    }
    builder.build()
}

fn philosophers(n: usize) -> petri_reach::Result<NetModel> {
    let mut builder = NetBuilder::new();
    let forks: Vec<_> = (0..n).map(|i| builder.place(format!("fork{}", i), true)).collect();
    for i in 0..n {
        let left = forks[i];
        let right = forks[(i + 1) % n];
        let thinking = builder.place(format!("thinking{}", i), true);
        let waiting = builder.place(format!("waiting{}", i), false);
        let eating = builder.place(format!("eating{}", i), false);
        builder.transition(format!("take_left{}", i), [thinking, left], [waiting]);
        builder.transition(format!("take_right{}", i), [waiting, right], [eating]);
        builder.transition(format!("release{}", i), [eating], [thinking, left, right]);
    }
    builder.build()
}

fn buffer() -> petri_reach::Result<NetModel> {
    let mut builder = NetBuilder::new();
    let ready = builder.place("ready", true);
    let produced = builder.place("produced", false);
    let empty = builder.place("empty", true);
    let full = builder.place("full", false);
    let waiting = builder.place("waiting", true);
    let consumed = builder.place("consumed", false);
    builder.transition("produce", [ready], [produced]);
    builder.transition("put", [produced, empty], [ready, full]);
    builder.transition("get", [waiting, full], [consumed, empty]);
    builder.transition("consume", [consumed], [waiting]);
    builder.build()
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let net = match args.model {
        Model::Ring => ring(args.n)?,
        Model::Mutex => mutex()?,
        Model::Philosophers => philosophers(args.n)?,
        Model::Buffer => buffer()?,
    };
    println!(
        "net: {} places, {} transitions, initial marking {}",
        net.num_places(),
        net.num_transitions(),
        net.initial_marking()
    );

    let config = AnalysisConfig::default()
        .with_storage_bits(args.size)
        .with_order(match args.order {
            Order::Bfs => OrderStrategy::Bfs,
            Order::Identity => OrderStrategy::Identity,
        })
        .with_max_attempts(args.max_attempts)
        .with_seed(args.seed)
        .with_invariants(!args.no_invariants);

    println!("Computing reachable markings...");
    let reach = ReachabilitySolver::new(&net, config.clone()).solve()?;
    for round in reach.stats() {
        println!(
            "  round {}: +{} markings, {} total, {} nodes",
            round.iteration, round.new_states, round.reachable_states, round.diagram_size
        );
    }
    println!("reachable markings: {}", reach.count());
    println!("bdd = {:?}", reach.bdd());

    if let Some(path) = &args.dot {
        std::fs::write(path, reach.to_dot(&net)?)?;
        println!("diagram written to {}", path.display());
    }

    println!("Searching for a deadlock...");
    let report = find_deadlock_with_oracle(&net, &reach, &config)?;
    match &report.outcome {
        DeadlockOutcome::Found(marking) => println!("deadlock: {}", marking),
        DeadlockOutcome::NoDeadlock => println!("no deadlock"),
        DeadlockOutcome::Undetermined { attempts } => println!("undetermined after {} attempts", attempts),
    }
    println!(
        "  {} attempts, {} cuts, {} invariants",
        report.attempts, report.cuts, report.invariants
    );

    let ids: Vec<&str> = net.places().iter().map(|p| p.id.as_str()).collect();
    let ones = vec![1; ids.len()];
    if let Some((marking, tokens)) = optimize_marking(&ids, &reach, &ones)? {
        println!("most tokens: {} in {}", tokens, marking);
    }
    if let Some((marking, tokens)) = minimize_marking(&ids, &reach, &ones)? {
        println!("fewest tokens: {} in {}", tokens, marking);
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
