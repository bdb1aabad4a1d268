//! Command-line demos and benchmarks for the [`hornet`] execution core.
//!
//! Every program is built from terms in [`programs`] and run through a
//! [`Database`]; logging goes through `env_logger` and is controlled by
//! `RUST_LOG` (e.g. `RUST_LOG=hornet::database=debug`).

mod programs;

use clap::{Parser as ClapParser, Subcommand};
use hornet::{
    func, list, var, CallSite, ChoicePoint, Code, Config, Database, Frame, Predicate, Procedure,
    PrologError, Query, Solution, Term,
};
use log::info;
use std::cell::Cell;
use std::mem;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::time::Instant;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Capacity of the compiled goal cache
    #[arg(long, global = true, default_value_t = NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN))]
    cache_capacity: NonZeroUsize,

    /// Starts from a database without built-in predicates
    #[arg(long, global = true)]
    bare: bool,

    /// Command
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints sizes
    Sizes {},
    /// Solves the N-queens problem
    Queens {
        /// Board size
        #[arg(short, long, default_value_t = 8)]
        n: i64,
        /// Prints every solution instead of the first
        #[arg(short, long)]
        all: bool,
    },
    /// Runs the naive reverse benchmark
    Nrev {
        /// List length
        #[arg(short, long, default_value_t = 30)]
        length: i64,
        /// Number of reversals
        #[arg(short, long, default_value_t = 100)]
        iterations: i64,
    },
    /// Runs a tail-recursive loop and reports the deepest frame chain
    Count {
        /// Number of iterations
        #[arg(short, long, default_value_t = 100_000)]
        n: i64,
    },
    /// Runs a few example queries
    Demo {},
}

/// `gauge/0`: records the depth of the frame chain and succeeds.
struct DepthGauge {
    max: Rc<Cell<usize>>,
}

impl Procedure for DepthGauge {
    fn predicate(&self) -> Option<Predicate> {
        Some(Predicate::new("gauge", 0))
    }

    fn call(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
        self.max.set(self.max.get().max(query.depth()));
        Ok(site.next.clone())
    }
}

fn print_solutions(goal: &Term, solutions: &[Solution]) {
    println!("?- {}.", goal);
    if solutions.is_empty() {
        println!("false.");
    }
    for solution in solutions {
        println!("{}", solution);
    }
}

fn demo(db: &Rc<Database>) -> Result<(), PrologError> {
    db.consult(programs::member())?;
    let goals = [
        func!("="; func!("f"; var!("X"), 1), func!("f"; 2, var!("Y"))),
        func!("="; func!("f"; var!("X"), 1), func!("g"; var!("X"), 1)),
        func!("member"; var!("X"), list![1, 2, 3]),
        func!(";"; func!("->"; "true", func!("write"; "a")), func!("write"; "b")),
        func!("catch"; func!("throw"; func!("foo"; 1)), func!("foo"; var!("X")), "true"),
        func!("findall"; var!("X"), func!("member"; var!("X"), list![1, 2, 3]), var!("L")),
        func!("findall"; var!("X"), func!("member"; var!("X"), Term::nil()), var!("L")),
    ];
    for goal in &goals {
        let solutions = db.query(goal)?.solutions()?;
        print_solutions(goal, &solutions);
    }
    let goal = func!("catch"; func!("throw"; "bar"), func!("foo"; var!("X")), "true");
    match db.query(&goal)?.solutions() {
        Ok(solutions) => print_solutions(&goal, &solutions),
        Err(err) => println!("?- {}.\n{}", goal, err),
    }
    Ok(())
}

fn main() -> Result<(), PrologError> {
    env_logger::init();

    let args = Args::parse();
    let db = Database::with_config(Config {
        code_cache_capacity: args.cache_capacity,
        builtins: !args.bare,
    })?;

    match args.command {
        Commands::Sizes {} => {
            println!("Size of Term: {}", mem::size_of::<Term>());
            println!("Size of Option<Term>: {}", mem::size_of::<Option<Term>>());
            println!("Size of Code: {}", mem::size_of::<Code>());
            println!("Size of Frame: {}", mem::size_of::<Frame>());
            println!("Size of ChoicePoint: {}", mem::size_of::<ChoicePoint>());
        }
        Commands::Queens { n, all } => {
            db.consult(programs::queens())?;
            let goal = func!("queens"; n, var!("Qs"));
            let start = Instant::now();
            let mut query = db.query(&goal)?;
            let mut found = 0usize;
            while let Some(solution) = query.ask()? {
                found += 1;
                println!("{}", solution);
                if !all {
                    break;
                }
            }
            if found == 0 {
                println!("false.");
            }
            info!("queens({}): {} solution(s) in {:?}", n, found, start.elapsed());
        }
        Commands::Nrev { length, iterations } => {
            db.consult(programs::nrev())?;
            let goal = func!(",";
                func!("range"; 1, length, var!("L")),
                func!("bench"; iterations, var!("L")));
            let start = Instant::now();
            let ok = db.query(&goal)?.ask()?.is_some();
            let elapsed = start.elapsed();
            println!(
                "nrev{} x {}: {} in {:?}",
                length,
                iterations,
                if ok { "ok" } else { "failed" },
                elapsed
            );
        }
        Commands::Count { n } => {
            let max = Rc::new(Cell::new(0));
            db.register(Rc::new(DepthGauge { max: max.clone() }))?;
            db.consult(programs::count())?;
            let start = Instant::now();
            let ok = db.query(&func!("count"; 0, n))?.ask()?.is_some();
            println!(
                "count({}): {} in {:?}, max depth {}",
                n,
                if ok { "ok" } else { "failed" },
                start.elapsed(),
                max.get()
            );
        }
        Commands::Demo {} => demo(&db)?,
    }
    Ok(())
}
