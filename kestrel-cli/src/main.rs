use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::time::Duration;

use anyhow::Error;
use clap::{value_t, values_t, App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use kestrel::config::{SolverConfig, SolverConfigUpdate};
use kestrel::{Limit, SolveResult, Solver};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("KESTREL_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is kestrel {}", env!("CARGO_PKG_VERSION"));
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("kestrel")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("[INPUT] 'The input file to use (stdin if omitted)'")
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help(
                    "Specify a single config option, see 'kestrel -C help' for a list of options.",
                )
                .multiple(true)
                .number_of_values(1),
        )
        .arg_from_usage("[conflict-limit] --conflicts=[N] 'Stop after this many conflicts'")
        .arg_from_usage("[decision-limit] --decisions=[N] 'Stop after this many decisions'")
        .arg_from_usage("[time-limit] --timeout=[SECONDS] 'Stop after this much wall clock time'")
        .get_matches();

    if values_t!(matches, "config-option", String)
        .unwrap_or_else(|_| vec![])
        .iter()
        .any(|option| option == "help")
    {
        print!("{}", SolverConfig::help());
        return Ok(0);
    }

    init_logging();
    banner();

    let mut config_update = SolverConfigUpdate::new();

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)?.read_to_string(&mut config_contents)?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in values_t!(matches, "config-option", String).unwrap_or_else(|_| vec![]) {
        config_update.merge(toml::from_str(&config_option)?);
    }

    let mut solver = Solver::new();

    solver.config(&config_update)?;

    if let Ok(bound) = value_t!(matches, "conflict-limit", u64) {
        solver.set_limit(Limit::Conflicts(bound));
    }
    if let Ok(bound) = value_t!(matches, "decision-limit", u64) {
        solver.set_limit(Limit::Decisions(bound));
    }
    if let Ok(seconds) = value_t!(matches, "time-limit", u64) {
        solver.set_limit(Limit::Time(Duration::from_secs(seconds)));
    }

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            opened_file = fs::File::open(path)?;
            &mut opened_file as &mut dyn io::Read
        }
        None => {
            info!("Reading from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin as &mut dyn io::Read
        }
    };

    solver.add_dimacs_cnf(file)?;

    match solver.solve() {
        SolveResult::Sat => {
            println!("s SATISFIABLE");
            print!("v");
            for lit in solver.model().unwrap() {
                print!(" {}", lit);
            }
            println!(" 0");
            Ok(10)
        }
        SolveResult::Unsat => {
            println!("s UNSATISFIABLE");
            Ok(20)
        }
        SolveResult::Unknown => {
            println!("s UNKNOWN");
            Ok(0)
        }
    }
}
