mod utils;
mod errors;
mod bids;
mod history;
mod mechanism;
mod gsp;
mod vcg;
mod agent;
mod agent_balanced;
mod agents;
mod clicks;
mod simulationrun;
mod scenarios;
mod logger;
mod charts;

use logger::{Logger, LogEvent, ConsoleReceiver, FileReceiver, sanitize_filename};
use std::path::PathBuf;

use scenarios::get_scenario_catalog;
use utils::{RAND_SEED, TOTAL_SIMULATION_RUNS};
use std::sync::atomic::Ordering;

/// Add a file receiver, reporting on stderr when the file cannot be created
fn add_file_receiver(logger: &mut Logger, path: PathBuf, events: Vec<LogEvent>) -> Option<logger::ReceiverId> {
    match FileReceiver::new(&path, events) {
        Ok(receiver) => Some(logger.add_receiver(receiver)),
        Err(e) => {
            eprintln!("Warning: cannot write log file {}: {}", path.display(), e);
            None
        }
    }
}

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();

    // Parse and filter out --verbose and --fastbreak arguments
    let mut args = Vec::new();
    let mut skip_next = false;
    let mut fastbreak = false;
    for (i, arg) in raw_args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--verbose" {
            if i + 1 < raw_args.len() && raw_args[i+1] == "auction" {
                utils::VERBOSE_AUCTION.store(true, Ordering::Relaxed);
                skip_next = true;
            }
            continue;
        }
        if arg == "--fastbreak" {
            fastbreak = true;
            continue;
        }
        args.push(arg.clone());
    }

    // Check if "charts" argument is provided
    if args.len() > 1 && args[1] == "charts" {
        match charts::generate_round_charts() {
            Ok(()) => {
                println!("Round chart generation completed successfully.");
            }
            Err(e) => {
                eprintln!("Error generating charts: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if args.len() > 1 {
        let scenario_arg = &args[1];

        // Parse iterations parameter if present
        let iterations = if args.len() > 2 {
            match args[2].parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!("Error: Invalid iterations parameter '{}'. Expected a number.", args[2]);
                    std::process::exit(1);
                }
            }
        } else {
            1
        };

        // Parse optional starting seed if present
        let start_iteration = if args.len() > 3 {
            match args[3].parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!("Error: Invalid start iteration parameter '{}'. Expected a number.", args[3]);
                    std::process::exit(1);
                }
            }
        } else {
            0
        };

        let all_scenarios = get_scenario_catalog();

        // Filter scenarios: if "all", use all scenarios; otherwise filter to the named scenario
        let scenarios: Vec<_> = if scenario_arg == "all" {
            all_scenarios.clone()
        } else {
            let found = all_scenarios.iter().find(|s| s.short_name == scenario_arg);
            match found {
                Some(scenario) => vec![scenario.clone()],
                None => {
                    eprintln!("Error: Scenario '{}' not found.", scenario_arg);
                    eprintln!("Available scenarios:");
                    for s in &all_scenarios {
                        eprintln!("  - {}", s.short_name);
                    }
                    std::process::exit(1);
                }
            }
        };

        // Individual validations go to the console only for a single scenario run once
        let mut logger = Logger::new();
        if scenario_arg != "all" && iterations == 1 {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation, LogEvent::Scenario]));
        } else {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
        }

        let summary_receiver_id = add_file_receiver(&mut logger, PathBuf::from("log/summary.log"), vec![LogEvent::Validation]);

        TOTAL_SIMULATION_RUNS.store(0, Ordering::Relaxed);

        if scenario_arg == "all" {
            logln!(&mut logger, LogEvent::Validation, "Running all scenarios {} time(s)...\n", iterations);
        } else {
            logln!(&mut logger, LogEvent::Validation, "Running scenario '{}' {} time(s)...\n", scenario_arg, iterations);
        }

        let mut failures = 0;

        // Outer loop for scenarios
        'scenarios: for scenario in &scenarios {
            log!(&mut logger, LogEvent::Validation, "{}: ", scenario.short_name);

            let scenario_receiver_id = add_file_receiver(
                &mut logger,
                PathBuf::from(format!("log/{}/scenario.log", sanitize_filename(scenario.short_name))),
                vec![LogEvent::Scenario],
            );

            // Inner loop for iterations
            for i in start_iteration..(start_iteration + iterations) {
                if iterations > 1 {
                    let iteration_num = i - start_iteration + 1;
                    log!(&mut logger, LogEvent::Validation, "[{}/{}] ", iteration_num, iterations);
                }

                // Set RAND_SEED to iteration number
                RAND_SEED.store(i, Ordering::Relaxed);

                match (scenario.run)(scenario.short_name, &mut logger) {
                    Ok(()) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✓");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✓ PASSED");
                        }
                    },
                    Err(e) => {
                        failures += 1;
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✗");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✗ FAILED: {}", e);
                        }

                        if fastbreak {
                            if let Some(id) = scenario_receiver_id {
                                logger.remove_receiver(id);
                            }
                            logln!(&mut logger, LogEvent::Validation, "\nStopping scenario execution due to failure (--fastbreak enabled)");
                            logln!(&mut logger, LogEvent::Validation, "Error at seed {}: {}", i, e);
                            break 'scenarios;
                        }
                    }
                }

                // Flush to ensure validation is written to summary.log
                let _ = logger.flush();
            }

            if let Some(id) = scenario_receiver_id {
                logger.remove_receiver(id);
            }
        }

        let final_count = TOTAL_SIMULATION_RUNS.load(Ordering::Relaxed);
        logln!(&mut logger, LogEvent::Validation, "\nTotal simulation runs completed: {}", final_count);

        if let Some(id) = summary_receiver_id {
            logger.remove_receiver(id);
        }
        if failures > 0 {
            std::process::exit(1);
        }
    } else {
        // Default: run the balanced bidding scenario with per-variant output on the console
        RAND_SEED.store(0, Ordering::Relaxed);
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Simulation, LogEvent::Variant, LogEvent::Scenario]));
        if let Err(e) = scenarios::balanced_bidding::run("balanced_bidding", &mut logger) {
            eprintln!("Error running scenario: {}", e);
            std::process::exit(1);
        }
    }
}
