//! Command dispatch and execution

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::application::services::{OptimizeOutcome, StopReason, StopSignal};
use crate::cli::args::{Cli, Commands, ConfigCommands, InputArgs, RunArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output::{action, detail, header, info, success, warning};
use crate::config::{global_config_path, Settings, UnmatchedLeafPolicy};
use crate::domain::{ScoreBreakdown, TreeCollection};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Execute the parsed CLI command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Run(args)) => cmd_run(cli, args),
        Some(Commands::Score { input }) => cmd_score(cli, input),
        Some(Commands::Show { input }) => cmd_show(cli, input),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `detangle --help`".into(),
        )),
    }
}

/// Load layered settings and apply input flags on top.
fn load_settings(cli: &Cli, input: &InputArgs) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if input.strict {
        settings.objective.unmatched_leaves = UnmatchedLeafPolicy::Strict;
    }
    Ok(settings)
}

/// Apply `run` flags on top of loaded settings.
pub fn apply_run_overrides(settings: &mut Settings, args: &RunArgs) -> CliResult<()> {
    if let Some(dir) = &args.output_dir {
        settings.output.dir = dir.clone();
    }
    if args.seed.is_some() {
        settings.optimizer.seed = args.seed;
    }
    if args.skip_first_tree {
        settings.optimizer.skip_first_tree = true;
    }
    if let Some(intensity) = args.starting_intensity {
        settings.optimizer.starting_intensity = intensity;
    }
    if let Some(max_count) = args.max_count {
        settings.optimizer.max_count = max_count;
    }
    settings.validate()?;
    Ok(())
}

fn load_trees(container: &ServiceContainer, files: &[PathBuf]) -> CliResult<TreeCollection> {
    Ok(container.loader().load(files)?)
}

#[instrument(skip(cli))]
fn cmd_run(cli: &Cli, args: &RunArgs) -> CliResult<()> {
    let mut settings = load_settings(cli, &args.input)?;
    apply_run_overrides(&mut settings, args)?;
    debug!("effective settings: {:?}", settings);

    let container = ServiceContainer::new(settings);
    let mut trees = load_trees(&container, &args.input.files)?;

    let stop = StopSignal::new();
    install_interrupt_handler(stop.clone())?;

    let mut writer = container.checkpoint_writer();
    let optimizer = container.optimizer(stop);
    let mut rng = container.rng();
    let outcome = optimizer.run(&mut trees, &mut rng, &mut writer);

    print_outcome(&outcome, &trees);
    let canonical = &writer.paths().canonical;
    if outcome.final_written {
        success(&format!("best state written to {}", canonical.display()));
    } else {
        warning(&format!("could not write {}", canonical.display()));
    }
    if outcome.failed_writes > 0 {
        warning(&format!("{} checkpoint writes failed", outcome.failed_writes));
    }
    Ok(())
}

/// Route Ctrl-C to the optimizer's stop signal.
fn install_interrupt_handler(stop: StopSignal) -> CliResult<()> {
    match ctrlc::set_handler(move || stop.request()) {
        Ok(()) => Ok(()),
        Err(ctrlc::Error::MultipleHandlers) => {
            warn!("interrupt handler already installed");
            Ok(())
        }
        Err(e) => Err(InfraError::from(e).into()),
    }
}

fn print_outcome(outcome: &OptimizeOutcome, trees: &TreeCollection) {
    let reason = match outcome.stop_reason {
        StopReason::Cooled => "search cooled down",
        StopReason::MaxCount => "pass limit reached",
        StopReason::Interrupted => "interrupted",
    };
    header(&format!("Finished: {}", reason));
    action("Objective", &format!("{} -> {}", outcome.initial, outcome.best));
    action("Passes", &outcome.completed_passes);
    action("Improvements", &outcome.improvements);
    print_breakdown(&ScoreBreakdown::of_trees(trees));
}

fn print_breakdown(score: &ScoreBreakdown) {
    detail(&format!("crossings: {}", score.crossings));
    detail(&format!("flatness:  {}", score.flatness));
    detail(&format!("alpha:     {}", score.alpha));
}

#[instrument(skip(cli))]
fn cmd_score(cli: &Cli, input: &InputArgs) -> CliResult<()> {
    let container = ServiceContainer::new(load_settings(cli, input)?);
    let trees = load_trees(&container, &input.files)?;

    let score = ScoreBreakdown::of_trees(&trees);
    let objective = container.settings.objective.weighted();
    header(&format!("{} trees", trees.len()));
    print_breakdown(&score);
    action("Objective", &objective.combine(&score));
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_show(cli: &Cli, input: &InputArgs) -> CliResult<()> {
    let container = ServiceContainer::new(load_settings(cli, input)?);
    let trees = load_trees(&container, &input.files)?;

    for tree in trees.iter() {
        info(&tree.display_tree());
        detail(&format!("leaves: {}", tree.leaves().iter().join(" ")));
        detail(&format!("twists: {:?}", tree.twists()));
    }
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            info(&settings.to_toml()?);
        }
        ConfigCommands::Template => info(&Settings::template()),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => info(&path.display()),
            None => warning("no home directory, global config disabled"),
        },
    }
    Ok(())
}
