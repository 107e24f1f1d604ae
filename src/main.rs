use BioGasSim::ReactorsIVP::manager::{Manager, RunStatus};
use BioGasSim::Utils::load_from_file::InputData;
use BioGasSim::Utils::output::{print_summary, save_csv};
use BioGasSim::errors::DigesterError;
use BioGasSim::settings::load_config;
use log::{error, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::Path;
use std::process::ExitCode;

fn run(config_path: &Path) -> Result<RunStatus, DigesterError> {
    let config = load_config(config_path)?;
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let input = InputData::from_dir(config.data_dir(base)?)?;
    let mut manager = Manager::from_input(input, &config.settings)?;
    let result = manager.run();
    if let Some(output) = &config.settings.output {
        let raw = base.join(output);
        let files = save_csv(&raw, &result)?;
        info!(
            "results written to {}, {}, {} and {}",
            files.raw.display(),
            files.rates.display(),
            files.growth.display(),
            files.intervals.display()
        );
    }
    print_summary(&result);
    Ok(result.status)
}

fn main() -> ExitCode {
    if let Err(e) = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger unavailable: {}", e);
    }
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: BioGasSim <config.json>");
        return ExitCode::from(2);
    }
    match run(Path::new(&args[1])) {
        Ok(RunStatus::Completed) => ExitCode::SUCCESS,
        // partial results were still written
        Ok(RunStatus::Cancelled { .. }) | Ok(RunStatus::Failed { .. }) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}
