mod cli;

use clap::Parser;
use cli::{Args, config_file, load_config, unknown_field_warning};
use code_fix::{AssumeYes, FixConfig, FixError, PromptConfirm, run_fix};
use directories::ProjectDirs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        let code = e.downcast_ref::<FixError>().map_or(1, FixError::exit_code);
        if code == 0 {
            warn!("{}", e);
        } else {
            error!("Error: {}", e);
        }
        std::process::exit(code);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let dirs =
        ProjectDirs::from("", "", "mend").ok_or("Could not determine config directory")?;
    if args.print_config_path {
        println!(
            "Config file location: {}",
            config_file(dirs.config_dir()).display()
        );
        return Ok(());
    }

    let Some(ref path) = args.file else {
        return Err("missing FILE argument (usage: mend [OPTIONS] <FILE>)".into());
    };

    let config = load_config(&args, dirs.config_dir())?;
    unknown_field_warning(&config.unknown);
    let fix_config = FixConfig::from(config);

    let applied = if args.yes {
        run_fix(path, &fix_config, &mut AssumeYes)?
    } else {
        run_fix(path, &fix_config, &mut PromptConfirm::terminal())?
    };

    info!("✅ Fix applied to {}", path.display());
    info!("Original saved to {}", applied.backup.display());
    if let Some(result) = applied.validation {
        info!(
            "Check build passed with {} warning(s)",
            result.warning_count
        );
    }

    Ok(())
}
