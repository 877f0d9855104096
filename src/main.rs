extern crate env_logger;
#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use clap::Parser;
use zfq::{Config, Pipeline};

mod cli;

use cli::{Cli, Commands};

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    logger.format_target(false);
    if let Some(level) = cli.log_level {
        logger.filter_level(level);
    }
    logger.init();

    match &cli.command {
        Commands::Compress {
            input,
            output,
            threads,
            remove,
            codec,
            tmp_dir,
        } => {
            info!("zfq v{}: compressing {}", cli::VERSION, input.display());
            let pipeline = Pipeline::new(Config {
                workers: *threads,
                temp_dir: tmp_dir.clone(),
                codec: *codec,
            })?;
            pipeline
                .compress(input, output, *remove)
                .with_context(|| format!("Could not compress {}", input.display()))?;
            info!("End of job");
        }
        Commands::Uncompress {
            input,
            output,
            remove,
        } => {
            info!("zfq v{}: uncompressing {}", cli::VERSION, input.display());
            let pipeline = Pipeline::new(Config::default())?;
            pipeline
                .decompress(input, output, *remove)
                .with_context(|| format!("Could not uncompress {}", input.display()))?;
            info!("End of job");
        }
        Commands::Info { input, pretty } => {
            let info = zfq::info(input)
                .with_context(|| format!("Could not read info from {}", input.display()))?;
            if *pretty {
                println!("{}", info.to_pretty_json()?);
            } else {
                println!("{}", serde_json::to_string(&info)?);
            }
        }
    };
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
