//! Train or evaluate a Threes! slider against the random placer.
//!
//! ```text
//! threes-td --total 100000 --block 1000 \
//!     --slide "alpha=0.003125 save=weights.bin" --place "seed=7"
//! ```

use std::process::ExitCode;

use clap::Parser;
use flexi_logger::Logger;

use threes_td::agent::{Agent, RandomPlacer, Slider};
use threes_td::config::AgentConfig;
use threes_td::learning::{play_episode, EpisodeRecord, LearningError, TrainingStatistics};

#[derive(Parser, Debug)]
#[command(name = "threes-td", version, about = "n-tuple TD(0) agent for Threes!")]
struct Args {
    /// Episodes to play
    #[arg(long, default_value_t = 1000)]
    total: usize,

    /// Episodes per statistics block
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    block: u64,

    /// Slider arguments, e.g. "strategy=td alpha=0.003125 load=in.bin save=out.bin"
    #[arg(long, default_value = "")]
    slide: String,

    /// Placer arguments, e.g. "seed=7"
    #[arg(long, default_value = "")]
    place: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let _logger = match Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.format(flexi_logger::colored_default_format).start())
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("failed to start logger: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), LearningError> {
    let mut slider = Slider::new(AgentConfig::slider(&args.slide)?)?;
    let mut placer = RandomPlacer::new(AgentConfig::placer(&args.place)?);

    log::info!(
        "{} ({}) vs {} ({}): {} episodes, block {}",
        slider.name(),
        slider.role(),
        placer.name(),
        placer.role(),
        args.total,
        args.block
    );

    let mut stats = TrainingStatistics::new(args.total, args.block as usize);
    while !stats.is_finished() {
        let result = play_episode(&mut slider, &mut placer);
        stats.push(EpisodeRecord::from(&result));
    }

    log::info!(
        "{} episodes in {:.1}s",
        stats.completed(),
        stats.elapsed().as_secs_f64()
    );
    slider.shutdown()
}
