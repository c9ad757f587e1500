use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use ftlog::{LevelFilter, LoggerGuard};

use springnet::config::SimConfig;
use springnet::gpu::BackendKind;
use springnet::world::World;
use springnet::Scheme;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemeArg {
	Euler,
	Verlet,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
	Host,
	Parallel,
	Vulkan,
}

#[derive(Parser, Debug)]
#[command(version, about = "Steps a spring net and reports the simulation load")]
struct Args {
	/// JSON config; defaults are used for anything it leaves out.
	#[arg(short('c'), long)]
	config: Option<PathBuf>,

	#[arg(short('r'), long)]
	rows: Option<usize>,

	#[arg(short('k'), long)]
	cols: Option<usize>,

	/// Frames to run.
	#[arg(short('n'), long, default_value_t = 100)]
	frames: u32,

	#[arg(short('s'), long)]
	scheme: Option<SchemeArg>,

	#[arg(short('b'), long)]
	backend: Option<BackendArg>,

	/// Frame budget in milliseconds the load is measured against.
	#[arg(long, default_value_t = 16.667)]
	budget: f32,
}

fn configure_logger() -> Result<LoggerGuard, String> {
	ftlog::Builder::new()
		.max_log_level(LevelFilter::Info)
		// no root appender: write to stderr
		.try_init()
		.map_err(|e| e.to_string())
}

fn main() -> Result<(), String> {
	let args = Args::parse();
	let _guard = configure_logger()?;

	let mut config = match args.config.as_ref() {
		Some(path) => SimConfig::load(path).map_err(|e| e.to_string())?,
		None => SimConfig::default(),
	};
	if let Some(rows) = args.rows {
		config.grid.rows = rows;
	}
	if let Some(cols) = args.cols {
		config.grid.cols = cols;
	}
	if args.rows.is_some() || args.cols.is_some() {
		// keep the corner pins on the resized last row
		config.grid = config.grid.with_corner_pins();
	}
	if let Some(scheme) = args.scheme {
		config.scheme = match scheme {
			SchemeArg::Euler => Scheme::Euler,
			SchemeArg::Verlet => Scheme::Verlet,
		};
	}
	if let Some(backend) = args.backend {
		config.backend = match backend {
			BackendArg::Host => BackendKind::Host,
			BackendArg::Parallel => BackendKind::Parallel,
			BackendArg::Vulkan => BackendKind::Vulkan,
		};
	}

	let mut world = World::new(config).map_err(|e| e.to_string())?;
	ftlog::info!(
		"{} particles, {} springs on {}",
		world.net().particle_count(),
		world.net().spring_count(),
		world.backend_name()
	);

	let budget = Duration::from_secs_f32(args.budget / 1e3);
	let start = Instant::now();
	let mut steps = 0;
	for _ in 0..args.frames {
		steps += world.advance(budget).map_err(|e| e.to_string())?;
	}
	world.sync_host().map_err(|e| e.to_string())?;
	let duration = start.elapsed();

	let simulated = budget * args.frames;
	eprintln!(
		"{} frames, {} steps: {:.3}%",
		args.frames,
		steps,
		100. * duration.as_secs_f32() / simulated.as_secs_f32()
	);
	Ok(())
}
