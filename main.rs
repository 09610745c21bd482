use {std::{path::PathBuf, time::Duration}, anyhow::{Result, Context}, clap::Parser, log::warn, homogeneous::{*, integrator::Method}};

/// Homogeneous constant volume reactor: samples temperature, density and viscosity over time
#[derive(Parser)] #[command(name="reactor")] struct Arguments {
	/// Cantera YAML mechanism
	#[arg(short, long)] fname: PathBuf,
	/// YAML run configuration
	#[arg(short, long)] config: Option<PathBuf>,
	/// Initial temperature [K]
	#[arg(long)] temperature: Option<f64>,
	/// Initial pressure [Pa]
	#[arg(long)] pressure: Option<f64>,
	/// Initial amount proportions: name:value,…
	#[arg(long)] composition: Option<Composition>,
	/// Mix or constant:VISCOSITY
	#[arg(long)] transport: Option<TransportModel>,
	/// Total simulated time [s]
	#[arg(long)] duration: Option<f64>,
	#[arg(long)] samples: Option<usize>,
	/// Time unit of the output time column: s, ms or us
	#[arg(long)] time_unit: Option<TimeUnit>,
	/// rosenbrock or rkc
	#[arg(long)] integrator: Option<Method>,
	#[arg(short, long)] output: Option<PathBuf>,
	/// Wall clock limit [s], the partial history is kept
	#[arg(long)] timeout: Option<f64>,
}

impl Arguments {
	fn config(&self) -> Result<Config> {
		let mut config = self.config.as_ref().map(Config::load).transpose()?.unwrap_or_default();
		if let Some(temperature) = self.temperature { config.temperature = temperature }
		if let Some(pressure) = self.pressure { config.pressure = pressure }
		if let Some(composition) = &self.composition { config.composition = composition.clone() }
		if let Some(transport) = self.transport { config.transport = transport }
		if let Some(duration) = self.duration { config.duration = duration }
		if let Some(samples) = self.samples { config.samples = samples }
		if let Some(time_unit) = self.time_unit { config.time_unit = time_unit }
		if let Some(method) = self.integrator { config.integrator.method = method }
		if let Some(output) = &self.output { config.output = output.clone() }
		config.validate()?;
		Ok(config)
	}
}

fn main() -> Result<()> {
	color_backtrace::install();
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let arguments = Arguments::parse();
	let config = arguments.config()?;
	let sampler = config.sampler()?;
	let mechanism = yaml::load(&arguments.fname)?;
	let mut reactor = reactor::initialize(&mechanism, config.temperature, config.pressure, &config.composition, config.transport, config.integrator.build())?;
	let cancel = Cancel::new();
	if let Some(timeout) = arguments.timeout {
		let timeout = Duration::try_from_secs_f64(timeout).with_context(|| format!("invalid timeout {timeout} s"))?;
		let cancel = cancel.clone();
		std::thread::spawn(move || { std::thread::sleep(timeout); cancel.cancel() });
	}
	let history = match sampler.run(&mut reactor, &cancel) {
		Ok(history) => history,
		Err(error) => {
			if let Some(history) = error.history() {
				let mut partial = config.output.clone().into_os_string();
				partial.push(".partial");
				if let Err(error) = output::write(&partial, history) { warn!("{error}") }
			}
			return Err(error.into());
		}
	};
	output::write(&config.output, &history)?;
	Ok(())
}
