//! Run parameters: defaults, optional YAML file, command line overrides
use {std::path::{Path, PathBuf}, log::info, crate::{Error, Composition, TransportModel, TimeUnit, Sampler, integrator}};

#[derive(Clone, Debug, PartialEq, serde::Deserialize)] #[serde(default, rename_all="kebab-case", deny_unknown_fields)] pub struct Config {
	pub temperature: f64, // K
	pub pressure: f64, // Pa
	pub composition: Composition,
	pub transport: TransportModel,
	/// Total simulated time [s]
	pub duration: f64,
	pub samples: usize,
	pub time_unit: TimeUnit,
	pub integrator: integrator::Settings,
	pub output: PathBuf,
}

impl Default for Config {
	fn default() -> Self {
		Self{
			temperature: 3000.,
			pressure: 0.1 * 101325.,
			composition: Composition([("N2".into(), 0.8), ("O2".into(), 0.2)].into()),
			transport: TransportModel::Mix,
			duration: 10.,
			samples: 1000,
			time_unit: TimeUnit::Second,
			integrator: Default::default(),
			output: "results.txt".into(),
		}
	}
}

impl Config {
	/// Parses a YAML run configuration, absent keys keep their defaults
	pub fn parse(source: &str) -> Result<Self, Error> { serde_yaml::from_str(source).map_err(|e| Error::config(e.to_string())) }
	pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
		let config = Self::parse(&source).map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
		info!("configuration {}", path.display());
		Ok(config)
	}
	pub fn validate(&self) -> Result<(), Error> {
		self.sampler()?;
		self.integrator.validate()
	}
	pub fn sampler(&self) -> Result<Sampler, Error> { Sampler::new(self.duration, self.samples, self.time_unit) }
}
