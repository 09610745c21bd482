//! Uniform cadence sampling of a [Simulation] into a [History] table
use {std::sync::{Arc, atomic::{AtomicBool, Ordering}}, log::{debug, info}, float_pretty_print::PrettyPrintFloat, crate::{Error, Simulation}};

/// Snapshot of the bulk properties at one sample time
#[derive(Clone, Copy, Debug, PartialEq)] pub struct SampleRow {
	/// In the display unit of the [Sampler]
	pub time: f64,
	pub temperature: f64, // K
	pub density: f64, // kg/m³
	pub viscosity: f64, // Pa·s
}

/// Rows in time order
#[derive(Clone, Debug, Default, PartialEq, derive_more::Deref)] pub struct History(Vec<SampleRow>);

impl History {
	pub fn rows(&self) -> &[SampleRow] { &self.0 }
	pub fn into_rows(self) -> Vec<SampleRow> { self.0 }
}
impl From<Vec<SampleRow>> for History { fn from(rows: Vec<SampleRow>) -> Self { Self(rows) } }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, strum_macros::EnumString, strum_macros::Display)] pub enum TimeUnit {
	#[default] #[serde(rename="s")] #[strum(serialize="s")] Second,
	#[serde(rename="ms")] #[strum(serialize="ms")] Millisecond,
	#[serde(rename="us")] #[strum(to_string="us", serialize="µs")] Microsecond,
}

impl TimeUnit {
	/// Display units per second
	pub fn scale(&self) -> f64 { match self { Self::Second => 1., Self::Millisecond => 1e3, Self::Microsecond => 1e6 } }
}

/// Shared flag checked by the sampler between advances
#[derive(Clone, Debug, Default)] pub struct Cancel(Arc<AtomicBool>);
impl Cancel {
	pub fn new() -> Self { Self::default() }
	pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed) }
	pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

#[derive(Clone, Copy, Debug, PartialEq)] pub struct Sampler {
	/// Total simulated time [s]
	pub duration: f64,
	pub samples: usize,
	pub time_unit: TimeUnit,
}

impl Sampler {
	pub fn new(duration: f64, samples: usize, time_unit: TimeUnit) -> Result<Self, Error> {
		if samples > 0 && !(duration.is_finite() && duration > 0.) { return Err(Error::config(format!("duration must be finite and positive, got {duration} s"))) }
		Ok(Self{duration, samples, time_unit})
	}
	/// Sample interval [s]
	pub fn interval(&self) -> f64 { self.duration / self.samples as f64 }

	fn sample(&self, simulation: &impl Simulation, n: usize) -> SampleRow {
		let time = if n == 0 { 0. } else { n as f64 * self.interval() * self.time_unit.scale() };
		let row = SampleRow{time, temperature: simulation.temperature(), density: simulation.density(), viscosity: simulation.viscosity()};
		debug!("{n}: t={} {} T={} K ρ={} kg/m³ μ={} Pa·s", PrettyPrintFloat(row.time), self.time_unit, PrettyPrintFloat(row.temperature), PrettyPrintFloat(row.density), PrettyPrintFloat(row.viscosity));
		row
	}

	/// Records the initial state then one row after each of `samples` equal advances
	pub fn run(&self, simulation: &mut impl Simulation, cancel: &Cancel) -> Result<History, Error> {
		let mut history = Vec::with_capacity(self.samples.min(1<<20)+1);
		history.push(self.sample(simulation, 0));
		for n in 1..=self.samples {
			if cancel.is_cancelled() { return Err(Error::Cancelled{history: History(history)}) }
			let target = n as f64 * self.interval();
			if let Err(source) = simulation.advance(target) { return Err(Error::Integration{time: target, source, history: History(history)}) }
			history.push(self.sample(simulation, n));
		}
		if let (Some(first), Some(last)) = (history.first(), history.last()) {
			info!("{} samples, T: {} → {} K, {} steps", history.len(), PrettyPrintFloat(first.temperature), PrettyPrintFloat(last.temperature), simulation.steps());
		}
		Ok(History(history))
	}
}
