//! Closed, fixed volume, adiabatic reactor
use {std::iter::zip, log::info, crate::{Mechanism, State, Composition, Error, TransportModel, initial_state, map, reaction, integrator::{self, Integrator}}};

/// Advance to time and query derived properties, the operations the sampler drives
pub trait Simulation {
	/// Current simulated time [s]
	fn time(&self) -> f64;
	/// Advances the state to `target` [s], which must exceed [Simulation::time]
	fn advance(&mut self, target: f64) -> Result<(), integrator::Error>;
	fn temperature(&self) -> f64;
	fn density(&self) -> f64;
	fn viscosity(&self) -> f64;
	/// Accepted integrator steps so far
	fn steps(&self) -> usize { 0 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)] pub enum Status { Initialized, Advancing, Converged, Failed }

pub struct Reactor<'t> {
	mechanism: &'t Mechanism,
	transport: TransportModel,
	integrator: Box<dyn Integrator>,
	state: State,
	time: f64,
	status: Status,
	steps: usize,
}

/// Constant volume adiabatic closure: u = [T, n₀ … nₖ₋₁]
pub fn rate(Mechanism{species, reactions, ..}: &Mechanism, volume: f64, u: &[f64], f_u: &mut [f64]) -> bool {
	let Some((&T, amounts)) = u.split_first() else { return false };
	if !(T.is_finite() && T > 0.) { return false }
	let concentrations = map(amounts, |&n| f64::max(0., n)/volume);
	let ω = reaction::production_rates(&species.thermodynamics, reactions, T, &concentrations);
	let Cv_R = zip(&*concentrations, &*species.thermodynamics).map(|(C, thermodynamic)| C * (thermodynamic.molar_heat_capacity_at_constant_pressure_R(T) - 1.)).sum::<f64>();
	let energy_rate_RT = zip(&*ω, &*species.thermodynamics).map(|(ω, thermodynamic)| ω * (thermodynamic.enthalpy_RT(T) - 1.)).sum::<f64>();
	let Some((dtT, dtn)) = f_u.split_first_mut() else { return false };
	*dtT = - T * energy_rate_RT / Cv_R;
	for (dtn, ω) in zip(dtn, &*ω) { *dtn = volume * ω }
	f_u.iter().all(|v| v.is_finite())
}

/// Sets the initial state and transport closure of a fresh reactor
pub fn initialize<'t>(mechanism: &'t Mechanism, temperature: f64, pressure: f64, composition: &Composition, transport: TransportModel, integrator: Box<dyn Integrator>) -> Result<Reactor<'t>, Error> {
	let state = initial_state(mechanism, temperature, pressure, composition)?;
	Reactor::new(mechanism, state, transport, integrator)
}

impl<'t> Reactor<'t> {
	pub fn new(mechanism: &'t Mechanism, state: State, transport: TransportModel, integrator: Box<dyn Integrator>) -> Result<Self, Error> {
		if state.amounts.len() != mechanism.len() { return Err(Error::StateInitialization(format!("{} amounts for {} species", state.amounts.len(), mechanism.len()))) }
		if let TransportModel::Mix = transport {
			let missing = (0..mechanism.len()).filter(|&k| !mechanism.species.has_transport(k)).map(|k| &*mechanism.species_names[k]).collect::<Vec<_>>();
			if !missing.is_empty() { return Err(Error::StateInitialization(format!("mixture-averaged transport requires transport data for {}", missing.join(", ")))) }
		}
		info!("T: {} K, P: {} Pa, transport: {transport}", state.temperature, state.pressure());
		Ok(Self{mechanism, transport, integrator, state, time: 0., status: Status::Initialized, steps: 0})
	}
	pub fn state(&self) -> &State { &self.state }
	pub fn status(&self) -> Status { self.status }
	pub fn pressure(&self) -> f64 { self.state.pressure() }
	pub fn mole_fractions(&self) -> Box<[f64]> {
		let total_amount = self.state.amounts.iter().map(|&n| f64::max(0., n)).sum::<f64>();
		map(&*self.state.amounts, |&n| f64::max(0., n)/total_amount)
	}
}

impl Simulation for Reactor<'_> {
	fn time(&self) -> f64 { self.time }
	fn advance(&mut self, target: f64) -> Result<(), integrator::Error> {
		if self.status == Status::Failed { return Err(integrator::Error::Terminated{time: self.time}) }
		if !(target > self.time) { return Err(integrator::Error::NonIncreasingTarget{time: self.time, target}) }
		self.status = Status::Advancing;
		let (mechanism, volume) = (self.mechanism, self.state.volume);
		let f = move |u: &[f64], f_u: &mut [f64]| rate(mechanism, volume, u, f_u);
		let mut u = [&[self.state.temperature][..], &self.state.amounts[..]].concat();
		match self.integrator.integrate(&f, self.time, target, &mut u) {
			Ok(steps) => {
				self.steps += steps;
				self.time = target;
				self.state.temperature = u[0];
				self.state.amounts.copy_from_slice(&u[1..]);
				self.state.pressure_R = self.state.total_amount() * self.state.temperature / volume;
				self.status = Status::Converged;
				Ok(())
			}
			Err(error) => {
				self.status = Status::Failed;
				Err(error)
			}
		}
	}
	fn temperature(&self) -> f64 { self.state.temperature }
	fn density(&self) -> f64 { zip(&*self.state.amounts, &*self.mechanism.species.molar_mass).map(|(n, W)| n*W).sum::<f64>() / self.state.volume }
	fn viscosity(&self) -> f64 { self.transport.viscosity(&self.mechanism.species, self.state.temperature, &self.mole_fractions()) }
	fn steps(&self) -> usize { self.steps }
}
