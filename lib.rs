#![allow(non_upper_case_globals,non_snake_case,uncommon_codepoints,mixed_script_confusables,confusable_idents)]
pub mod model;
pub use model::{kB, NA, R};
pub mod error;
pub use error::Error;
const light_speed : f64 = 299_792_458.;
const Cm_per_Debye : f64 = 1e-21 / light_speed; //C·m (Coulomb=A⋅s)

pub fn map<T, U>(iter: impl IntoIterator<Item=T>, f: impl FnMut(T)->U) -> Box<[U]> { iter.into_iter().map(f).collect() }

#[derive(PartialEq, Debug, Clone)] pub struct NASA7 {
	pub temperature_split : f64,
	pub pieces: [[f64; 7]; 2],
}

impl NASA7 {
	pub const reference_pressure : f64 = 101325.; // Pa
	pub fn piece(&self, T: f64) -> &[f64; 7] { &self.pieces[if T <= self.temperature_split { 0 } else { 1 }] }
	pub fn molar_heat_capacity_at_constant_pressure_R(&self, T: f64) -> f64 { let a = self.piece(T); a[0]+a[1]*T+a[2]*T*T+a[3]*T*T*T+a[4]*T*T*T*T } // /R
	pub fn enthalpy_RT(&self, T: f64) -> f64 { let a = self.piece(T); a[0]+a[1]/2.*T + a[2]/3.*T*T + a[3]/4.*T*T*T + a[4]/5.*T*T*T*T + a[5]/T } // /RT
	pub fn gibbs_RT(&self, T: f64) -> f64 { let a = self.piece(T); a[0]-a[6]-a[0]*f64::ln(T)-a[1]/2.*T+(1./3.-1./2.)*a[2]*T*T+(1./4.-1./3.)*a[3]*T*T*T+(1./5.-1./4.)*a[4]*T*T*T*T+a[5]/T }
}

use {std::sync::LazyLock, anyhow::{Context, bail, ensure}, model::{Map, Element}};
static standard_atomic_weights : LazyLock<Map<Element, f64>> = LazyLock::new(||
	{use Element::*; [(H, 1.008), (He, 4.002602), (C, 12.011), (N, 14.007), (O, 15.999), (F, 18.998403163), (Cl, 35.45), (Ar, 39.95), (E, 5.48579909065e-4)]}.map(|(e,g)| (e, g/1e3/*kg/g*/)).into_iter().collect()
);

/// Per species properties, one array per property indexed by species
#[derive(Debug)] pub struct Species {
	pub molar_mass: Box<[f64]>, // kg/mol
	pub thermodynamics: Box<[NASA7]>,
	pub diameter: Box<[f64]>, // m, NaN without transport data
	pub well_depth_J: Box<[f64]>,
	pub permanent_dipole_moment: Box<[f64]>, // C·m
}

impl Species {
	pub fn new(species: &[(&str, model::Specie)]) -> anyhow::Result<Self> {
		let molar_mass = map(species, |(_,s)| s.composition.iter().map(|(element, &count)| (count as f64)*standard_atomic_weights[element]).sum());
		let thermodynamics = species.iter().map(|(name, model::Specie{thermodynamic: model::NASA7{temperature_ranges, pieces},..})| Ok(match (&temperature_ranges[..], &pieces[..]) {
			(&[_, temperature_split, _], &[low, high]) => NASA7{temperature_split, pieces: [low, high]},
			(&[_, _], &[piece]) => NASA7{temperature_split: f64::NAN, pieces: [piece; 2]},
			(ranges, _) => bail!("{name}: {} NASA7 pieces for temperature ranges {ranges:?}", pieces.len()),
		})).collect::<anyhow::Result<_>>()?;
		let transport = |f: fn(&model::Transport)->f64| map(species, |(_,s)| s.transport.as_ref().map(f).unwrap_or(f64::NAN));
		let diameter = transport(|t| t.diameter_Å*1e-10);
		let well_depth_J = transport(|t| t.well_depth_K * kB);
		use model::Geometry::*;
		let permanent_dipole_moment = transport(|t| if let Linear{permanent_dipole_moment_Debye,..}|Nonlinear{permanent_dipole_moment_Debye,..} = t.geometry { permanent_dipole_moment_Debye*Cm_per_Debye } else { 0. });
		Ok(Species{molar_mass, thermodynamics, diameter, well_depth_J, permanent_dipole_moment})
	}
	pub fn len(&self) -> usize { self.molar_mass.len() }
	pub fn is_empty(&self) -> bool { self.molar_mass.is_empty() }
	pub fn has_transport(&self, k: usize) -> bool { !self.diameter[k].is_nan() }
}

#[derive(Clone, Debug, PartialEq)] pub struct State {
	pub temperature: f64,
	pub pressure_R: f64,
	pub volume: f64,
	pub amounts: Box<[f64]>
}

impl State {
	pub fn pressure(&self) -> f64 { self.pressure_R * R }
	pub fn total_amount(&self) -> f64 { self.amounts.iter().sum() }
}

/// Species proportions, normalized to mole fractions by [initial_state]
#[derive(Clone, Debug, PartialEq, serde::Deserialize)] #[serde(try_from="String")] pub struct Composition(pub Box<[(String, f64)]>);

impl std::str::FromStr for Composition {
	type Err = Error;
	/// Parses `name:value,name:value`
	fn from_str(s: &str) -> Result<Self, Error> {
		let mut proportions = Vec::<(String, f64)>::new();
		for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
			let Some((name, value)) = entry.split_once(':') else { return Err(Error::StateInitialization(format!("expected name:value in composition, got '{entry}'"))) };
			let (name, value) = (name.trim(), value.trim());
			let value = value.parse::<f64>().map_err(|_| Error::StateInitialization(format!("{name}: invalid proportion '{value}'")))?;
			if proportions.iter().any(|(specie,_)| specie == name) { return Err(Error::StateInitialization(format!("{name} is listed twice in composition"))) }
			proportions.push((name.to_owned(), value));
		}
		Ok(Composition(proportions.into_boxed_slice()))
	}
}
impl TryFrom<String> for Composition { type Error = Error; fn try_from(s: String) -> Result<Self, Error> { s.parse() } }
impl std::fmt::Display for Composition {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		use itertools::Itertools;
		write!(f, "{}", self.0.iter().format_with(",", |(name, value), f| f(&format_args!("{name}:{value}"))))
	}
}

/// Initial state of a 1 m³ control volume at the given setpoint
pub fn initial_state(mechanism: &Mechanism, temperature: f64, pressure: f64, Composition(amount_proportions): &Composition) -> Result<State, Error> {
	use Error::StateInitialization as invalid;
	if !(temperature.is_finite() && temperature > 0.) { return Err(invalid(format!("temperature must be finite and positive, got {temperature} K"))) }
	if !(pressure.is_finite() && pressure > 0.) { return Err(invalid(format!("pressure must be finite and positive, got {pressure} Pa"))) }
	for (specie, proportion) in &**amount_proportions {
		if mechanism.index(specie).is_none() { return Err(invalid(format!("unknown species {specie}"))) }
		if !(proportion.is_finite() && *proportion >= 0.) { return Err(invalid(format!("{specie}: proportion must be finite and non-negative, got {proportion}"))) }
	}
	let total_proportion = amount_proportions.iter().map(|(_,p)| p).sum::<f64>();
	if !(total_proportion > 0.) { return Err(invalid("composition proportions sum to zero".into())) }
	let pressure_R = pressure/R;
	let volume = 1.;
	let amount = pressure_R * volume / temperature;
	let amounts = map(&*mechanism.species_names, |specie| amount * amount_proportions.iter().find(|(s,_)| s==specie).map(|(_,p)| *p).unwrap_or(0.) / total_proportion);
	Ok(State{temperature, pressure_R, volume, amounts})
}

pub use model::{RateConstant, Troe};

#[derive(Debug)] pub enum ReactionModel {
	Elementary,
	Irreversible,
	ThreeBody { efficiencies: Box<[f64]> },
	PressureModification { efficiencies: Box<[f64]>, k0: RateConstant },
	Falloff { efficiencies: Box<[f64]>, k0: RateConstant, troe: Troe },
}

#[derive(Debug)] pub struct Reaction {
	pub reactants: Box<[u8]>,
	pub products: Box<[u8]>,
	pub net: Box<[i8]>,
	pub Σreactants: u8,
	pub Σproducts: u8,
	pub Σnet: i8,
	pub rate_constant: RateConstant,
	pub model: ReactionModel,
}

impl Reaction {
	pub fn new(species: &[(&str, model::Specie)], model::Reaction{equation, rate_constant, model}: &model::Reaction) -> anyhow::Result<Self> {
		let species_names = map(species, |(name,_)| *name);
		for side in equation { for specie in side.keys() { ensure!(species_names.contains(specie), "undeclared species {specie}") } }
		let [reactants, products] = [0,1].map(|side| map(&*species_names, |s| *equation[side].get(s).unwrap_or(&0)));
		let balance = |side: &[u8]| side.iter().zip(species).filter(|&(&count,_)| count > 0).fold(std::collections::BTreeMap::<Element, u32>::new(), |mut balance, (&count, (_, specie))| {
			for (&element, &n) in specie.composition.iter().filter(|&(_,&n)| n > 0) { *balance.entry(element).or_insert(0) += count as u32 * n as u32 }
			balance
		});
		let [reactant_elements, product_elements] = [&*reactants, &*products].map(balance);
		ensure!(reactant_elements == product_elements, "elements are not balanced: {reactant_elements:?} -> {product_elements:?}");
		let net = products.iter().zip(reactants.iter()).map(|(&a, &b)| i8::try_from(a as i16 - b as i16)).collect::<Result<Box<_>,_>>().context("net stoichiometric coefficient overflow")?;
		let Σ = |side: &[u8]| side.iter().try_fold(0u8, |sum, &n| sum.checked_add(n)).context("reaction order overflow");
		let [Σreactants, Σproducts] = [Σ(&reactants)?, Σ(&products)?];
		let Σnet = i8::try_from(Σproducts as i16 - Σreactants as i16).context("net reaction order overflow")?;
		let from = |efficiencies: &Map<&str,f64>, default_efficiency: f64| -> anyhow::Result<Box<[f64]>> {
			for specie in efficiencies.keys() { ensure!(species_names.contains(specie), "efficiency for undeclared species {specie}") }
			Ok(map(&*species_names, |specie| *efficiencies.get(specie).unwrap_or(&default_efficiency)))
		};
		Ok(Reaction{
			reactants, products, net, Σreactants, Σproducts, Σnet,
			rate_constant: *rate_constant,
			model: {use model::ReactionModel::*; match model {
				Elementary => ReactionModel::Elementary,
				Irreversible => ReactionModel::Irreversible,
				ThreeBody{efficiencies, default_efficiency} => ReactionModel::ThreeBody{efficiencies: from(efficiencies, *default_efficiency)?},
				PressureModification{efficiencies, default_efficiency, k0} => ReactionModel::PressureModification{efficiencies: from(efficiencies, *default_efficiency)?, k0: *k0},
				Falloff{efficiencies, default_efficiency, k0, troe} => ReactionModel::Falloff{efficiencies: from(efficiencies, *default_efficiency)?, k0: *k0, troe: *troe},
			}}
		})
	}
}

/// Immutable kinetics model: species data and reactions
#[derive(Debug)] pub struct Mechanism {
	pub species_names: Box<[String]>,
	pub species: Species,
	pub reactions: Box<[Reaction]>,
}

impl Mechanism {
	pub fn new(model: &model::Model) -> anyhow::Result<Self> {
		ensure!(!model.species.is_empty(), "no species");
		let species_names = map(&*model.species, |(name,_)| name.to_string());
		let species = Species::new(&model.species)?;
		let reactions = model.reactions.iter().enumerate().map(|(i, reaction)| Reaction::new(&model.species, reaction).with_context(|| format!("reaction {}", i+1))).collect::<anyhow::Result<_>>()?;
		Ok(Mechanism{species_names, species, reactions})
	}
	pub fn len(&self) -> usize { self.species.len() }
	pub fn is_empty(&self) -> bool { self.species.is_empty() }
	pub fn index(&self, specie: &str) -> Option<usize> { self.species_names.iter().position(|s| s == specie) }
}

pub mod yaml;
pub mod reaction;
pub mod transport;
pub use transport::TransportModel;
pub mod integrator;
pub mod reactor;
pub use reactor::{Reactor, Simulation, Status};
pub mod history;
pub use history::{History, SampleRow, Sampler, TimeUnit, Cancel};
pub mod output;
pub mod config;
pub use config::Config;
