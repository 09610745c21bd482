#![allow(non_snake_case,non_upper_case_globals)]
pub use {linear_map::LinearMap as Map, strum_macros::EnumString};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, Clone, Copy)] pub enum Element { H, He, C, N, O, F, Cl, Ar, E }
pub const kB : f64 = 1.380649e-23; // J / K
pub const NA : f64 = 6.02214076e23; // 1 / mol
pub const R : f64 = kB*NA; // J / (mol K)

#[derive(Debug, Clone)] pub struct NASA7 {
	pub temperature_ranges: Box<[f64]>,
	pub pieces: Box<[[f64; 7]]>,
}

#[derive(Debug, Clone, Copy)] pub enum Geometry {
	Atom,
	Linear { polarizability_Å3: f64, rotational_relaxation: f64, permanent_dipole_moment_Debye: f64 },
	Nonlinear { polarizability_Å3: f64, rotational_relaxation: f64, permanent_dipole_moment_Debye: f64 },
}
#[derive(Debug, Clone)] pub struct Transport {
	pub well_depth_K: f64,
	pub diameter_Å: f64,
	pub geometry: Geometry,
}
#[derive(Debug, Clone)] pub struct Specie {
	pub composition: Map<Element, u8>,
	pub thermodynamic: NASA7,
	pub transport: Option<Transport>,
}

#[derive(Debug, Clone, Copy, PartialEq)] pub struct RateConstant {
	pub preexponential_factor: f64, // (m³/mol)^(order-1)/s
	pub temperature_exponent: f64,
	pub activation_temperature: f64 // K
}

#[derive(Debug, Clone, Copy, PartialEq)] pub struct Troe { pub A: f64, pub T3: f64, pub T1: f64, pub T2: f64 }

#[derive(Debug)] pub enum ReactionModel<'t> {
	Elementary,
	Irreversible,
	ThreeBody { efficiencies: Map<&'t str, f64>, default_efficiency: f64 },
	PressureModification { efficiencies: Map<&'t str, f64>, default_efficiency: f64, k0: RateConstant },
	Falloff { efficiencies: Map<&'t str, f64>, default_efficiency: f64, k0: RateConstant, troe: Troe },
}

#[derive(Debug)] pub struct Reaction<'t> {
	pub equation: [Map<&'t str, u8>; 2],
	pub rate_constant: RateConstant,
	pub model: ReactionModel<'t>,
}

#[derive(Debug)] pub struct Model<'t> {
	pub species: Box<[(&'t str, Specie)]>,
	pub reactions: Box<[Reaction<'t>]>,
}
