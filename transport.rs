use {std::{f64::consts::PI as π, str::FromStr}, crate::{Species, Error, kB, NA, light_speed}};

const fine_structure : f64 = 7.2973525693e-3;
const Planck : f64 = 6.62607015e-34;
const electron_charge : f64 = 1.602176634e-19;
const μ0 : f64 = 2. * fine_structure * Planck / (electron_charge * electron_charge * light_speed); // H/m (Henry=kg⋅m²/(s²A²))
const ε0 : f64 = 1./(light_speed*light_speed*μ0); // F/m (Farad=s⁴A²/(m²kg)

fn sq(x: f64) -> f64 { x*x }
fn cb(x: f64) -> f64 { x*x*x }

impl Species {
	pub fn T⃰(&self, k: usize, T: f64) -> f64 { T * kB / self.well_depth_J[k] }
	pub fn reduced_dipole_moment(&self, k: usize) -> f64 {
		let Self{well_depth_J, permanent_dipole_moment, diameter, ..} = self;
		sq(permanent_dipole_moment[k]) / (8. * π * ε0 * well_depth_J[k] * cb(diameter[k]))
	}
	/// Reduced Ω(2,2) collision integral: Neufeld fit of the Lennard-Jones integral with Brokaw's polar correction
	pub fn Ω⃰22(&self, k: usize, T: f64) -> f64 {
		let T⃰ = self.T⃰(k, T);
		1.16145*f64::powf(T⃰, -0.14874) + 0.52487*f64::exp(-0.77320*T⃰) + 2.16178*f64::exp(-2.43787*T⃰) + 0.2*sq(self.reduced_dipole_moment(k))/T⃰
	}
	pub fn viscosity(&self, k: usize, T: f64) -> f64 {
		let Self{molar_mass, diameter, ..} = self;
		5./16. * f64::sqrt(π * molar_mass[k]/NA * kB*T) / (self.Ω⃰22(k, T) * π * sq(diameter[k]))
	}
}

/// Mixture viscosity with the Wilke mixing rule, species with zero mole fraction are skipped
pub fn viscosity(species: &Species, T: f64, mole_fractions: &[f64]) -> f64 {
	let Species{molar_mass, ..} = species;
	let present = mole_fractions.iter().enumerate().filter(|&(_, &x)| x > 0.).map(|(k,_)| (k, species.viscosity(k, T))).collect::<Vec<_>>();
	present.iter().map(|&(k, μk)| {
		let Σ = present.iter().map(|&(j, μj)| mole_fractions[j] * sq(1. + f64::sqrt(μk/μj) * f64::sqrt(f64::sqrt(molar_mass[j]/molar_mass[k]))) / f64::sqrt(8. * (1. + molar_mass[k]/molar_mass[j]))).sum::<f64>();
		mole_fractions[k] * μk / Σ
	}).sum()
}

/// Viscosity closure selected at initialization
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)] #[serde(try_from="String")] pub enum TransportModel {
	/// Mixture-averaged
	Mix,
	Constant { viscosity: f64 },
}

impl TransportModel {
	pub fn viscosity(&self, species: &Species, T: f64, mole_fractions: &[f64]) -> f64 {
		match self { Self::Mix => viscosity(species, T, mole_fractions), Self::Constant{viscosity} => *viscosity }
	}
}

impl FromStr for TransportModel {
	type Err = Error;
	/// `Mix`, `mixture-averaged` or `constant:VISCOSITY` (Pa·s)
	fn from_str(s: &str) -> Result<Self, Error> {
		match s.trim() {
			"Mix"|"mix"|"mixture-averaged" => Ok(Self::Mix),
			s => match s.split_once(':') {
				Some((model, viscosity)) if model.eq_ignore_ascii_case("constant") => match viscosity.trim().parse::<f64>() {
					Ok(viscosity) if viscosity.is_finite() && viscosity > 0. => Ok(Self::Constant{viscosity}),
					_ => Err(Error::config(format!("constant viscosity must be a finite positive number, got '{viscosity}'"))),
				},
				_ => Err(Error::config(format!("unknown transport model '{s}' (expected Mix or constant:VISCOSITY)"))),
			}
		}
	}
}
impl TryFrom<String> for TransportModel { type Error = Error; fn try_from(s: String) -> Result<Self, Error> { s.parse() } }
impl std::fmt::Display for TransportModel {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self { Self::Mix => write!(f, "Mix"), Self::Constant{viscosity} => write!(f, "constant:{viscosity}") }
	}
}
