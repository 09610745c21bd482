//! Mass action rates of progress and net production rates
use {std::iter::zip, crate::{NASA7, Reaction, ReactionModel, RateConstant, Troe, R}};

// A.T^β.exp(-Ea/kT)
pub fn arrhenius(&RateConstant{preexponential_factor, temperature_exponent, activation_temperature}: &RateConstant, T: f64) -> f64 {
	if temperature_exponent == 0. && activation_temperature == 0. { preexponential_factor }
	else { preexponential_factor * f64::exp(temperature_exponent*f64::ln(T) - activation_temperature/T) }
}

fn dot(a: &[f64], b: &[f64]) -> f64 { zip(a, b).map(|(a, b)| a*b).sum() }

fn troe(&Troe{A, T3, T1, T2}: &Troe, T: f64, Pr: f64) -> f64 {
	let Fcent = if T3 > 1e-30 { (1.-A)*f64::exp(-T/T3) } else { 0. } + if T1 > 1e-30 { A*f64::exp(-T/T1) } else { 0. } + if T2.is_finite() { f64::exp(-T2/T) } else { 0. };
	let log10Fcent = f64::log10(Fcent.max(f64::MIN_POSITIVE));
	let C = -0.4-0.67*log10Fcent;
	let N = 0.75-1.27*log10Fcent;
	let f1 = (f64::log10(Pr) + C)/(N-0.14*(f64::log10(Pr) + C));
	f64::powf(10., log10Fcent/(1.+f1*f1))
}

/// Forward rate constant including third body and falloff concentration dependence
pub fn forward_rate_constant(Reaction{rate_constant, model, ..}: &Reaction, T: f64, concentrations: &[f64]) -> f64 {
	use ReactionModel::*;
	match model {
		Elementary|Irreversible => arrhenius(rate_constant, T),
		ThreeBody{efficiencies} => arrhenius(rate_constant, T) * dot(efficiencies, concentrations),
		PressureModification{efficiencies, k0} => {
			let k_inf = arrhenius(rate_constant, T);
			let Pr = arrhenius(k0, T) / k_inf * dot(efficiencies, concentrations);
			k_inf * Pr / (1.+Pr)
		}
		Falloff{efficiencies, k0, troe: parameters} => {
			let k_inf = arrhenius(rate_constant, T);
			let Pr = arrhenius(k0, T) / k_inf * dot(efficiencies, concentrations);
			if Pr <= 0. { return 0. }
			k_inf * Pr / (1.+Pr) * troe(parameters, T, Pr)
		}
	}
}

/// Concentration based equilibrium constant [(mol/m³)^Σν]
pub fn equilibrium_constant(Reaction{net, Σnet, ..}: &Reaction, thermodynamics: &[NASA7], T: f64) -> f64 {
	let C0 = NASA7::reference_pressure / (R * T);
	let Δgibbs_RT = zip(&**net, thermodynamics).filter(|(ν,_)| **ν != 0).map(|(&ν, thermodynamic)| ν as f64 * thermodynamic.gibbs_RT(T)).sum::<f64>();
	f64::exp(-Δgibbs_RT + *Σnet as f64 * f64::ln(C0))
}

fn product_of_exponentiations(concentrations: &[f64], coefficients: &[u8]) -> f64 {
	zip(concentrations, coefficients).filter(|&(_, &ν)| ν != 0).map(|(&c, &ν)| c.powi(ν as i32)).product()
}

/// Net rate of progress of each reaction [mol/m³/s]
pub fn rates_of_progress(thermodynamics: &[NASA7], reactions: &[Reaction], T: f64, concentrations: &[f64]) -> Box<[f64]> {
	reactions.iter().map(|reaction| {
		let k = forward_rate_constant(reaction, T, concentrations);
		let forward = k * product_of_exponentiations(concentrations, &reaction.reactants);
		if let ReactionModel::Irreversible = reaction.model { forward }
		else { forward - k / equilibrium_constant(reaction, thermodynamics, T) * product_of_exponentiations(concentrations, &reaction.products) }
	}).collect()
}

/// Net molar production rate of each species [mol/m³/s]
pub fn production_rates(thermodynamics: &[NASA7], reactions: &[Reaction], T: f64, concentrations: &[f64]) -> Box<[f64]> {
	let mut ω = vec![0.; concentrations.len()].into_boxed_slice();
	for (reaction, q) in zip(reactions, &*rates_of_progress(thermodynamics, reactions, T, concentrations)) {
		for (ω, &ν) in zip(&mut *ω, &*reaction.net) { if ν != 0 { *ω += ν as f64 * q } }
	}
	ω
}

#[cfg(test)] mod test {
	use {super::*, approx::assert_relative_eq, crate::yaml};
	fn air() -> crate::Mechanism { yaml::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/air.yaml")).unwrap() }

	#[test] fn oxygen_dissociation_equilibrium() {
		let mechanism = air();
		let recombination = &mechanism.reactions[0];
		assert_eq!(recombination.Σnet, -1);
		let T = 3000.;
		let C0 = NASA7::reference_pressure / (R * T);
		// O2 <=> 2 O: Kp = 0.0128 at 3000 K, 1 atm
		assert_relative_eq!(1./(equilibrium_constant(recombination, &mechanism.species.thermodynamics, T) * C0), 0.0128006, max_relative=1e-3);
	}

	#[test] fn detailed_balance() {
		let mechanism = air();
		let [O, O2] = ["O", "O2"].map(|s| mechanism.index(s).unwrap());
		let T = 2500.;
		let Kc = equilibrium_constant(&mechanism.reactions[0], &mechanism.species.thermodynamics, T);
		let mut concentrations = vec![0.; mechanism.len()];
		concentrations[O2] = 1.;
		concentrations[O] = f64::sqrt(concentrations[O2]/Kc);
		let q = rates_of_progress(&mechanism.species.thermodynamics, &mechanism.reactions, T, &concentrations)[0];
		let forward = forward_rate_constant(&mechanism.reactions[0], T, &concentrations) * concentrations[O] * concentrations[O];
		assert!(forward > 0. && q.abs() <= 1e-9 * forward, "{q} {forward}");
	}

	#[test] fn falloff() {
		let troe = Troe{A: 0.5, T3: 1e-30, T1: 1e30, T2: f64::INFINITY};
		// Fcent = A for T1 → ∞, the broadening factor reaches Fcent at Pr = 10^(0.4+0.67 log10 Fcent)
		let Pr = f64::powf(10., 0.4+0.67*f64::log10(0.5));
		assert_relative_eq!(super::troe(&troe, 1000., Pr), 0.5, max_relative=1e-9);
		assert!(super::troe(&troe, 1000., 1e6) > 0.5 && super::troe(&troe, 1000., 1e6) <= 1.);
	}

	#[test] fn conservation() {
		let mechanism = air();
		let concentrations = [0.3, 1e-3, 2e-3, 0.08, 1e-4];
		let ω = production_rates(&mechanism.species.thermodynamics, &mechanism.reactions, 3000., &concentrations);
		let mass_rate = zip(&*ω, &*mechanism.species.molar_mass).map(|(ω, W)| ω*W).sum::<f64>();
		let scale = zip(&*ω, &*mechanism.species.molar_mass).map(|(ω, W)| f64::abs(ω*W)).sum::<f64>();
		assert!(mass_rate.abs() <= 1e-12 * scale, "{mass_rate} {scale}");
	}
}
