//! Cantera YAML mechanism loader
use {std::{path::Path, str::FromStr}, anyhow::{Context, Result, anyhow, bail, ensure}, log::{info, warn}};
use crate::{Mechanism, Error, model::*};
pub use yaml::{Yaml, YamlLoader as Loader};

fn real(value: &Yaml) -> Option<f64> { value.as_f64().or_else(|| value.as_i64().map(|v| v as f64)) }
fn number(node: &Yaml, key: &str) -> Result<f64> {
	if let Some(value) = node[key].as_str() { bail!("'{key}: {value}': unit strings are not supported") }
	real(&node[key]).with_context(|| format!("expected a number for '{key}'"))
}
fn optional_number(node: &Yaml, key: &str, default: f64) -> Result<f64> { if node[key].is_badvalue() { Ok(default) } else { number(node, key) } }
fn string<'t>(node: &'t Yaml, key: &str) -> Result<&'t str> { node[key].as_str().with_context(|| format!("expected a string for '{key}'")) }

struct Units {
	concentration: f64, // mol/m³
	activation_temperature: f64, // K
}

const electron_charge : f64 = 1.602176634e-19;

fn units(units: &Yaml) -> Result<Units> {
	fn unit<'t>(units: &'t Yaml, key: &str, default: &'static str) -> Result<&'t str> { if units[key].is_badvalue() { Ok(default) } else { string(units, key) } }
	let unit = |key, default| unit(units, key, default);
	let length = match unit("length", "m")? { "m" => 1., "cm" => 1e-2, "mm" => 1e-3, unit => bail!("unsupported length unit {unit}") };
	let quantity = match unit("quantity", "kmol")? { "mol" => 1., "kmol" => 1e3, "molec" => 1./NA, unit => bail!("unsupported quantity unit {unit}") };
	let time = unit("time", "s")?;
	ensure!(time == "s", "unsupported time unit {time}");
	const J_per_cal: f64 = 4.184;
	let activation_temperature = match unit("activation-energy", "J/kmol")? {
		"K" => 1.,
		"cal/mol" => J_per_cal/R,
		"kcal/mol" => 1e3*J_per_cal/R,
		"J/mol" => 1./R,
		"kJ/mol" => 1e3/R,
		"J/kmol" => 1e-3/R,
		"eV" => electron_charge/kB,
		unit => bail!("unsupported activation energy unit {unit}"),
	};
	Ok(Units{concentration: quantity/(length*length*length), activation_temperature})
}

fn specie(specie: &Yaml) -> Result<(&str, Specie)> {
	let name = string(specie, "name")?;
	(|| -> Result<_> {
		let composition = specie["composition"].as_hash().context("missing composition")?.iter().map(|(element, count)| {
			let element = element.as_str().context("element name")?;
			Ok((Element::from_str(element).map_err(|_| anyhow!("unknown element {element}"))?, u8::try_from(count.as_i64().context("element count")?)?))
		}).collect::<Result<_>>()?;
		let thermodynamic = (|thermo: &Yaml| -> Result<NASA7> {
			ensure!(thermo["model"].as_str() == Some("NASA7"), "unsupported thermo model {:?}", thermo["model"].as_str());
			let temperature_ranges = thermo["temperature-ranges"].as_vec().context("temperature-ranges")?.iter().map(|limit| real(limit).context("temperature limit")).collect::<Result<Box<_>>>()?;
			let pieces = thermo["data"].as_vec().context("data")?.iter().map(|piece| -> Result<[f64; 7]> {
				let piece = piece.as_vec().context("NASA7 piece")?.iter().map(|a| real(a).context("NASA7 coefficient")).collect::<Result<Vec<_>>>()?;
				piece.try_into().map_err(|piece: Vec<_>| anyhow!("{} NASA7 coefficients", piece.len()))
			}).collect::<Result<Box<_>>>()?;
			ensure!(matches!(pieces.len(), 1|2) && temperature_ranges.len() == pieces.len()+1, "{} pieces for {} temperature limits", pieces.len(), temperature_ranges.len());
			let duplicate = matches!((&*temperature_ranges, &*pieces), ([_, _, _], [low, high]) if low[0..6]==high[0..6] && f64::abs(low[6]-high[6])<3e-8);
			if duplicate {
				warn!("{name}: merged duplicate NASA7 pieces");
				Ok(NASA7{temperature_ranges: Box::new([temperature_ranges[0], temperature_ranges[2]]), pieces: Box::new([pieces[0]])})
			} else {
				Ok(NASA7{temperature_ranges, pieces})
			}
		})(&specie["thermo"]).context("thermo")?;
		let transport = if specie["transport"].is_badvalue() { None } else { Some((|transport: &Yaml| -> Result<Transport> { Ok(Transport{
			well_depth_K: number(transport, "well-depth")?,
			diameter_Å: number(transport, "diameter")?,
			geometry: {use Geometry::*; match string(transport, "geometry")? {
				"atom" => Atom,
				"linear" => Linear{
					polarizability_Å3: optional_number(transport, "polarizability", 0.)?,
					rotational_relaxation: optional_number(transport, "rotational-relaxation", 0.)?,
					permanent_dipole_moment_Debye: optional_number(transport, "dipole", 0.)?,
				},
				"nonlinear" => Nonlinear{
					polarizability_Å3: optional_number(transport, "polarizability", 0.)?,
					rotational_relaxation: optional_number(transport, "rotational-relaxation", 0.)?,
					permanent_dipole_moment_Debye: optional_number(transport, "dipole", 0.)?,
				},
				geometry => bail!("unknown geometry {geometry}"),
			}}
		})})(&specie["transport"]).context("transport")?) };
		Ok((name, Specie{composition, thermodynamic, transport}))
	})().with_context(|| format!("species {name}"))
}

#[derive(Debug, PartialEq, Clone, Copy)] enum Collider<'t> { None, ThreeBody, Falloff(Option<&'t str>) }

#[derive(Debug)] struct Equation<'t> { sides: [Map<&'t str, u8>; 2], reversible: bool, collider: Collider<'t> }

fn side(side: &str) -> Result<(Map<&str, u8>, Collider<'_>)> {
	let (side, falloff) = match side.find("(+") {
		Some(start) => {
			let end = start + side[start..].find(')').context("unterminated '(+'")?;
			ensure!(side[end+1..].trim().is_empty(), "unexpected '{}' after falloff collider", side[end+1..].trim());
			let collider = side[start+2..end].trim();
			(&side[..start], Some(if collider == "M" { None } else { Some(collider) }))
		}
		None => (side, None),
	};
	let mut collider = falloff.map(Collider::Falloff).unwrap_or(Collider::None);
	let mut terms = Map::new();
	for term in side.trim().split(" + ").map(str::trim) {
		ensure!(!term.is_empty(), "empty term");
		if term == "M" { ensure!(collider == Collider::None, "more than one collider"); collider = Collider::ThreeBody; continue; }
		let (coefficient, specie) = match term.split_once(char::is_whitespace) {
			Some((coefficient, specie)) => (u8::from_str(coefficient).with_context(|| format!("stoichiometric coefficient '{coefficient}'"))?, specie.trim()),
			None => (1, term),
		};
		let count = terms.entry(specie).or_insert(0u8);
		*count = count.checked_add(coefficient).with_context(|| format!("stoichiometric coefficient of {specie} exceeds {}", u8::MAX))?;
	}
	Ok((terms, collider))
}

fn equation(equation: &str) -> Result<Equation<'_>> {
	let (reactants, products, reversible) =
		if let Some((reactants, products)) = equation.split_once("<=>") { (reactants, products, true) }
		else if let Some((reactants, products)) = equation.split_once("=>") { (reactants, products, false) }
		else if let Some((reactants, products)) = equation.split_once('=') { (reactants, products, true) }
		else { bail!("missing '<=>', '=>' or '='") };
	let [(reactants, reactant_collider), (products, product_collider)] = [side(reactants)?, side(products)?];
	ensure!(reactant_collider == product_collider, "colliders differ between reactants and products");
	Ok(Equation{sides: [reactants, products], reversible, collider: reactant_collider})
}

fn rate_constant(rate_constant: &Yaml, order: i32, units: &Units) -> Result<RateConstant> {
	ensure!(rate_constant.as_hash().is_some(), "missing rate constant");
	Ok(RateConstant{
		preexponential_factor: number(rate_constant, "A")? * f64::powi(units.concentration, 1-order),
		temperature_exponent: number(rate_constant, "b")?,
		activation_temperature: number(rate_constant, "Ea")? * units.activation_temperature,
	})
}

fn reaction<'t>(reaction: &'t Yaml, units: &Units) -> Result<Reaction<'t>> {
	let equation_source = string(reaction, "equation")?;
	(|| -> Result<_> {
		let Equation{sides: equation, reversible, collider} = self::equation(equation_source)?;
		let order = equation[0].values().map(|&n| n as i32).sum::<i32>();
		let efficiencies = || -> Result<(Map<&'t str, f64>, f64)> {
			let default_efficiency = optional_number(reaction, "default-efficiency", 1.)?;
			let efficiencies = match reaction["efficiencies"].as_hash() {
				Some(efficiencies) => efficiencies.iter().map(|(specie, efficiency)| Ok((specie.as_str().context("efficiency species")?, real(efficiency).context("efficiency")?))).collect::<Result<_>>()?,
				None => Map::new(),
			};
			Ok((efficiencies, default_efficiency))
		};
		for key in ["orders", "negative-orders", "nonreactant-orders", "negative-A"] { ensure!(reaction[key].is_badvalue(), "'{key}' is not supported") }
		use ReactionModel::*;
		let (rate_constant, model) = match (reaction["type"].as_str(), collider) {
			(None|Some("elementary"), Collider::None) =>
				(self::rate_constant(&reaction["rate-constant"], order, units)?, if reversible { Elementary } else { Irreversible }),
			(None|Some("three-body"), Collider::ThreeBody) => {
				ensure!(reversible, "irreversible three-body reactions are not supported");
				let (efficiencies, default_efficiency) = efficiencies()?;
				(self::rate_constant(&reaction["rate-constant"], order+1, units)?, ThreeBody{efficiencies, default_efficiency})
			}
			(None|Some("falloff"), Collider::Falloff(collider)) => {
				ensure!(reversible, "irreversible falloff reactions are not supported");
				ensure!(reaction["SRI"].is_badvalue(), "SRI falloff is not supported");
				let (efficiencies, default_efficiency) = match collider {
					None => efficiencies()?,
					Some(collider) => ([(collider, 1.)].into_iter().collect(), 0.),
				};
				// Pr = [M] k0 / k∞ is dimensionless: k0 carries one more concentration order
				let k0 = self::rate_constant(&reaction["low-P-rate-constant"], order+1, units).context("low-P-rate-constant")?;
				let k = self::rate_constant(&reaction["high-P-rate-constant"], order, units).context("high-P-rate-constant")?;
				let troe = &reaction["Troe"];
				(k, if troe.is_badvalue() { PressureModification{efficiencies, default_efficiency, k0} } else { Falloff{efficiencies, default_efficiency, k0, troe: Troe{
					A: number(troe, "A")?,
					T3: number(troe, "T3")?,
					T1: number(troe, "T1")?,
					T2: optional_number(troe, "T2", f64::INFINITY)?,
				}}})
			}
			(Some(reaction_type), _) if !matches!(reaction_type, "elementary"|"three-body"|"falloff") => bail!("unsupported reaction type {reaction_type}"),
			(reaction_type, collider) => bail!("reaction type {} does not match collider {collider:?}", reaction_type.unwrap_or("elementary")),
		};
		Ok(Reaction{equation, rate_constant, model})
	})().with_context(|| format!("'{equation_source}'"))
}

/// Kinetics model from a parsed YAML document
pub fn model(data: &Yaml) -> Result<Model<'_>> {
	let units = units(&data["units"]).context("units")?;
	let phase = &data["phases"][0];
	if let Some(thermo) = phase["thermo"].as_str() { ensure!(thermo == "ideal-gas", "unsupported phase thermo {thermo}"); }
	let species = data["species"].as_vec().context("missing species")?.iter().map(specie).collect::<Result<Box<_>>>()?;
	let species = match phase["species"].as_vec() {
		Some(names) => names.iter().map(|name| {
			let name = name.as_str().context("phase species must be listed by name")?;
			species.iter().find(|(specie,_)| *specie == name).cloned().with_context(|| format!("phase species {name} is not defined"))
		}).collect::<Result<_>>()?,
		None => species,
	};
	let reactions = match data["reactions"].as_vec() {
		Some(reactions) => reactions.iter().map(|r| reaction(r, &units)).collect::<Result<_>>()?,
		None => Box::default(),
	};
	Ok(Model{species, reactions})
}

pub fn parse(source: &str) -> Result<Mechanism> {
	let yaml = Loader::load_from_str(source)?;
	let data = yaml.first().context("empty document")?;
	ensure!(data.as_hash().is_some(), "expected a mapping at the top level");
	Mechanism::new(&model(data)?)
}

pub fn load(path: impl AsRef<Path>) -> Result<Mechanism, Error> {
	let path = path.as_ref();
	let mechanism = std::fs::read_to_string(path).context("could not read file").and_then(|source| parse(&source))
		.map_err(|error| Error::MechanismLoad{path: path.into(), message: format!("{error:#}")})?;
	info!("{}: {} species, {} reactions", path.display(), mechanism.len(), mechanism.reactions.len());
	Ok(mechanism)
}
