//! Adaptive integrators advancing u' = f(u) to a target time
use {std::{iter::zip, f64::consts::SQRT_2}, nalgebra::{DMatrix, DVector}, log::trace, serde::Deserialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)] pub enum Error {
	#[error("step size underflow (h={step:e} s) at t={time} s")]
	StepSizeUnderflow { time: f64, step: f64 },
	#[error("{steps} step attempts did not reach t={target} s (stopped at t={time} s)")]
	TooManySteps { time: f64, target: f64, steps: usize },
	#[error("non-finite derivative at t={time} s")]
	NonFinite { time: f64 },
	#[error("target time {target} s does not exceed the current time {time} s")]
	NonIncreasingTarget { time: f64, target: f64 },
	#[error("integration already failed at t={time} s")]
	Terminated { time: f64 },
}

/// Evaluates f(u) into the output slice, returns false where f is not defined or not finite
pub type System<'t> = dyn Fn(&[f64], &mut [f64]) -> bool + 't;

pub trait Integrator {
	/// Advances `u` from `time` to exactly `target`, returns the number of accepted steps
	fn integrate(&mut self, f: &System, time: f64, target: f64, u: &mut [f64]) -> Result<usize, Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, strum_macros::EnumString, strum_macros::Display)]
#[serde(rename_all="lowercase")] #[strum(serialize_all="lowercase", ascii_case_insensitive)]
pub enum Method { #[default] Rosenbrock, RKC }

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)] #[serde(default, rename_all="kebab-case", deny_unknown_fields)] pub struct Settings {
	pub method: Method,
	pub relative_tolerance: f64,
	pub absolute_tolerance: f64,
	/// Step attempts per call to [Integrator::integrate]
	pub max_steps: usize,
}

impl Default for Settings { fn default() -> Self { Self{method: Method::Rosenbrock, relative_tolerance: 1e-9, absolute_tolerance: 1e-15, max_steps: 100_000} } }

impl Settings {
	pub fn validate(&self) -> Result<(), crate::Error> {
		let Self{relative_tolerance, absolute_tolerance, max_steps, ..} = *self;
		if !(relative_tolerance.is_finite() && relative_tolerance > 0. && relative_tolerance < 1.) { return Err(crate::Error::config(format!("relative tolerance must be in ]0, 1[, got {relative_tolerance}"))) }
		if !(absolute_tolerance.is_finite() && absolute_tolerance > 0.) { return Err(crate::Error::config(format!("absolute tolerance must be finite and positive, got {absolute_tolerance}"))) }
		if max_steps == 0 { return Err(crate::Error::config("max steps must be positive")) }
		Ok(())
	}
	pub fn build(&self) -> Box<dyn Integrator> {
		match self.method {
			Method::Rosenbrock => Box::new(Rosenbrock::new(*self)),
			Method::RKC => Box::new(RKC::new(*self)),
		}
	}
}

fn rms(e: impl IntoIterator<Item=f64>) -> f64 {
	let (sum, len) = e.into_iter().fold((0., 0), |(sum, len), e| (sum + e*e, len+1));
	if len == 0 { 0. } else { f64::sqrt(sum / len as f64) }
}

fn minimum_step(time: f64, target: f64) -> f64 { 16. * f64::EPSILON * f64::max(time.abs(), target.abs()) }

fn initial_step(&Settings{relative_tolerance, absolute_tolerance, ..}: &Settings, u: &[f64], fu: &[f64], span: f64) -> f64 {
	let scale = |u: f64| absolute_tolerance + relative_tolerance*u.abs();
	let d0 = rms(u.iter().map(|&u| u/scale(u)));
	let d1 = rms(zip(u, fu).map(|(&u, &fu)| fu/scale(u)));
	let h = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
	h.min(span)
}

/// Shampine's L-stable Rosenbrock 2(3) pair (ode23s) with a finite difference Jacobian
pub struct Rosenbrock { settings: Settings, step: Option<f64> }

impl Rosenbrock { pub fn new(settings: Settings) -> Self { Self{settings, step: None} } }

fn jacobian(f: &System, u: &DVector<f64>, fu: &DVector<f64>, &Settings{relative_tolerance, absolute_tolerance, ..}: &Settings) -> Option<DMatrix<f64>> {
	let N = u.len();
	let mut J = DMatrix::zeros(N, N);
	let mut v = u.clone();
	let mut fv = DVector::zeros(N);
	for j in 0..N {
		v[j] = u[j] + f64::EPSILON.sqrt() * f64::max(u[j].abs(), absolute_tolerance/relative_tolerance);
		let δ = v[j] - u[j];
		if !f(v.as_slice(), fv.as_mut_slice()) { return None }
		J.set_column(j, &((&fv - fu) / δ));
		v[j] = u[j];
	}
	Some(J)
}

impl Integrator for Rosenbrock {
	fn integrate(&mut self, f: &System, mut time: f64, target: f64, u: &mut [f64]) -> Result<usize, Error> {
		if !(target > time) { return Err(Error::NonIncreasingTarget{time, target}) }
		let Settings{relative_tolerance, absolute_tolerance, max_steps, ..} = self.settings;
		let N = u.len();
		let d = 1./(2.+SQRT_2);
		let e32 = 6.+SQRT_2;
		let eval = |u: &DVector<f64>| -> Option<DVector<f64>> { let mut fu = DVector::zeros(N); f(u.as_slice(), fu.as_mut_slice()).then_some(fu) };
		let mut y = DVector::from_column_slice(u);
		let mut F0 = eval(&y).ok_or(Error::NonFinite{time})?;
		let mut h = self.step.unwrap_or_else(|| initial_step(&self.settings, y.as_slice(), F0.as_slice(), target-time));
		let mut jacobian = None;
		let (mut steps, mut attempts) = (0, 0);
		while time < target {
			if attempts >= max_steps { self.step = Some(h); return Err(Error::TooManySteps{time, target, steps: attempts}) }
			attempts += 1;
			let last = h >= target - time;
			let h_step = if last { target - time } else { h };
			let J = match jacobian.take() { Some(J) => J, None => self::jacobian(f, &y, &F0, &self.settings).ok_or(Error::NonFinite{time})? };
			let LU = (DMatrix::identity(N, N) - &J * (h_step*d)).lu();
			let step = || -> Option<(DVector<f64>, DVector<f64>, f64)> {
				let k1 = LU.solve(&F0)?;
				let F1 = eval(&(&y + &k1 * (0.5*h_step)))?;
				let k2 = LU.solve(&(&F1 - &k1))? + &k1;
				let ynew = &y + &k2 * h_step;
				let F2 = eval(&ynew)?;
				let k3 = LU.solve(&(&F2 - (&k2 - &F1) * e32 - (&k1 - &F0) * 2.))?;
				let error = rms((0..N).map(|i| h_step/6. * (k1[i] - 2.*k2[i] + k3[i]) / (absolute_tolerance + relative_tolerance * f64::max(y[i].abs(), ynew[i].abs()))));
				Some((ynew, F2, error))
			};
			match step() {
				Some((ynew, F2, error)) if error <= 1. => {
					time = if last { target } else { time + h_step };
					y = ynew;
					F0 = F2;
					steps += 1;
					let proposal = h_step * (0.8 * error.powf(-1./3.)).clamp(0.2, 5.);
					h = if last { h.max(proposal) } else { proposal };
				}
				Some((_, _, error)) => {
					trace!("rejected h={h_step:e} at t={time}: error {error:e}");
					h = h_step * if error.is_finite() { (0.8 * error.powf(-1./3.)).clamp(0.1, 0.8) } else { 0.1 };
					jacobian = Some(J);
				}
				None => {
					trace!("rejected h={h_step:e} at t={time}: non-finite stage");
					h = h_step * 0.25;
					jacobian = Some(J);
				}
			}
			if h < minimum_step(time, target) { self.step = None; return Err(Error::StepSizeUnderflow{time, step: h}) }
		}
		u.copy_from_slice(y.as_slice());
		self.step = Some(h);
		Ok(steps)
	}
}

fn norm(v: &[f64]) -> f64 { v.iter().map(|x| x*x).sum::<f64>().sqrt() }

// Estimate principal eigenvector/value of dyF|y
fn power_iteration(f: &System, time_span: f64, y: &[f64], fy: &[f64], v: &[f64]) -> Option<(Vec<f64>, f64)> {
	let [norm_y, norm_v] = [y, v].map(norm);
	let ε = if norm_y > 0. { norm_y } else { 1. } * f64::EPSILON.sqrt();
	let ones = vec![1.; y.len()];
	let (v, norm_v) = if norm_v > 0. { (v, norm_v) } else { (&ones[..], norm(&ones)) };
	let mut yεv = zip(y, v).map(|(y, v)| y + ε * v / norm_v).collect::<Vec<_>>();
	let mut fεv = vec![0.; y.len()];
	let mut ρ = 0.;
	for i in 1..=50 {
		if !f(&yεv[..], &mut fεv[..]) { return None }
		for (fεv, fy) in zip(&mut fεv, fy) { *fεv -= fy }
		let norm_fεv = norm(&fεv);
		if norm_fεv == 0. { return Some((v.to_vec(), 0.)) }
		let previous_ρ = ρ;
		ρ = norm_fεv / ε;
		if i >= 2 && f64::abs(ρ - previous_ρ) <= 0.01*ρ.max(1./time_span) { break; }
		for (yεv, (y, fεv)) in zip(&mut yεv, zip(y, &fεv)) { *yεv = y + (ε / norm_fεv) * fεv }
	}
	Some((zip(yεv, y).map(|(yεv, y)| yεv - y).collect(), ρ * 1.2))
}

/// Second order Runge-Kutta-Chebyshev
pub struct RKC { settings: Settings, step: Option<f64>, eigenvector: Option<Vec<f64>> }

impl RKC { pub fn new(settings: Settings) -> Self { Self{settings, step: None, eigenvector: None} } }

impl Integrator for RKC {
	fn integrate(&mut self, f: &System, mut time: f64, target: f64, u: &mut [f64]) -> Result<usize, Error> {
		if !(target > time) { return Err(Error::NonIncreasingTarget{time, target}) }
		let Settings{relative_tolerance, absolute_tolerance, max_steps, ..} = self.settings;
		let N = u.len();
		let mut y = u.to_vec();
		let mut fy = vec![0.; N];
		if !f(&y[..], &mut fy[..]) { return Err(Error::NonFinite{time}) }
		let span = target - time;
		let (mut v, mut jacobian_spectral_radius) = power_iteration(f, span, &y, &fy, self.eigenvector.as_deref().unwrap_or(&fy[..])).ok_or(Error::NonFinite{time})?;
		let max_stages = ((relative_tolerance / (10. * f64::EPSILON)).sqrt().round() as usize).max(2);
		let scale = |u: f64| absolute_tolerance + relative_tolerance*u.abs();
		let mut h = match self.step { Some(h) => h, None => {
			let h = if jacobian_spectral_radius > 0. { (1./jacobian_spectral_radius).min(span) } else { span };
			let mut fu1 = vec![0.; N];
			if !f(&zip(&y, &fy).map(|(y, fy)| y + h * fy).collect::<Vec<_>>()[..], &mut fu1[..]) { return Err(Error::NonFinite{time}) }
			let error = rms((0..N).map(|i| (fu1[i] - fy[i]) / scale(y[i])));
			if error > 0. { (1./(10.*error)).min(span) } else { span }
		}};
		let (mut previous_error, mut previous_h) = (0., 0.);
		let (mut steps, mut attempts) = (0, 0);
		let mut fu1 = vec![0.; N];
		while time < target {
			if attempts >= max_steps { self.step = Some(h); return Err(Error::TooManySteps{time, target, steps: attempts}) }
			attempts += 1;
			let last = h >= target - time;
			let h_step = if last { target - time } else { h };
			let stages = 1 + (1. + 1.54 * h_step * jacobian_spectral_radius).sqrt().floor() as usize;
			let (h_step, last, stages) = if stages > max_stages { ((max_stages*max_stages - 1) as f64 / (1.54 * jacobian_spectral_radius), false, max_stages) } else { (h_step, last, stages) };
			let mut stage = || -> Option<Vec<f64>> {
				let w0 = 1. + 2. / (13.0 * (stages * stages) as f64);
				let sqw01 = w0*w0 - 1.;
				let arg = stages as f64 * (w0 + sqw01.sqrt()).ln();
				let w1 = arg.sinh() * sqw01 / (arg.cosh() * stages as f64 * sqw01.sqrt() - w0 * arg.sinh());
				let mut B = [1. / (4.*w0*w0); 2];
				let mu_t = w1 * B[0];
				let mut u0 = y.clone();
				let mut u1 = zip(&y, &fy).map(|(y, fy)| y + mu_t * h_step * fy).collect::<Vec<_>>();
				let mut Z = [w0, 1.];
				let mut dZ = [1., 0.];
				let mut ddZ = [0., 0.];
				for _ in 1..stages {
					let z = 2. * w0 * Z[0] - Z[1];
					let dz = 2. * w0 * dZ[0] - dZ[1] + 2. * Z[0];
					let ddz = 2. * w0 * ddZ[0] - ddZ[1] + 4. * dZ[0];
					let b = ddz / (dz * dz);
					let gamma_t = 1. - (Z[0] * B[0]);
					let nu = - b / B[1];
					let mu = 2. * b * w0 / B[0];
					let mu_t = mu * w1 / w0;
					if !f(&u1[..], &mut fu1[..]) { return None }
					for i in 0..N {
						let u0_ = u0[i];
						u0[i] = u1[i];
						u1[i] = (1.-mu-nu)*y[i] + nu*u0_ + mu*u1[i] + h_step*mu_t*(fu1[i]-(gamma_t*fy[i]));
					}
					B = [b, B[0]];
					Z = [z, Z[0]];
					dZ = [dz, dZ[0]];
					ddZ = [ddz, ddZ[0]];
				}
				f(&u1[..], &mut fu1[..]).then_some(u1)
			};
			let Some(u1) = stage() else {
				trace!("rejected h={h_step:e} at t={time}: non-finite stage");
				h = h_step * 0.25;
				if h < minimum_step(time, target) { self.step = None; return Err(Error::StepSizeUnderflow{time, step: h}) }
				continue;
			};
			let error = 0.8 * rms((0..N).map(|i| (u1[i] - h_step*(fy[i]+fu1[i])/2. - y[i]) / f64::max(scale(y[i]), scale(u1[i]))));
			if !(error <= 1.) {
				trace!("rejected h={h_step:e} at t={time}: error {error:e} with {stages} stages");
				h = h_step * if error.is_finite() { (0.8 / error.powf(1./3.)).max(0.1) } else { 0.1 };
				(v, jacobian_spectral_radius) = power_iteration(f, span, &y, &fy, &v).ok_or(Error::NonFinite{time})?;
			} else {
				time = if last { target } else { time + h_step };
				y = u1;
				std::mem::swap(&mut fy, &mut fu1);
				steps += 1;
				if steps%25 == 0 { (v, jacobian_spectral_radius) = power_iteration(f, span, &y, &fy, &v).ok_or(Error::NonFinite{time})?; }
				let factor = (0.8 * if previous_error > f64::EPSILON { h_step/previous_h*(previous_error/error).powf(1./3.) } else { 1./error.powf(1./3.) } ).clamp(0.1, 10.);
				previous_error = error;
				previous_h = h_step;
				h = if last { h.max(factor*h_step) } else { factor*h_step };
			}
			if h < minimum_step(time, target) { self.step = None; return Err(Error::StepSizeUnderflow{time, step: h}) }
		}
		u.copy_from_slice(&y);
		self.step = Some(h);
		self.eigenvector = Some(v);
		Ok(steps)
	}
}

#[cfg(test)] mod test {
	use {super::*, approx::assert_relative_eq};
	fn settings(method: Method) -> Settings { Settings{method, relative_tolerance: 1e-8, absolute_tolerance: 1e-12, ..Default::default()} }

	fn decay(u: &[f64], f: &mut [f64]) -> bool { f[0] = -u[0]; true }

	#[test] fn linear_decay() {
		for method in [Method::Rosenbrock, Method::RKC] {
			let mut integrator = settings(method).build();
			let mut u = [1.];
			integrator.integrate(&decay, 0., 1., &mut u).unwrap();
			integrator.integrate(&decay, 1., 2., &mut u).unwrap();
			assert_relative_eq!(u[0], f64::exp(-2.), max_relative=1e-5);
		}
	}

	// Method of lines discretization of u_t = u_xx on ]0,1[ with zero boundaries
	fn heat(u: &[f64], f: &mut [f64]) -> bool {
		let N = u.len();
		let rcp_dx2 = ((N+1)*(N+1)) as f64;
		for i in 0..N { f[i] = rcp_dx2 * ((if i > 0 { u[i-1] } else { 0. }) - 2.*u[i] + (if i+1 < N { u[i+1] } else { 0. })) }
		true
	}

	#[test] fn heat_equation() {
		use std::f64::consts::PI as π;
		const N: usize = 19;
		let x = |i: usize| (i+1) as f64 / (N+1) as f64;
		let u0: [f64; N] = std::array::from_fn(|i| x(i)*(1.-x(i)));
		let mode = |m: usize, i: usize| f64::sin(π * (m*(i+1)) as f64 / (N+1) as f64);
		let exact = |i: usize, t: f64| (1..=N).map(|m| {
			let c = 2./(N+1) as f64 * (0..N).map(|j| u0[j]*mode(m, j)).sum::<f64>();
			let λ = -4. * ((N+1)*(N+1)) as f64 * f64::powi(f64::sin(π * m as f64 / (2*(N+1)) as f64), 2);
			c * f64::exp(λ*t) * mode(m, i)
		}).sum::<f64>();
		for method in [Method::Rosenbrock, Method::RKC] {
			let mut u = u0;
			settings(method).build().integrate(&heat, 0., 0.1, &mut u).unwrap();
			for (i, u) in u.iter().enumerate() { assert_relative_eq!(*u, exact(i, 0.1), max_relative=1e-4); }
		}
	}

	fn robertson(u: &[f64], f: &mut [f64]) -> bool {
		let [y1, y2, y3] = [u[0], u[1], u[2]];
		f[0] = -0.04*y1 + 1e4*y2*y3;
		f[1] = 0.04*y1 - 1e4*y2*y3 - 3e7*y2*y2;
		f[2] = 3e7*y2*y2;
		true
	}

	#[test] fn stiff_robertson() {
		let mut integrator = Rosenbrock::new(Settings{relative_tolerance: 1e-6, absolute_tolerance: 1e-10, ..Default::default()});
		let mut u = [1., 0., 0.];
		let steps = integrator.integrate(&robertson, 0., 40., &mut u).unwrap();
		assert!(steps > 0 && steps < 10_000, "{steps}");
		assert_relative_eq!(u[0], 0.7158271, max_relative=1e-3);
		assert_relative_eq!(u[1], 9.185535e-6, max_relative=1e-2);
		assert_relative_eq!(u[2], 0.2841637, max_relative=1e-3);
		assert_relative_eq!(u.iter().sum::<f64>(), 1., max_relative=1e-6);
	}

	#[test] fn failures() {
		let mut integrator = settings(Method::Rosenbrock).build();
		let mut u = [1.];
		assert_eq!(integrator.integrate(&decay, 1., 1., &mut u), Err(Error::NonIncreasingTarget{time: 1., target: 1.}));
		assert_eq!(integrator.integrate(&|_, _| false, 0., 1., &mut u), Err(Error::NonFinite{time: 0.}));
		let mut integrator = Settings{max_steps: 1, ..settings(Method::Rosenbrock)}.build();
		assert!(matches!(integrator.integrate(&robertson, 0., 40., &mut [1., 0., 0.]), Err(Error::TooManySteps{steps: 1, ..})));
		// Derivative undefined beyond u = 1/2: steps shrink until underflow
		let blowup = |u: &[f64], f: &mut [f64]| { f[0] = 1.; u[0] < 0.5 };
		assert!(matches!(settings(Method::Rosenbrock).build().integrate(&blowup, 0., 1., &mut [0.]), Err(Error::StepSizeUnderflow{..}|Error::NonFinite{..})));
	}

	#[test] fn methods() {
		assert_eq!("rkc".parse::<Method>().unwrap(), Method::RKC);
		assert_eq!("Rosenbrock".parse::<Method>().unwrap(), Method::Rosenbrock);
		assert!(Settings{relative_tolerance: 0., ..Default::default()}.validate().is_err());
	}
}
