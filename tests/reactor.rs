use {approx::assert_relative_eq, homogeneous::{*, integrator::{Method, Settings}}};

fn air() -> Mechanism { yaml::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/air.yaml")).unwrap() }

fn run(mechanism: &Mechanism, duration: f64, samples: usize, settings: Settings) -> Result<History, Error> {
	let config = Config::default();
	let mut reactor = reactor::initialize(mechanism, config.temperature, config.pressure, &config.composition, config.transport, settings.build())?;
	Sampler::new(duration, samples, TimeUnit::Second)?.run(&mut reactor, &Cancel::new())
}

fn parse(text: &str) -> (Vec<&str>, Vec<[f64; 4]>) {
	let mut lines = text.lines();
	let header = lines.next().unwrap().split(',').collect();
	let rows = lines.map(|line| line.split(',').map(|v| v.parse::<f64>().unwrap()).collect::<Vec<_>>().try_into().unwrap()).collect();
	(header, rows)
}

#[test] fn thermal_dissociation() {
	let mechanism = air();
	let history = run(&mechanism, 10., 1000, Settings::default()).unwrap();
	assert_eq!(history.len(), 1001);
	let initial = history[0];
	assert_eq!(initial.time, 0.);
	assert_eq!(initial.temperature, 3000.);
	for (i, row) in history.iter().enumerate() {
		assert_relative_eq!(row.time, i as f64 * 0.01, max_relative=1e-12);
		assert!(row.temperature.is_finite() && row.temperature > 0. && row.temperature <= 3000. + 1e-6, "{i}: {}", row.temperature);
		assert_relative_eq!(row.density, initial.density, max_relative=1e-9);
		assert!(row.viscosity > 1e-5 && row.viscosity < 1e-3, "{i}: {}", row.viscosity);
	}
	assert!(history.windows(2).all(|w| w[0].time < w[1].time));
	assert!(history[1000].temperature < 3000.);
}

#[test] fn deterministic() {
	let mechanism = air();
	assert_eq!(run(&mechanism, 1., 100, Settings::default()).unwrap(), run(&mechanism, 1., 100, Settings::default()).unwrap());
}

#[test] fn no_samples() {
	let mechanism = air();
	let history = run(&mechanism, 10., 0, Settings::default()).unwrap();
	assert_eq!(history.len(), 1);
	assert_eq!(history[0].temperature, 3000.);
}

#[test] fn integrators_agree() {
	let mechanism = air();
	let settings = |method| Settings{method, relative_tolerance: 1e-8, absolute_tolerance: 1e-12, ..Default::default()};
	let [rosenbrock, rkc] = [Method::Rosenbrock, Method::RKC].map(|method| run(&mechanism, 1e-4, 10, settings(method)).unwrap());
	assert_eq!(rosenbrock.len(), rkc.len());
	for (a, b) in rosenbrock.iter().zip(rkc.iter()) {
		assert_eq!(a.time, b.time);
		assert_relative_eq!(a.temperature, b.temperature, max_relative=1e-6);
		assert_relative_eq!(a.viscosity, b.viscosity, max_relative=1e-6);
	}
}

#[test] fn integration_failure() {
	let mechanism = air();
	match run(&mechanism, 10., 10, Settings{max_steps: 1, ..Default::default()}) {
		Err(Error::Integration{time, history, ..}) => {
			assert_eq!(time, 1.);
			assert_eq!(history.len(), 1);
		}
		Err(error) => panic!("{error}"),
		Ok(history) => panic!("{} rows", history.len()),
	}
}

#[test] fn write_round_trip() {
	let mechanism = air();
	let history = run(&mechanism, 1., 20, Settings::default()).unwrap();
	let directory = tempfile::tempdir().unwrap();
	let path = directory.path().join("results.txt");
	std::fs::write(&path, "stale\n".repeat(100)).unwrap();
	output::write(&path, &history).unwrap();
	let text = std::fs::read_to_string(&path).unwrap();
	let (header, rows) = parse(&text);
	assert_eq!(header, ["time", "temperature", "density", "viscosity"]);
	assert_eq!(rows.len(), history.len());
	for (row, sample) in rows.iter().zip(history.iter()) {
		assert_eq!(row, &[sample.time, sample.temperature, sample.density, sample.viscosity]);
	}
}

#[test] fn write_error() {
	let directory = tempfile::tempdir().unwrap();
	let path = directory.path().join("missing").join("results.txt");
	match output::write(&path, &History::default()) {
		Err(Error::OutputWrite{path: error_path, ..}) => assert_eq!(error_path, path),
		result => panic!("{result:?}"),
	}
	assert!(!path.exists());
}
