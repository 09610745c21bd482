#![allow(non_upper_case_globals)]
use std::{path::Path, process::Command};

const mechanism : &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/air.yaml");

fn reactor(arguments: &[&str]) -> std::process::Output {
	Command::new(env!("CARGO_BIN_EXE_reactor")).args(arguments).env("RUST_LOG", "warn").output().unwrap()
}

fn partial(output: &Path) -> std::path::PathBuf { let mut partial = output.as_os_str().to_owned(); partial.push(".partial"); partial.into() }

#[test] fn run() {
	let directory = tempfile::tempdir().unwrap();
	let output = directory.path().join("results.txt");
	let result = reactor(&["-f", mechanism, "--duration", "0.1", "--samples", "10", "--time-unit", "ms", "-o", output.to_str().unwrap()]);
	assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
	let text = std::fs::read_to_string(&output).unwrap();
	let lines = text.lines().collect::<Vec<_>>();
	assert_eq!(lines.len(), 12);
	assert_eq!(lines[0], "time,temperature,density,viscosity");
	assert!(lines[1].starts_with("0,3000,"), "{}", lines[1]);
	assert_eq!(lines[11].split(',').next().unwrap().parse::<f64>().unwrap(), 100.);
}

#[test] fn configuration_file() {
	let directory = tempfile::tempdir().unwrap();
	let output = directory.path().join("results.txt");
	let config = directory.path().join("reactor.yaml");
	std::fs::write(&config, format!("samples: 2\nduration: 0.01\ntransport: constant:1.8e-5\noutput: {}\n", output.display())).unwrap();
	let result = reactor(&["-f", mechanism, "-c", config.to_str().unwrap(), "--samples", "3"]);
	assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
	let text = std::fs::read_to_string(&output).unwrap();
	assert_eq!(text.lines().count(), 5);
	assert!(text.lines().skip(1).all(|line| line.ends_with(",0.000018")), "{text}");
}

#[test] fn missing_mechanism() {
	let directory = tempfile::tempdir().unwrap();
	let output = directory.path().join("results.txt");
	let result = reactor(&["-f", directory.path().join("missing.yaml").to_str().unwrap(), "-o", output.to_str().unwrap()]);
	assert!(!result.status.success());
	assert!(String::from_utf8_lossy(&result.stderr).contains("missing.yaml"));
	assert!(!output.exists() && !partial(&output).exists());
}

#[test] fn malformed_mechanism() {
	let directory = tempfile::tempdir().unwrap();
	let output = directory.path().join("results.txt");
	let source = directory.path().join("malformed.yaml");
	std::fs::write(&source, "species:\n- {name: N2, composition: {N: 2}, thermo: {model: NASA9}}\n").unwrap();
	let result = reactor(&["-f", source.to_str().unwrap(), "-o", output.to_str().unwrap()]);
	assert!(!result.status.success());
	assert!(!output.exists() && !partial(&output).exists());
}

#[test] fn invalid_arguments() {
	let directory = tempfile::tempdir().unwrap();
	let output = directory.path().join("results.txt");
	let cases : [&[&str]; 4] = [&["--duration", "0"], &["--composition", "Ar:1"], &["--temperature=-1"], &["--integrator", "euler"]];
	for arguments in cases {
		let result = reactor(&[&["-f", mechanism, "-o", output.to_str().unwrap()][..], arguments].concat());
		assert!(!result.status.success(), "{arguments:?}");
		assert!(!output.exists());
	}
}

#[test] fn integration_failure_keeps_partial_history() {
	let directory = tempfile::tempdir().unwrap();
	let output = directory.path().join("results.txt");
	let config = directory.path().join("reactor.yaml");
	std::fs::write(&config, "duration: 1\nsamples: 4\nintegrator: {max-steps: 1}\n").unwrap();
	let result = reactor(&["-f", mechanism, "-c", config.to_str().unwrap(), "-o", output.to_str().unwrap()]);
	assert!(!result.status.success());
	assert!(!output.exists());
	let partial = std::fs::read_to_string(partial(&output)).unwrap();
	assert_eq!(partial.lines().count(), 2);
}

#[test] fn timeout_keeps_partial_history() {
	let directory = tempfile::tempdir().unwrap();
	let output = directory.path().join("results.txt");
	let result = reactor(&["-f", mechanism, "--duration", "1000", "--samples", "1000000", "--timeout", "0.05", "-o", output.to_str().unwrap()]);
	assert!(!result.status.success());
	assert!(String::from_utf8_lossy(&result.stderr).contains("cancelled"), "{}", String::from_utf8_lossy(&result.stderr));
	assert!(!output.exists());
	let partial = std::fs::read_to_string(partial(&output)).unwrap();
	let lines = partial.lines().collect::<Vec<_>>();
	assert_eq!(lines[0], "time,temperature,density,viscosity");
	assert!(lines.len() >= 2 && lines.len() < 1_000_002, "{}", lines.len());
}
