//! Delimited text output of a sampled history
use {std::{io::Write, path::Path}, itertools::Itertools, log::info, crate::{Error, History, SampleRow}};

pub const header : [&str; 4] = ["time", "temperature", "density", "viscosity"];

/// Writes one header line and one line per row, overwriting `path`
pub fn write(path: impl AsRef<Path>, history: &History) -> Result<(), Error> {
	let path = path.as_ref();
	let error = |source| Error::OutputWrite{path: path.to_owned(), source};
	let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(error)?);
	writeln!(file, "{}", header.iter().format(",")).map_err(error)?;
	for &SampleRow{time, temperature, density, viscosity} in history.iter() {
		writeln!(file, "{}", [time, temperature, density, viscosity].iter().format(",")).map_err(error)?;
	}
	file.flush().map_err(error)?;
	info!("{} rows written to {}", history.len(), path.display());
	Ok(())
}

#[cfg(test)] mod test {
	use super::*;
	#[test] fn format() {
		let directory = tempfile::tempdir().unwrap();
		let path = directory.path().join("history.txt");
		let history = History::from(vec![SampleRow{time: 0., temperature: 3000., density: 0.0117, viscosity: 8.5e-5}, SampleRow{time: 0.01, temperature: 2999.5, density: 0.0117, viscosity: 8.499e-5}]);
		write(&path, &history).unwrap();
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "time,temperature,density,viscosity\n0,3000,0.0117,0.000085\n0.01,2999.5,0.0117,0.00008499\n");
	}
}
