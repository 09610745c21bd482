use {std::path::PathBuf, thiserror::Error, crate::{history::History, integrator}};

#[derive(Error, Debug)] pub enum Error {
	/// Mechanism file missing, unreadable or outside the supported subset
	#[error("could not load mechanism {}: {message}", path.display())]
	MechanismLoad { path: PathBuf, message: String },
	#[error("invalid initial state: {0}")]
	StateInitialization(String),
	/// Advance to `time` failed, `history` holds the rows sampled before
	#[error("integration failed advancing to t={time} s after {} samples", history.len())]
	Integration { time: f64, #[source] source: integrator::Error, history: History },
	#[error("cancelled after {} samples", history.len())]
	Cancelled { history: History },
	#[error("could not write {}", path.display())]
	OutputWrite { path: PathBuf, #[source] source: std::io::Error },
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	pub fn config(message: impl Into<String>) -> Self { Error::Config(message.into()) }
	/// Partial history recorded before an integration failure or a cancellation
	pub fn history(&self) -> Option<&History> {
		match self { Error::Integration{history, ..} | Error::Cancelled{history} => Some(history), _ => None }
	}
}
