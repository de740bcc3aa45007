//! Progress and log events sent to whoever drives a scan.

use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
	Trace,
	Debug,
	Info,
	Warning,
	Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
	RelicAdd,
	RelicSuccess,
	LightConeAdd,
	LightConeSuccess,
	CharacterAdd,
	CharacterSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Log { message: String, level: LogLevel },
	Progress(Increment),
}

/// Sending half of the event channel.
///
/// Messages below `Info` are only forwarded in debug mode. Everything is also
/// mirrored to `tracing` so the process log has the full picture. A receiver
/// that went away is not an error; the scan keeps going.
#[derive(Debug, Clone)]
pub struct Notifier {
	tx: Sender<Event>,
	debug: bool,
}

impl Notifier {
	pub fn new(tx: Sender<Event>, debug: bool) -> Self {
		Self { tx, debug }
	}

	pub fn channel(debug: bool) -> (Self, Receiver<Event>) {
		let (tx, rx) = mpsc::channel();
		(Self::new(tx, debug), rx)
	}

	pub fn debug(&self) -> bool {
		self.debug
	}

	pub fn log(&self, message: impl Into<String>, level: LogLevel) {
		let message = message.into();
		match level {
			LogLevel::Trace => tracing::trace!("{message}"),
			LogLevel::Debug => tracing::debug!("{message}"),
			LogLevel::Info => tracing::info!("{message}"),
			LogLevel::Warning => tracing::warn!("{message}"),
			LogLevel::Error => tracing::error!("{message}"),
		}

		if level >= LogLevel::Info || self.debug {
			let _ = self.tx.send(Event::Log { message, level });
		}
	}

	pub fn progress(&self, increment: Increment) {
		let _ = self.tx.send(Event::Progress(increment));
	}
}
