//! Manual test wrapper around the `mpat` crate: wires a channel list and a
//! payload source from argv. Not part of the library's public contract.
//!
//! Usage:
//!   mpat-cli send   <host:port>[,<host:port>...] <payload-file>
//!   mpat-cli receive <host:port>[,<host:port>...]

use std::env;
use std::fs;
use std::process::ExitCode;

use mpat::{ChannelDescriptor, ReceiverEndpoint, SenderSession};

fn main() -> ExitCode {
	env_logger::init();

	let args: Vec<String> = env::args().collect();

	match args.get(1).map(String::as_str) {
		Some("send") => run_send(&args[2..]),
		Some("receive") => run_receive(&args[2..]),
		_ => {
			eprintln!("usage: mpat-cli send <channels> <payload-file> | mpat-cli receive <channels>");
			ExitCode::FAILURE
		}
	}
}

fn run_send(args: &[String]) -> ExitCode {
	let (Some(channel_spec), Some(payload_path)) = (args.first(), args.get(1)) else {
		eprintln!("usage: mpat-cli send <channels> <payload-file>");
		return ExitCode::FAILURE;
	};

	let channels = match parse_channels(channel_spec) {
		Ok(channels) => channels,
		Err(err) => {
			eprintln!("{err}");
			return ExitCode::FAILURE;
		}
	};

	let payload = match fs::read(payload_path) {
		Ok(payload) => payload,
		Err(err) => {
			eprintln!("failed to read {payload_path}: {err}");
			return ExitCode::FAILURE;
		}
	};

	let session = match SenderSession::new(channels) {
		Ok(session) => session,
		Err(err) => {
			eprintln!("{err}");
			return ExitCode::FAILURE;
		}
	};

	println!("sending session {}", session.session_id());

	match session.send(&payload) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("{err}");
			ExitCode::FAILURE
		}
	}
}

fn run_receive(args: &[String]) -> ExitCode {
	let Some(channel_spec) = args.first() else {
		eprintln!("usage: mpat-cli receive <channels>");
		return ExitCode::FAILURE;
	};

	let channels = match parse_channels(channel_spec) {
		Ok(channels) => channels,
		Err(err) => {
			eprintln!("{err}");
			return ExitCode::FAILURE;
		}
	};

	println!("listening on {} channel(s), Ctrl+C to stop", channels.len());

	match ReceiverEndpoint::new().start_until_ctrl_c(&channels) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("{err}");
			ExitCode::FAILURE
		}
	}
}

/// Parses `name@host:port,name@host:port,...`, defaulting `name` to the
/// channel's position when omitted (`host:port,host:port,...`).
fn parse_channels(spec: &str) -> Result<Vec<ChannelDescriptor>, String> {
	spec.split(',')
		.enumerate()
		.map(|(i, entry)| {
			let (name, address) = match entry.split_once('@') {
				Some((name, address)) => (name.to_string(), address),
				None => (i.to_string(), entry),
			};

			let (host, port) = address.rsplit_once(':').ok_or_else(|| format!("invalid channel '{entry}', expected host:port"))?;

			let port: u16 = port.parse().map_err(|_| format!("invalid port in '{entry}'"))?;

			Ok(ChannelDescriptor::new(name, host.to_string(), port))
		})
		.collect()
}
