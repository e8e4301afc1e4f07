//! Runtime configuration, read from the environment (and a `.env` file, if there is one).

use std::{
	env,
	path::PathBuf
};

use lazy_static::lazy_static;
use thiserror::Error;



lazy_static! {
	pub static ref DEFAULT_TEMPLATES: String = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*").to_owned();
	pub static ref DEFAULT_DATABASE: PathBuf = PathBuf::from( "connecthub.sqlite" );
}

pub const DEFAULT_BIND: &str = "0.0.0.0:7777";

#[derive(Clone, Debug, PartialEq)]
pub enum GatewayConfig {
	/// The hosted service.
	Rest { url: String, anon_key: String },
	/// An SQLite file on this machine.
	Local { database: PathBuf, seed: Option<SeedAccount> }
}

/// An account registered in the local store at startup, so that there is someone to sign in as.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedAccount {
	pub email: String,
	pub full_name: String,
	pub password: String
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
	pub bind: String,
	pub templates: String,
	pub gateway: GatewayConfig
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("{0} must be set when using the hosted gateway")]
	Missing( &'static str ),
	#[error("CONNECTHUB_SEED_PASSWORD must be set along with CONNECTHUB_SEED_EMAIL")]
	SeedPassword,
	#[error("unknown gateway \"{0}\", expected \"rest\" or \"local\"")]
	UnknownGateway( String )
}



impl Config {

	pub fn from_env() -> Result<Self, Error> {
		dotenv::dotenv().ok();
		Self::from_lookup(|key| env::var( key ).ok())
	}

	/// Builds the configuration from any source of variables.
	pub fn from_lookup( lookup: impl Fn(&str) -> Option<String> ) -> Result<Self, Error> {
		let var = |key: &str| lookup( key ).filter(|v| !v.trim().is_empty());

		let gateway = match var("CONNECTHUB_GATEWAY").as_deref().unwrap_or("local") {
			"rest" => GatewayConfig::Rest {
				url: var("GATEWAY_URL").ok_or( Error::Missing("GATEWAY_URL") )?,
				anon_key: var("GATEWAY_ANON_KEY").ok_or( Error::Missing("GATEWAY_ANON_KEY") )?
			},
			"local" => GatewayConfig::Local {
				database: var("CONNECTHUB_DATABASE").map( PathBuf::from ).unwrap_or_else(|| DEFAULT_DATABASE.clone()),
				seed: match var("CONNECTHUB_SEED_EMAIL") {
					None => None,
					Some(email) => Some( SeedAccount {
						full_name: var("CONNECTHUB_SEED_NAME")
							.unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_owned()),
						password: var("CONNECTHUB_SEED_PASSWORD").ok_or( Error::SeedPassword )?,
						email
					})
				}
			},
			other => return Err( Error::UnknownGateway( other.to_owned() ) )
		};

		Ok( Self {
			bind: var("CONNECTHUB_BIND").unwrap_or_else(|| DEFAULT_BIND.to_owned()),
			templates: var("CONNECTHUB_TEMPLATES").unwrap_or_else(|| DEFAULT_TEMPLATES.clone()),
			gateway
		})
	}
}
