use actix_web::{middleware, web::Data, App, HttpServer};
use tera::Tera;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::{
	process,
	sync::Arc
};

use crate::{
	config::{Config, GatewayConfig},
	gateway::{local, rest, Gateway}
};



mod config;
mod gateway;
mod post;
mod profile;
mod render;
mod runtime;
mod session;
mod view;
mod web;



pub const RETURN_CODE_OK: i32 = 0;
pub const RETURN_CODE_UNEXPECTED: i32 = 1;



pub struct Globals {
	gateway: Arc<dyn Gateway>,
	tera: tera::Tera
}



#[actix_web::main]
async fn main() {

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info,connecthub=debug".into())
		)
		.with( tracing_subscriber::fmt::layer() )
		.init();

	let config = match Config::from_env() {
		Err(e) => { error!("Invalid configuration: {}", e); process::exit( RETURN_CODE_UNEXPECTED ) },
		Ok(config) => config
	};

	let tera = match Tera::new( &config.templates ) {
		Err(e) => { error!("Unable to load templates from {}: {}", config.templates, e); process::exit( RETURN_CODE_UNEXPECTED ) },
		Ok(tera) => tera
	};

	let gateway: Arc<dyn Gateway> = match &config.gateway {
		GatewayConfig::Rest { url, anon_key } => {
			info!("Using hosted gateway at {}", url);
			Arc::new( rest::Client::new( url, anon_key ) )
		},
		GatewayConfig::Local { database, seed } => {
			let store = match local::Store::open( database ).await {
				Err(e) => { error!("Unable to open {}: {}", database.display(), e); process::exit( RETURN_CODE_UNEXPECTED ) },
				Ok(store) => store
			};
			info!("Using local gateway at {}", database.display());

			if let Some(seed) = seed {
				if let Err(e) = store.ensure_account( &seed.email, &seed.full_name, &seed.password ).await {
					error!("Unable to set up account {}: {}", seed.email, e);
					process::exit( RETURN_CODE_UNEXPECTED )
				}
			}
			Arc::new( store )
		}
	};

	let globals = Arc::new( Globals {
		gateway,
		tera
	});

	let server = match HttpServer::new(move || {

		App::new()
			.app_data( Data::new( globals.clone() ) )
			.wrap( middleware::Logger::default() )
			.configure( web::routes )
	}).bind( &config.bind ) {
		Err(e) => { error!("Unable to start HTTP server on {}: {}", config.bind, e); process::exit( RETURN_CODE_UNEXPECTED ) },
		Ok(server) => server
	};
	info!("HTTP server starting on {}...", config.bind);

	match server.run().await {
		Err(e) => { error!("HTTP server error: {}", e); process::exit( RETURN_CODE_UNEXPECTED ) },
		Ok(()) => {}
	}

	info!("HTTP server stopped.");
	process::exit( RETURN_CODE_OK )
}
