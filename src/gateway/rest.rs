//! The hosted gateway, reached over HTTP.
//!
//! Tables are served under `/rest/v1/<table>` with filters, ordering and embedded joins encoded in
//! the query string. Accounts are served under `/auth/v1`.
//! Every request carries the project's anon key, and the caller's access token when there is one.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
	gateway::{Direction, Error, Filter, Gateway, Record, Result, Select, Table},
	session::Session
};



#[derive(Clone)]
pub struct Client {
	http: reqwest::Client,
	base_url: String,
	anon_key: String,
	/// The access token of the session this client acts for.
	bearer: Option<String>
}

#[derive(Deserialize)]
struct AuthUser {
	id: String,
	#[serde(default)]
	email: Option<String>
}

#[derive(Deserialize)]
struct TokenGrant {
	access_token: String,
	user: AuthUser
}



impl Client {

	pub fn new( base_url: &str, anon_key: &str ) -> Self {
		Self {
			http: reqwest::Client::new(),
			base_url: base_url.trim_end_matches('/').to_owned(),
			anon_key: anon_key.to_owned(),
			bearer: None
		}
	}

	fn table_url( &self, table: Table ) -> String {
		format!("{}/rest/v1/{}", self.base_url, table.name())
	}

	fn auth_url( &self, path: &str ) -> String {
		format!("{}/auth/v1/{}", self.base_url, path)
	}

	/// Starts a request with the key and token headers filled in.
	/// `token` overrides the bearer of this client.
	fn request( &self, method: Method, url: &str, token: Option<&str> ) -> RequestBuilder {
		let bearer = token.or( self.bearer.as_deref() ).unwrap_or( &self.anon_key );

		self.http.request( method, url )
			.header( "apikey", &self.anon_key )
			.header( header::AUTHORIZATION, format!("Bearer {}", bearer) )
	}
}

#[async_trait]
impl Gateway for Client {

	async fn select( &self, query: &Select ) -> Result<Vec<Record>> {
		query.validate()?;
		let pairs = query_pairs( query );
		debug!("rest select {}: {:?}", query.table.name(), pairs);

		let response = self.request( Method::GET, &self.table_url( query.table ), None )
			.query( &pairs )
			.send().await?;

		Ok( check( response ).await?.json::<Vec<Record>>().await? )
	}

	async fn insert( &self, table: Table, record: Record ) -> Result<()> {
		table.check_columns( record.keys().map(|k| k.as_str()) )?;
		debug!("rest insert into {}", table.name());

		let response = self.request( Method::POST, &self.table_url( table ), None )
			.header( "Prefer", "return=minimal" )
			.json( &record )
			.send().await?;

		check( response ).await?;
		Ok(())
	}

	async fn update( &self, table: Table, filters: &[Filter], patch: Record ) -> Result<()> {
		table.check_columns( patch.keys().map(|k| k.as_str()) )?;
		table.check_columns( filters.iter().map(|f| f.column) )?;
		debug!("rest update of {}", table.name());

		let response = self.request( Method::PATCH, &self.table_url( table ), None )
			.header( "Prefer", "return=minimal" )
			.query( &filter_pairs( filters ) )
			.json( &patch )
			.send().await?;

		check( response ).await?;
		Ok(())
	}

	async fn sign_in( &self, email: &str, password: &str ) -> Result<Option<Session>> {
		let response = self.request( Method::POST, &self.auth_url("token"), None )
			.query( &[("grant_type", "password")] )
			.json( &serde_json::json!({ "email": email, "password": password }) )
			.send().await?;

		// Wrong credentials are reported with a client error.
		if response.status() == StatusCode::BAD_REQUEST || response.status() == StatusCode::UNAUTHORIZED {
			return Ok( None )
		}

		let grant: TokenGrant = check( response ).await?.json().await?;
		Ok( Some( Session {
			user_id: grant.user.id,
			email: grant.user.email.unwrap_or_else(|| email.to_owned()),
			access_token: grant.access_token
		}))
	}

	async fn current_session( &self, access_token: &str ) -> Result<Option<Session>> {
		let response = self.request( Method::GET, &self.auth_url("user"), Some(access_token) )
			.send().await?;

		if response.status() == StatusCode::UNAUTHORIZED || response.status() == StatusCode::FORBIDDEN {
			return Ok( None )
		}

		let user: AuthUser = check( response ).await?.json().await?;
		Ok( Some( Session {
			user_id: user.id,
			email: user.email.unwrap_or_default(),
			access_token: access_token.to_owned()
		}))
	}

	async fn sign_out( &self, access_token: &str ) -> Result<()> {
		let response = self.request( Method::POST, &self.auth_url("logout"), Some(access_token) )
			.send().await?;

		check( response ).await?;
		Ok(())
	}

	fn with_session( &self, session: Option<&Session> ) -> Arc<dyn Gateway> {
		let mut scoped = self.clone();
		scoped.bearer = session.map(|s| s.access_token.clone());
		Arc::new( scoped )
	}
}



/// Encodes a select as query string pairs, e.g.
/// `select=id,content,profiles!posts_author_id_fkey(full_name,email)&author_id=eq.42&order=created_at.desc`.
pub fn query_pairs( query: &Select ) -> Vec<(String, String)> {
	let mut select = if query.columns.is_empty() {
		"*".to_owned()
	}
	else {
		query.columns.join(",")
	};

	if let Some(embed) = &query.embed {
		select.push_str( &format!(",{}!{}({})", embed.relation.target.name(), embed.relation.name, embed.columns.join(",")) );
	}

	let mut pairs = vec![("select".to_owned(), select)];
	pairs.extend( filter_pairs( &query.filters ) );

	if let Some(order) = &query.order {
		let direction = match order.direction {
			Direction::Descending => "desc"
		};
		pairs.push( ("order".to_owned(), format!("{}.{}", order.column, direction)) );
	}

	pairs
}

fn filter_pairs( filters: &[Filter] ) -> Vec<(String, String)> {
	filters.iter()
		.map(|f| (f.column.to_owned(), format!("eq.{}", f.value)))
		.collect()
}

/// Turns a non-success status into `Error::Api`, with the message the gateway gave for it.
async fn check( response: Response ) -> Result<Response> {
	let status = response.status();
	if status.is_success() {
		return Ok( response )
	}

	let body = response.text().await.unwrap_or_default();
	let message = error_message( &body );
	warn!("Gateway responded with {}: {}", status, message);

	Err( Error::Api {
		status: status.as_u16(),
		message
	})
}

fn error_message( body: &str ) -> String {
	let parsed: Option<Value> = serde_json::from_str( body ).ok();

	parsed.as_ref()
		.and_then(|v| ["message", "msg", "error_description", "error"].iter().find_map(|k| v.get(*k)?.as_str()))
		.map(str::to_owned)
		.unwrap_or_else(|| body.to_owned())
}
