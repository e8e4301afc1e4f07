//! An embedded stand-in for the hosted gateway, backed by SQLite.
//!
//! It keeps the same tables, join, filter and ordering semantics as the hosted service, plus a
//! minimal account and session store, so that ConnectHub can run and be tested without a network.

use std::{
	ops::{Deref, DerefMut},
	path::Path,
	sync::{Arc, Mutex}
};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use fallible_iterator::FallibleIterator;
use rusqlite::{self, params, params_from_iter, types::Value as SqlValue, OptionalExtension};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
	gateway::{Direction, Error, Gateway, Record, Result, Select, Table, Filter},
	runtime,
	session::Session
};



const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS profiles (
	id TEXT PRIMARY KEY,
	full_name TEXT NOT NULL,
	email TEXT NOT NULL UNIQUE,
	bio TEXT,
	created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS posts (
	id TEXT PRIMARY KEY,
	content TEXT NOT NULL CHECK (length(content) BETWEEN 1 AND 500),
	created_at TEXT NOT NULL,
	author_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS posts_created_at ON posts (created_at);
CREATE TABLE IF NOT EXISTS accounts (
	profile_id TEXT PRIMARY KEY REFERENCES profiles (id),
	password_sha256 TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sessions (
	token TEXT PRIMARY KEY,
	profile_id TEXT NOT NULL REFERENCES profiles (id)
);
";

pub struct Connection ( rusqlite::Connection );

#[derive(Clone)]
pub struct Store {
	db: Arc<Mutex<Connection>>
}

/// Where each column of a result row ends up in the record.
struct Layout {
	columns: Vec<&'static str>,
	embed: Option<(&'static str, Vec<&'static str>)>
}



impl Connection {

	/// Runs a select statement and turns every row into a record according to `layout`.
	fn query_records( &self, sql: &str, params: Vec<SqlValue>, layout: &Layout ) -> rusqlite::Result<Vec<Record>> {
		let mut statement = self.0.prepare( sql )?;
		let rows = statement.query( params_from_iter( params ) )?;

		let records = rows.map(|row| {
			let mut record = Record::new();
			for (i, column) in layout.columns.iter().enumerate() {
				record.insert( column.to_string(), to_json( row.get(i)? ) );
			}

			if let Some((key, embedded)) = &layout.embed {
				let offset = layout.columns.len();
				// The key of the joined row is selected last, and is only null if nothing was joined.
				let key_value: SqlValue = row.get( offset + embedded.len() )?;
				let value = if key_value == SqlValue::Null {
					Value::Null
				}
				else {
					let mut nested = Record::new();
					for (i, column) in embedded.iter().enumerate() {
						nested.insert( column.to_string(), to_json( row.get(offset + i)? ) );
					}
					Value::Object( nested )
				};
				record.insert( key.to_string(), value );
			}

			Ok( record )
		}).collect()?;

		Ok( records )
	}
}

impl Store {

	/// Opens the database at `path`, creating the tables if they don't exist yet.
	/// The path `:memory:` opens a private in-memory database.
	pub async fn open( path: impl AsRef<Path> ) -> Result<Self> {
		let path = path.as_ref().to_owned();

		let connection = runtime::block_on(move || -> Result<Connection> {
			let connection = rusqlite::Connection::open( &path )?;
			connection.execute_batch( SCHEMA )?;
			Ok( Connection ( connection ) )
		}).await.map_err(|e| Error::Unavailable( format!("unable to open database: {}", e) ))??;

		Ok( Self {
			db: Arc::new( Mutex::new( connection ) )
		})
	}

	/// Creates a profile with an account that can sign in, and returns the profile id.
	pub async fn register( &self, email: &str, full_name: &str, password: &str ) -> Result<String> {
		let id = Uuid::new_v4().to_string();
		let (user_id, email, full_name) = (id.clone(), email.to_owned(), full_name.to_owned());
		let digest = password_digest( password );

		self.with_connection(move |con| {
			con.execute( "INSERT INTO profiles (id, full_name, email, bio, created_at) VALUES (?, ?, ?, NULL, ?)",
				params![user_id, full_name, email, now()] )?;
			con.execute( "INSERT INTO accounts (profile_id, password_sha256) VALUES (?, ?)",
				params![user_id, digest] )?;
			Ok(())
		}).await?;

		Ok( id )
	}

	/// Makes sure `email` can sign in, registering it with `full_name` and `password` if there is no
	/// profile for it yet. An existing profile is left as it is. Returns the profile id.
	pub async fn ensure_account( &self, email: &str, full_name: &str, password: &str ) -> Result<String> {
		let lookup = email.to_owned();
		let existing = self.with_connection(move |con| {
			let id: Option<String> = con.query_row( "SELECT id FROM profiles WHERE email = ?", params![lookup], |row| row.get(0) ).optional()?;
			Ok( id )
		}).await?;

		match existing {
			Some(id) => Ok( id ),
			None => {
				let id = self.register( email, full_name, password ).await?;
				info!("Registered {} as {}", email, id);
				Ok( id )
			}
		}
	}

	/// Runs `func` with exclusive access to the connection, on the blocking thread pool.
	async fn with_connection<F, R>( &self, func: F ) -> Result<R> where
		F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
		R: Send + 'static
	{
		let db = self.db.clone();

		runtime::block_on(move || {
			let mut guard = db.lock().map_err(|_| Error::Unavailable( "database connection poisoned".into() ))?;
			func( &mut guard )
		}).await.map_err(|e| Error::Unavailable( format!("database task failed: {}", e) ))?
	}
}

#[async_trait]
impl Gateway for Store {

	async fn select( &self, query: &Select ) -> Result<Vec<Record>> {
		query.validate()?;
		let (sql, params, layout) = select_statement( query );
		debug!("local select: {}", sql);

		self.with_connection(move |con| Ok( con.query_records( &sql, params, &layout )? )).await
	}

	async fn insert( &self, table: Table, mut record: Record ) -> Result<()> {
		table.check_columns( record.keys().map(|k| k.as_str()) )?;

		if !record.contains_key("id") {
			record.insert( "id".into(), Value::String( Uuid::new_v4().to_string() ) );
		}
		if !record.contains_key("created_at") {
			record.insert( "created_at".into(), Value::String( now() ) );
		}

		let columns: Vec<String> = record.keys().cloned().collect();
		let params = record.into_iter().map(|(_, v)| to_sql( v )).collect::<Result<Vec<_>>>()?;
		let placeholders = vec!["?"; columns.len()].join(", ");
		let sql = format!("INSERT INTO {} ({}) VALUES ({})", table.name(), columns.join(", "), placeholders);
		debug!("local insert: {}", sql);

		self.with_connection(move |con| {
			con.execute( &sql, params_from_iter( params ) )?;
			Ok(())
		}).await
	}

	async fn update( &self, table: Table, filters: &[Filter], patch: Record ) -> Result<()> {
		if patch.is_empty() {
			return Err( Error::Schema( "update without any fields".into() ) )
		}
		table.check_columns( patch.keys().map(|k| k.as_str()) )?;
		table.check_columns( filters.iter().map(|f| f.column) )?;

		let assignments: Vec<String> = patch.keys().map(|k| format!("{} = ?", k)).collect();
		let mut params = patch.into_iter().map(|(_, v)| to_sql( v )).collect::<Result<Vec<_>>>()?;
		let mut sql = format!("UPDATE {} SET {}", table.name(), assignments.join(", "));
		push_filters( &mut sql, &mut params, None, filters );
		debug!("local update: {}", sql);

		self.with_connection(move |con| {
			con.execute( &sql, params_from_iter( params ) )?;
			Ok(())
		}).await
	}

	async fn sign_in( &self, email: &str, password: &str ) -> Result<Option<Session>> {
		let email = email.to_owned();
		let digest = password_digest( password );

		self.with_connection(move |con| {
			let user_id: Option<String> = con.query_row(
				"SELECT p.id FROM accounts a JOIN profiles p ON p.id = a.profile_id WHERE p.email = ? AND a.password_sha256 = ?",
				params![email, digest],
				|row| row.get(0)
			).optional()?;

			let user_id = match user_id {
				None => return Ok( None ),
				Some(id) => id
			};

			let token = Uuid::new_v4().simple().to_string();
			con.execute( "INSERT INTO sessions (token, profile_id) VALUES (?, ?)", params![token, user_id] )?;

			Ok( Some( Session {
				user_id,
				email,
				access_token: token
			}))
		}).await
	}

	async fn current_session( &self, access_token: &str ) -> Result<Option<Session>> {
		let token = access_token.to_owned();

		self.with_connection(move |con| {
			let session = con.query_row(
				"SELECT p.id, p.email FROM sessions s JOIN profiles p ON p.id = s.profile_id WHERE s.token = ?",
				params![token],
				|row| Ok( Session {
					user_id: row.get(0)?,
					email: row.get(1)?,
					access_token: token.clone()
				})
			).optional()?;

			Ok( session )
		}).await
	}

	async fn sign_out( &self, access_token: &str ) -> Result<()> {
		let token = access_token.to_owned();

		self.with_connection(move |con| {
			con.execute( "DELETE FROM sessions WHERE token = ?", params![token] )?;
			Ok(())
		}).await
	}

	fn with_session( &self, _session: Option<&Session> ) -> Arc<dyn Gateway> {
		Arc::new( self.clone() )
	}
}



/// Builds the SQL for `query`. The selected table is aliased `t`, the embedded one `j`.
fn select_statement( query: &Select ) -> (String, Vec<SqlValue>, Layout) {
	let columns = query.selected_columns().to_vec();
	let mut selected: Vec<String> = columns.iter().map(|c| format!("t.{}", c)).collect();
	let mut from = format!("{} AS t", query.table.name());

	let embed = query.embed.as_ref().map(|embed| {
		let target = embed.relation.target;
		selected.extend( embed.columns.iter().map(|c| format!("j.{}", c)) );
		selected.push( "j.id".into() );
		from.push_str( &format!(" LEFT JOIN {} AS j ON j.id = t.{}", target.name(), embed.relation.column) );

		(target.name(), embed.columns.clone())
	});

	let mut sql = format!("SELECT {} FROM {}", selected.join(", "), from);
	let mut params = Vec::with_capacity( query.filters.len() );
	push_filters( &mut sql, &mut params, Some("t"), &query.filters );

	if let Some(order) = &query.order {
		let direction = match order.direction {
			Direction::Descending => "DESC"
		};
		sql.push_str( &format!(" ORDER BY t.{} {}", order.column, direction) );
	}

	(sql, params, Layout { columns, embed })
}

fn push_filters( sql: &mut String, params: &mut Vec<SqlValue>, alias: Option<&str>, filters: &[Filter] ) {
	let prefix = alias.map(|a| format!("{}.", a)).unwrap_or_default();

	for (i, filter) in filters.iter().enumerate() {
		sql.push_str( if i == 0 { " WHERE " } else { " AND " } );
		sql.push_str( &format!("{}{} = ?", prefix, filter.column) );
		params.push( SqlValue::Text( filter.value.clone() ) );
	}
}

fn to_json( value: SqlValue ) -> Value {
	match value {
		SqlValue::Null => Value::Null,
		SqlValue::Integer(i) => Value::Number( i.into() ),
		SqlValue::Real(f) => Number::from_f64( f ).map( Value::Number ).unwrap_or( Value::Null ),
		SqlValue::Text(s) => Value::String( s ),
		SqlValue::Blob(b) => Value::String( hex::encode( b ) )
	}
}

fn to_sql( value: Value ) -> Result<SqlValue> {
	Ok( match value {
		Value::Null => SqlValue::Null,
		Value::Bool(b) => SqlValue::Integer( b as i64 ),
		Value::Number(n) => match n.as_i64() {
			Some(i) => SqlValue::Integer( i ),
			None => SqlValue::Real( n.as_f64().unwrap_or_default() )
		},
		Value::String(s) => SqlValue::Text( s ),
		other => return Err( Error::Schema( format!("unsupported field value {}", other) ) )
	})
}

/// The current time, written so that text order is time order.
fn now() -> String {
	Utc::now().to_rfc3339_opts( SecondsFormat::Micros, true )
}

fn password_digest( password: &str ) -> String {
	hex::encode( Sha256::digest( password.as_bytes() ) )
}



impl Deref for Connection {
	type Target = rusqlite::Connection;

	fn deref( &self ) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Connection {
	fn deref_mut( &mut self ) -> &mut Self::Target {
		&mut self.0
	}
}



#[cfg(test)]
impl Store {

	/// Inserts a post with a fixed creation time.
	pub async fn post_at( &self, author_id: &str, content: &str, created_at: &str ) -> Result<()> {
		let record = crate::gateway::to_record( &serde_json::json!({
			"author_id": author_id,
			"content": content,
			"created_at": created_at
		}) )?;
		self.insert( Table::Posts, record ).await
	}
}
