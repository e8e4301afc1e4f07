//! The gateway is the hosted data and authentication service that ConnectHub sits in front of.
//!
//! Everything the front end persists or reads goes through the [`Gateway`] trait.
//! Queries are described with [`Select`], and rows travel as JSON [`Record`]s, so that the hosted
//! service ([`rest`]) and the embedded development store ([`local`]) answer the same requests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::session::Session;

pub mod local;
pub mod rest;
#[cfg(test)]
pub mod scripted;



/// A single row, keyed by column name.
/// Embedded rows appear as a nested object under the name of their table.
pub type Record = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
	Posts,
	Profiles
}

/// A foreign key along which the row of another table can be embedded into a result row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation {
	/// The name of the constraint, which the hosted service uses to disambiguate the join.
	pub name: &'static str,
	/// The column of the selected table that holds the key.
	pub column: &'static str,
	pub target: Table
}

/// Every post has an author in the profiles table.
pub const POSTS_AUTHOR: Relation = Relation {
	name: "posts_author_id_fkey",
	column: "author_id",
	target: Table::Profiles
};

#[derive(Clone, Debug, PartialEq)]
pub struct Embed {
	pub relation: Relation,
	pub columns: Vec<&'static str>
}

/// An equality condition on a column.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
	pub column: &'static str,
	pub value: String
}

/// Lists are only ever shown newest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	Descending
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
	pub column: &'static str,
	pub direction: Direction
}

#[derive(Clone, Debug, PartialEq)]
pub struct Select {
	pub table: Table,
	/// The selected columns. Empty means all of them.
	pub columns: Vec<&'static str>,
	pub embed: Option<Embed>,
	pub filters: Vec<Filter>,
	pub order: Option<Order>
}

#[derive(Debug, Error)]
pub enum Error {
	/// The gateway answered, but with an error status.
	#[error("gateway responded with status {status}: {message}")]
	Api { status: u16, message: String },
	#[error("HTTP error: {0}")]
	Http( #[from] reqwest::Error ),
	#[error("database error: {0}")]
	Database( #[from] rusqlite::Error ),
	#[error("unable to decode record: {0}")]
	Decode( #[from] serde_json::Error ),
	/// A query or record referred to something the schema doesn't have.
	#[error("schema error: {0}")]
	Schema( String ),
	#[error("gateway unavailable: {0}")]
	Unavailable( String )
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait Gateway: Send + Sync {

	async fn select( &self, query: &Select ) -> Result<Vec<Record>>;

	async fn insert( &self, table: Table, record: Record ) -> Result<()>;

	/// Applies `patch` to every row matching all `filters`.
	async fn update( &self, table: Table, filters: &[Filter], patch: Record ) -> Result<()>;

	/// Exchanges credentials for a session.
	/// Returns `None` if the credentials were not accepted.
	async fn sign_in( &self, email: &str, password: &str ) -> Result<Option<Session>>;

	/// Looks up the session that belongs to `access_token`, if it is still valid.
	async fn current_session( &self, access_token: &str ) -> Result<Option<Session>>;

	async fn sign_out( &self, access_token: &str ) -> Result<()>;

	/// Returns a gateway that acts on behalf of `session`, or anonymously if there is none.
	fn with_session( &self, session: Option<&Session> ) -> Arc<dyn Gateway>;
}



impl Table {

	pub fn name( self ) -> &'static str {
		match self {
			Self::Posts => "posts",
			Self::Profiles => "profiles"
		}
	}

	pub fn columns( self ) -> &'static [&'static str] {
		match self {
			Self::Posts => &["id", "content", "created_at", "author_id"],
			Self::Profiles => &["id", "full_name", "email", "bio", "created_at"]
		}
	}

	pub fn has_column( self, column: &str ) -> bool {
		self.columns().contains( &column )
	}

	/// Checks that every given column exists in this table.
	pub fn check_columns<'a>( self, columns: impl IntoIterator<Item=&'a str> ) -> Result<()> {
		for column in columns {
			if !self.has_column( column ) {
				return Err( Error::Schema( format!("table {} has no column {}", self.name(), column) ) )
			}
		}
		Ok(())
	}
}

impl Select {

	pub fn from( table: Table ) -> Self {
		Self {
			table,
			columns: Vec::new(),
			embed: None,
			filters: Vec::new(),
			order: None
		}
	}

	pub fn columns( mut self, columns: &[&'static str] ) -> Self {
		self.columns = columns.to_vec();
		self
	}

	pub fn embed( mut self, relation: Relation, columns: &[&'static str] ) -> Self {
		self.embed = Some( Embed {
			relation,
			columns: columns.to_vec()
		});
		self
	}

	pub fn eq( mut self, column: &'static str, value: impl Into<String> ) -> Self {
		self.filters.push( Filter {
			column,
			value: value.into()
		});
		self
	}

	pub fn order_by( mut self, column: &'static str, direction: Direction ) -> Self {
		self.order = Some( Order { column, direction } );
		self
	}

	/// The columns that will actually be returned for the selected table.
	pub fn selected_columns( &self ) -> &[&'static str] {
		if self.columns.is_empty() {
			self.table.columns()
		}
		else {
			&self.columns
		}
	}

	/// Makes sure the query only refers to columns that exist.
	pub fn validate( &self ) -> Result<()> {
		self.table.check_columns( self.columns.iter().copied() )?;
		self.table.check_columns( self.filters.iter().map(|f| f.column) )?;
		if let Some(order) = &self.order {
			self.table.check_columns( Some(order.column) )?;
		}
		if let Some(embed) = &self.embed {
			self.table.check_columns( Some(embed.relation.column) )?;
			embed.relation.target.check_columns( embed.columns.iter().copied() )?;
		}
		Ok(())
	}
}

impl Error {

	/// Whether the gateway itself reported the failure, as opposed to the call not completing or its
	/// result not being understood.
	pub fn is_response( &self ) -> bool {
		matches!( self, Self::Api {..} | Self::Database(_) )
	}
}



/// Converts a serializable value into a record.
pub fn to_record<T: Serialize>( value: &T ) -> Result<Record> {
	match serde_json::to_value( value )? {
		Value::Object(map) => Ok( map ),
		other => Err( Error::Schema( format!("expected a record, got {}", other) ) )
	}
}

pub fn from_records<T: DeserializeOwned>( records: Vec<Record> ) -> Result<Vec<T>> {
	records.into_iter()
		.map(|r| serde_json::from_value( Value::Object(r) ).map_err(Error::from) )
		.collect()
}
