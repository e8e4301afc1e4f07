//! A gateway for tests that answers from canned results and records every call it receives.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::{
	gateway::{Error, Filter, Gateway, Record, Result, Select, Table},
	session::Session
};



/// How the scripted gateway answers one kind of call.
#[derive(Clone, Debug)]
pub enum Answer<T> {
	Ok( T ),
	/// The gateway answers with an error status.
	Refuse,
	/// The call never completes successfully.
	Fail
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
	Select( Select ),
	Insert( Table, Record ),
	Update( Table, Vec<Filter>, Record )
}

#[derive(Clone)]
pub struct Scripted {
	inner: Arc<Mutex<Script>>
}

struct Script {
	posts: Answer<Vec<Value>>,
	profiles: Answer<Vec<Value>>,
	writes: Answer<()>,
	calls: Vec<Call>,
	rendezvous: Option<Rendezvous>
}

/// Makes a posts select and a profiles select wait for each other to start.
#[derive(Clone, Default)]
struct Rendezvous {
	posts: Arc<Notify>,
	profiles: Arc<Notify>
}



impl<T: Clone> Answer<T> {
	fn resolve( &self ) -> Result<T> {
		match self {
			Self::Ok(value) => Ok( value.clone() ),
			Self::Refuse => Err( Error::Api { status: 400, message: "refused".into() } ),
			Self::Fail => Err( Error::Unavailable( "connection reset".into() ) )
		}
	}
}

impl Scripted {

	pub fn new() -> Self {
		Self {
			inner: Arc::new( Mutex::new( Script {
				posts: Answer::Ok( Vec::new() ),
				profiles: Answer::Ok( Vec::new() ),
				writes: Answer::Ok(()),
				calls: Vec::new(),
				rendezvous: None
			}))
		}
	}

	pub fn posts( self, answer: Answer<Vec<Value>> ) -> Self {
		self.inner.lock().unwrap().posts = answer;
		self
	}

	pub fn profiles( self, answer: Answer<Vec<Value>> ) -> Self {
		self.inner.lock().unwrap().profiles = answer;
		self
	}

	pub fn writes( self, answer: Answer<()> ) -> Self {
		self.inner.lock().unwrap().writes = answer;
		self
	}

	/// Holds every posts select until a profiles select has started, and the other way round.
	/// Two selects that are awaited one after the other never finish.
	pub fn overlapping_selects( self ) -> Self {
		self.inner.lock().unwrap().rendezvous = Some( Rendezvous::default() );
		self
	}

	pub fn calls( &self ) -> Vec<Call> {
		self.inner.lock().unwrap().calls.clone()
	}

	/// The calls that would have changed data.
	pub fn writes_made( &self ) -> Vec<Call> {
		self.calls().into_iter().filter(|c| !matches!( c, Call::Select(_) )).collect()
	}
}

#[async_trait]
impl Gateway for Scripted {

	async fn select( &self, query: &Select ) -> Result<Vec<Record>> {
		let (rows, rendezvous) = {
			let mut script = self.inner.lock().unwrap();
			script.calls.push( Call::Select( query.clone() ) );

			let rows = match query.table {
				Table::Posts => script.posts.resolve(),
				Table::Profiles => script.profiles.resolve()
			};
			(rows, script.rendezvous.clone())
		};

		if let Some(rendezvous) = rendezvous {
			let (started, other) = match query.table {
				Table::Posts => (&rendezvous.posts, &rendezvous.profiles),
				Table::Profiles => (&rendezvous.profiles, &rendezvous.posts)
			};
			started.notify_one();
			other.notified().await;
		}

		Ok( rows?.into_iter().filter_map(|v| match v { Value::Object(m) => Some(m), _ => None }).collect() )
	}

	async fn insert( &self, table: Table, record: Record ) -> Result<()> {
		let mut script = self.inner.lock().unwrap();
		script.calls.push( Call::Insert( table, record ) );
		script.writes.resolve()
	}

	async fn update( &self, table: Table, filters: &[Filter], patch: Record ) -> Result<()> {
		let mut script = self.inner.lock().unwrap();
		script.calls.push( Call::Update( table, filters.to_vec(), patch ) );
		script.writes.resolve()
	}

	async fn sign_in( &self, _email: &str, _password: &str ) -> Result<Option<Session>> {
		Ok( None )
	}

	async fn current_session( &self, _access_token: &str ) -> Result<Option<Session>> {
		Ok( None )
	}

	async fn sign_out( &self, _access_token: &str ) -> Result<()> {
		Ok(())
	}

	fn with_session( &self, _session: Option<&Session> ) -> Arc<dyn Gateway> {
		Arc::new( self.clone() )
	}
}
