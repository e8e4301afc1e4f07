//! The profile page: one profile, and that user's posts.

use futures::join;
use tracing::warn;

use crate::{
	gateway::{self, Gateway, Select, Table},
	post::Post,
	profile::Profile,
	session::{self, Session},
	view::{feed, Failure}
};



#[derive(Debug)]
pub struct ProfileView {
	pub user_id: String,
	pub loading: bool,
	pub profile: Option<Profile>,
	pub posts: Vec<Post>,
	pub failure: Option<Failure>
}



impl ProfileView {

	pub fn new( user_id: &str ) -> Self {
		Self {
			user_id: user_id.to_owned(),
			loading: true,
			profile: None,
			posts: Vec::new(),
			failure: None
		}
	}

	/// Requests the profile and its posts at the same time, and waits for both to settle.
	/// Either one failing leaves the result of the other in place.
	pub async fn load( &mut self, gateway: &dyn Gateway ) {
		self.loading = true;

		let (profile, posts) = join!(
			fetch_profile( gateway, &self.user_id ),
			feed::fetch_posts( gateway, Some( self.user_id.as_str() ) )
		);

		let posts_failure = match posts {
			Ok(posts) => {
				self.posts = posts;
				None
			},
			Err(e) => {
				warn!("Unable to load posts of {}: {}", self.user_id, e);
				Some( Failure::LoadPosts )
			}
		};
		let profile_failure = self.apply_profile( profile ).err();

		self.failure = profile_failure.or( posts_failure );
		self.loading = false;
	}

	/// Fetches only the profile row again, e.g. after it was edited.
	/// A failure to load the posts stays on show, since they were not fetched again.
	pub async fn refresh_profile( &mut self, gateway: &dyn Gateway ) {
		let profile = fetch_profile( gateway, &self.user_id ).await;
		self.failure = match self.apply_profile( profile ) {
			Ok(()) => self.failure.filter(|f| *f == Failure::LoadPosts),
			Err(failure) => Some( failure )
		};
	}

	pub fn is_own_profile( &self, viewer: Option<&Session> ) -> bool {
		session::is_viewer( viewer, &self.user_id )
	}

	fn apply_profile( &mut self, result: gateway::Result<Option<Profile>> ) -> Result<(), Failure> {
		match result {
			Ok(Some(profile)) => {
				self.profile = Some( profile );
				Ok(())
			},
			Ok(None) => Err( Failure::ProfileNotFound ),
			Err(e) => {
				warn!("Unable to load profile {}: {}", self.user_id, e);
				Err( Failure::from_gateway( &e, Failure::ProfileNotFound, Failure::LoadProfile ) )
			}
		}
	}
}



pub fn profile_query( user_id: &str ) -> Select {
	Select::from( Table::Profiles ).eq( "id", user_id )
}

/// Fetches a single profile. Returns `None` if there is no profile with that id.
pub async fn fetch_profile( gateway: &dyn Gateway, user_id: &str ) -> gateway::Result<Option<Profile>> {
	let rows = gateway.select( &profile_query( user_id ) ).await?;
	Ok( gateway::from_records( rows )?.into_iter().next() )
}
