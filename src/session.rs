//! The signed-in identity of whoever is making a request.
//!
//! A session is resolved once per request from its cookie, and then handed explicitly to every
//! component that needs to know who the viewer is.

use tracing::warn;

use crate::gateway::Gateway;



/// The cookie that holds the gateway access token.
pub const SESSION_COOKIE: &str = "connecthub-token";



#[derive(Clone, Debug, PartialEq)]
pub struct Session {
	/// The authentication subject, which is also the id of the user's profile.
	pub user_id: String,
	pub email: String,
	pub access_token: String
}



impl Session {

	pub fn is( &self, user_id: &str ) -> bool {
		self.user_id == user_id
	}
}



/// Whether `viewer` is the owner of the profile with id `user_id`.
pub fn is_viewer( viewer: Option<&Session>, user_id: &str ) -> bool {
	viewer.map_or( false, |s| s.is( user_id ) )
}

/// Asks the gateway who `access_token` belongs to.
/// Any failure to do so is treated as not being signed in.
pub async fn resolve( gateway: &dyn Gateway, access_token: Option<&str> ) -> Option<Session> {
	let token = access_token.filter(|t| !t.is_empty())?;

	match gateway.current_session( token ).await {
		Ok(session) => session,
		Err(e) => {
			warn!("Unable to resolve session: {}", e);
			None
		}
	}
}
