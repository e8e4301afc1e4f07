//! The view state behind each page, and the fetch/submit lifecycle that fills it.
//!
//! A view starts out loading, runs its requests against the gateway, and ends up either holding the
//! results or a [`Failure`] to show in place. Mutations never patch view state themselves; they
//! report success and the caller re-fetches.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::gateway;

pub mod composer;
pub mod editor;
pub mod feed;
pub mod profile;



/// Something that went wrong, phrased for the person looking at the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
	LoadPosts,
	LoadProfile,
	ProfileNotFound,
	CreatePost,
	UpdateProfile,
	/// Caught before anything was sent.
	EmptyPost,
	PostTooLong,
	SignInToPost,
	NameRequired,
	Unexpected
}



impl Failure {

	/// Picks `refused` when the gateway reported the error itself, and `otherwise` when the call did
	/// not get that far.
	pub fn from_gateway( error: &gateway::Error, refused: Self, otherwise: Self ) -> Self {
		if error.is_response() { refused } else { otherwise }
	}

	pub fn message( self ) -> &'static str {
		match self {
			Self::LoadPosts => "Failed to load posts",
			Self::LoadProfile => "Failed to load profile",
			Self::ProfileNotFound => "Profile not found",
			Self::CreatePost => "Failed to create post",
			Self::UpdateProfile => "Failed to update profile",
			Self::EmptyPost => "Post cannot be empty",
			Self::PostTooLong => "Post is too long",
			Self::SignInToPost => "Sign in to post",
			Self::NameRequired => "Name is required",
			Self::Unexpected => "An unexpected error occurred"
		}
	}
}

impl fmt::Display for Failure {
	fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
		f.write_str( self.message() )
	}
}

impl Serialize for Failure {
	fn serialize<S: Serializer>( &self, serializer: S ) -> Result<S::Ok, S::Error> {
		serializer.serialize_str( self.message() )
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn gateway_answers_and_broken_calls_read_differently() {
		let refused = gateway::Error::Api { status: 500, message: "boom".into() };
		let broken = gateway::Error::Unavailable( "reset".into() );

		assert_eq!( Failure::from_gateway( &refused, Failure::CreatePost, Failure::Unexpected ), Failure::CreatePost );
		assert_eq!( Failure::from_gateway( &broken, Failure::CreatePost, Failure::Unexpected ), Failure::Unexpected );
		assert_eq!( Failure::Unexpected.to_string(), "An unexpected error occurred" );
	}
}
