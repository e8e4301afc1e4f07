//! Writing a new post.

use std::future::Future;

use tracing::{info, warn};

use crate::{
	gateway::{self, Gateway, Table},
	post::{NewPost, POST_MAX_LEN},
	session::Session,
	view::Failure
};



#[derive(Debug, Default)]
pub struct Composer {
	/// What has been typed so far.
	pub content: String,
	/// Set while a submission is underway. The submit control is disabled meanwhile.
	pub in_flight: bool,
	pub failure: Option<Failure>
}

/// Why a submission was not sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
	Blank,
	TooLong,
	SignedOut
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
	Created,
	Rejected( Rejection ),
	Failed( Failure )
}



impl From<Rejection> for Failure {
	fn from( rejection: Rejection ) -> Self {
		match rejection {
			Rejection::Blank => Self::EmptyPost,
			Rejection::TooLong => Self::PostTooLong,
			Rejection::SignedOut => Self::SignInToPost
		}
	}
}

impl Composer {

	pub fn with_content( content: impl Into<String> ) -> Self {
		Self {
			content: content.into(),
			..Default::default()
		}
	}

	/// The characters left before the limit.
	pub fn remaining( &self ) -> isize {
		POST_MAX_LEN as isize - self.content.chars().count() as isize
	}

	/// Whether the submit control should be enabled.
	pub fn can_submit( &self ) -> bool {
		!self.in_flight && !self.content.trim().is_empty()
	}

	/// Checks locally whether the content may be sent, and returns the trimmed content if so.
	pub fn validate<'a>( &'a self, session: Option<&'a Session> ) -> Result<(&'a str, &'a Session), Rejection> {
		let content = self.content.trim();
		if content.is_empty() {
			return Err( Rejection::Blank )
		}
		if content.chars().count() > POST_MAX_LEN {
			return Err( Rejection::TooLong )
		}
		let session = session.ok_or( Rejection::SignedOut )?;

		Ok( (content, session) )
	}

	/// Sends the post as the signed-in user.
	/// On success the input is cleared and `on_created` is awaited, so the caller can refresh.
	/// On failure, or when the content is rejected before sending, the input is left as it was and
	/// `failure` says why.
	pub async fn submit<F, Fut>( &mut self, gateway: &dyn Gateway, session: Option<&Session>, on_created: F ) -> Submission where
		F: FnOnce() -> Fut,
		Fut: Future<Output=()>
	{
		let (content, author_id) = match self.validate( session ) {
			Err(rejection) => {
				self.failure = Some( rejection.into() );
				return Submission::Rejected( rejection )
			},
			Ok((content, session)) => (content.to_owned(), session.user_id.clone())
		};

		self.in_flight = true;
		self.failure = None;
		let result = create_post( gateway, &author_id, &content ).await;
		self.in_flight = false;

		match result {
			Ok(()) => {
				self.content.clear();
				on_created().await;
				Submission::Created
			},
			Err(e) => {
				warn!("Unable to create post: {}", e);
				let failure = Failure::from_gateway( &e, Failure::CreatePost, Failure::Unexpected );
				self.failure = Some( failure );
				Submission::Failed( failure )
			}
		}
	}
}



pub async fn create_post( gateway: &dyn Gateway, author_id: &str, content: &str ) -> gateway::Result<()> {
	let record = gateway::to_record( &NewPost { author_id, content } )?;
	gateway.insert( Table::Posts, record ).await?;

	info!("Post created by {}", author_id);
	Ok(())
}
