//! Turns fetched records into the cards that the templates lay out.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
	post::Post,
	profile::Profile,
	session::{self, Session},
	view::{composer::Composer, editor::ProfileEditor, Failure}
};



/// Shown when a post's author could not be joined.
pub const UNKNOWN_AUTHOR: &str = "Unknown User";



#[derive(Debug, Serialize)]
pub struct PostCard {
	pub id: String,
	pub author_id: String,
	pub author_name: String,
	pub time_ago: String,
	pub content: String
}

#[derive(Debug, Serialize)]
pub struct ProfileCard {
	pub id: String,
	pub full_name: String,
	pub email: String,
	pub bio: Option<String>,
	pub member_since: String,
	/// Whether the viewer owns this profile and may edit it.
	pub is_own: bool,
	/// Invite the owner to write a bio when there isn't one.
	pub prompt_bio: bool
}


/// The state of the post form, as the template needs it.
#[derive(Debug, Serialize)]
pub struct ComposerForm {
	pub content: String,
	pub remaining: isize,
	pub can_submit: bool,
	pub failure: Option<Failure>
}

#[derive(Debug, Serialize)]
pub struct EditorForm {
	pub full_name: String,
	pub bio: String,
	pub failure: Option<Failure>
}



impl PostCard {

	pub fn new( post: &Post, now: DateTime<Utc> ) -> Self {
		Self {
			id: post.id.clone(),
			author_id: post.author_id.clone(),
			author_name: author_name( post ).to_owned(),
			time_ago: time_ago( post.created_at, now ),
			content: post.content.clone()
		}
	}
}

impl ProfileCard {

	pub fn new( profile: &Profile, viewer: Option<&Session>, now: DateTime<Utc> ) -> Self {
		let is_own = session::is_viewer( viewer, &profile.id );
		let bio = profile.bio.clone().filter(|b| !b.trim().is_empty());

		Self {
			id: profile.id.clone(),
			full_name: profile.full_name.clone(),
			email: profile.email.clone(),
			prompt_bio: is_own && bio.is_none(),
			bio,
			member_since: time_ago( profile.created_at, now ),
			is_own
		}
	}
}


impl From<&Composer> for ComposerForm {
	fn from( composer: &Composer ) -> Self {
		Self {
			content: composer.content.clone(),
			remaining: composer.remaining(),
			can_submit: composer.can_submit(),
			failure: composer.failure
		}
	}
}

impl From<&ProfileEditor> for EditorForm {
	fn from( editor: &ProfileEditor ) -> Self {
		Self {
			full_name: editor.full_name.clone(),
			bio: editor.bio.clone(),
			failure: editor.failure
		}
	}
}



pub fn post_cards( posts: &[Post], now: DateTime<Utc> ) -> Vec<PostCard> {
	posts.iter().map(|p| PostCard::new( p, now )).collect()
}

pub fn author_name( post: &Post ) -> &str {
	post.author.as_ref()
		.and_then(|a| a.full_name.as_deref())
		.filter(|name| !name.trim().is_empty())
		.unwrap_or( UNKNOWN_AUTHOR )
}

/// Describes how long ago `then` was, in words, e.g. "about 2 hours ago" or "3 days ago".
pub fn time_ago( then: DateTime<Utc>, now: DateTime<Utc> ) -> String {
	let seconds = (now - then).num_seconds();
	if seconds < 0 {
		return "just now".to_owned()
	}

	format!("{} ago", distance( seconds ))
}

fn distance( seconds: i64 ) -> String {
	const MINUTES_IN_DAY: i64 = 1440;
	const MINUTES_IN_MONTH: i64 = 43200;
	const MINUTES_IN_YEAR: i64 = 525600;

	let minutes = (seconds as f64 / 60.0).round() as i64;

	if seconds < 30 {
		"less than a minute".to_owned()
	}
	else if minutes < 2 {
		"1 minute".to_owned()
	}
	else if minutes < 45 {
		format!("{} minutes", minutes)
	}
	else if minutes < 90 {
		"about 1 hour".to_owned()
	}
	else if minutes < MINUTES_IN_DAY {
		format!("about {} hours", (minutes as f64 / 60.0).round() as i64)
	}
	else if minutes < 2520 {
		"1 day".to_owned()
	}
	else if minutes < MINUTES_IN_MONTH {
		format!("{} days", (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64)
	}
	else if minutes < 2 * MINUTES_IN_MONTH {
		"about 1 month".to_owned()
	}
	else if minutes < MINUTES_IN_YEAR {
		format!("{} months", (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64)
	}
	else {
		let months = minutes / MINUTES_IN_MONTH;
		let years = months / 12;
		let rest = months % 12;
		let plural = |n: i64| if n == 1 { format!("{} year", n) } else { format!("{} years", n) };

		if rest < 3 {
			format!("about {}", plural( years ))
		}
		else if rest < 9 {
			format!("over {}", plural( years ))
		}
		else {
			format!("almost {}", plural( years + 1 ))
		}
	}
}
