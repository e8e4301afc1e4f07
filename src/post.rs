use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};



/// The longest post content accepted, in characters.
pub const POST_MAX_LEN: usize = 500;

/// The author fields that are joined onto every post that is listed.
/// The hosted service may hand back nulls here, which must not spoil the rest of the list.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AuthorSummary {
	#[serde(default)]
	pub full_name: Option<String>,
	#[serde(default)]
	pub email: Option<String>
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Post {
	pub id: String,
	pub content: String,
	pub created_at: DateTime<Utc>,
	pub author_id: String,
	/// The joined author row.
	/// This is `None` when the author's profile could not be found.
	#[serde(rename = "profiles", default)]
	pub author: Option<AuthorSummary>
}

/// The record that is inserted into the posts table.
/// The gateway fills in `id` and `created_at`.
#[derive(Clone, Debug, Serialize)]
pub struct NewPost<'a> {
	pub author_id: &'a str,
	pub content: &'a str
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_join_deserializes_as_none() {
		let post: Post = serde_json::from_value( serde_json::json!({
			"id": "p1",
			"content": "hello",
			"created_at": "2024-03-01T10:00:00.000000Z",
			"author_id": "u1",
			"profiles": null
		}) ).unwrap();

		assert_eq!( post.author, None );
		assert_eq!( post.author_id, "u1" );
	}

	#[test]
	fn joined_author_is_read_from_profiles_key() {
		let post: Post = serde_json::from_value( serde_json::json!({
			"id": "p1",
			"content": "hello",
			"created_at": "2024-03-01T10:00:00+00:00",
			"author_id": "u1",
			"profiles": { "full_name": "Ada", "email": "ada@example.com" }
		}) ).unwrap();

		assert_eq!( post.author.unwrap().full_name.as_deref(), Some("Ada") );
	}

	#[test]
	fn null_author_fields_still_deserialize() {
		let post: Post = serde_json::from_value( serde_json::json!({
			"id": "p1",
			"content": "hello",
			"created_at": "2024-03-01T10:00:00+00:00",
			"author_id": "u1",
			"profiles": { "full_name": null }
		}) ).unwrap();

		assert_eq!( post.author, Some( AuthorSummary::default() ) );
	}
}
