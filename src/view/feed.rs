//! The post list: every post, or every post of one author, newest first.

use tracing::warn;

use crate::{
	gateway::{self, Direction, Gateway, Select, Table, POSTS_AUTHOR},
	post::Post,
	view::Failure
};



#[derive(Debug, Default)]
pub struct FeedView {
	pub loading: bool,
	pub posts: Vec<Post>,
	pub failure: Option<Failure>
}



impl FeedView {

	pub fn new() -> Self {
		Self {
			loading: true,
			..Default::default()
		}
	}

	/// Loads all posts.
	/// On failure the posts that were already there stay, and a failure is shown instead.
	pub async fn fetch( &mut self, gateway: &dyn Gateway ) {
		self.loading = true;

		match fetch_posts( gateway, None ).await {
			Ok(posts) => {
				self.posts = posts;
				self.failure = None;
			},
			Err(e) => {
				warn!("Unable to load feed: {}", e);
				self.failure = Some( Failure::from_gateway( &e, Failure::LoadPosts, Failure::Unexpected ) );
			}
		}

		self.loading = false;
	}
}



/// The query for the post list, joined with each post's author.
pub fn post_list_query( author_id: Option<&str> ) -> Select {
	let query = Select::from( Table::Posts )
		.columns( &["id", "content", "created_at", "author_id"] )
		.embed( POSTS_AUTHOR, &["full_name", "email"] )
		.order_by( "created_at", Direction::Descending );

	match author_id {
		None => query,
		Some(id) => query.eq( "author_id", id )
	}
}

/// Fetches the post list in the order the gateway returns it.
pub async fn fetch_posts( gateway: &dyn Gateway, author_id: Option<&str> ) -> gateway::Result<Vec<Post>> {
	let rows = gateway.select( &post_list_query( author_id ) ).await?;
	gateway::from_records( rows )
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::gateway::scripted::{Answer, Call, Scripted};
	use serde_json::json;

	fn post( id: &str, at: &str ) -> serde_json::Value {
		json!({
			"id": id,
			"content": format!("post {}", id),
			"created_at": at,
			"author_id": "u1",
			"profiles": { "full_name": "Ada", "email": "ada@example.com" }
		})
	}

	#[actix_rt::test]
	async fn posts_keep_the_order_they_arrive_in() {
		let gateway = Scripted::new().posts( Answer::Ok(vec![
			post( "c", "2024-01-03T00:00:00Z" ),
			post( "b", "2024-01-02T00:00:00Z" ),
			post( "b", "2024-01-02T00:00:00Z" ),
			post( "a", "2024-01-01T00:00:00Z" )
		]));

		let mut view = FeedView::new();
		view.fetch( &gateway ).await;

		let ids: Vec<&str> = view.posts.iter().map(|p| p.id.as_str()).collect();
		assert_eq!( ids, ["c", "b", "b", "a"] );
		assert!( !view.loading );
		assert_eq!( view.failure, None );
	}

	#[actix_rt::test]
	async fn feed_asks_for_joined_authors_newest_first() {
		let gateway = Scripted::new();
		FeedView::new().fetch( &gateway ).await;

		assert_eq!( gateway.calls(), vec![Call::Select( post_list_query( None ) )] );
		let query = post_list_query( None );
		assert_eq!( query.order.unwrap().direction, Direction::Descending );
		assert!( query.filters.is_empty() );
	}

	#[actix_rt::test]
	async fn refused_fetch_shows_load_failure_and_ends_loading() {
		let gateway = Scripted::new().posts( Answer::Refuse );
		let mut view = FeedView::new();
		view.fetch( &gateway ).await;

		assert!( !view.loading );
		assert!( view.posts.is_empty() );
		assert_eq!( view.failure, Some( Failure::LoadPosts ) );
	}

	#[actix_rt::test]
	async fn broken_fetch_is_unexpected() {
		let gateway = Scripted::new().posts( Answer::Fail );
		let mut view = FeedView::new();
		view.fetch( &gateway ).await;

		assert!( !view.loading );
		assert_eq!( view.failure, Some( Failure::Unexpected ) );
	}

	#[actix_rt::test]
	async fn failed_refetch_keeps_what_was_shown() {
		let mut view = FeedView::new();
		view.fetch( &Scripted::new().posts( Answer::Ok(vec![ post( "a", "2024-01-01T00:00:00Z" ) ]) ) ).await;
		view.fetch( &Scripted::new().posts( Answer::Refuse ) ).await;

		assert_eq!( view.posts.len(), 1 );
		assert_eq!( view.failure, Some( Failure::LoadPosts ) );
	}

	#[actix_rt::test]
	async fn null_author_name_does_not_spoil_the_list() {
		let mut nameless = post( "b", "2024-01-01T00:00:00Z" );
		nameless["profiles"] = json!({ "full_name": null, "email": null });
		let gateway = Scripted::new().posts( Answer::Ok(vec![ post( "a", "2024-01-02T00:00:00Z" ), nameless ]) );

		let mut view = FeedView::new();
		view.fetch( &gateway ).await;

		assert_eq!( view.failure, None );
		assert_eq!( view.posts.len(), 2 );
		assert_eq!( crate::render::author_name( &view.posts[0] ), "Ada" );
		assert_eq!( crate::render::author_name( &view.posts[1] ), crate::render::UNKNOWN_AUTHOR );
	}

	#[test]
	fn author_filter_is_an_equality_on_author_id() {
		let query = post_list_query( Some("u9") );
		assert_eq!( query.filters.len(), 1 );
		assert_eq!( query.filters[0].column, "author_id" );
		assert_eq!( query.filters[0].value, "u9" );
	}
}
