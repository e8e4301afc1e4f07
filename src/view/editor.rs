//! Editing one's own profile.

use std::future::Future;

use tracing::{info, warn};

use crate::{
	gateway::{self, Filter, Gateway, Table},
	profile::{Profile, ProfilePatch},
	session::Session,
	view::Failure
};



#[derive(Debug, PartialEq)]
pub struct ProfileEditor {
	profile_id: String,
	pub full_name: String,
	pub bio: String,
	pub open: bool,
	pub failure: Option<Failure>
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
	Saved,
	/// The display name was left blank. Nothing was sent.
	BlankName,
	Failed( Failure )
}



impl ProfileEditor {

	/// Opens the editor for `profile`, but only for its owner.
	pub fn open( profile: &Profile, viewer: Option<&Session> ) -> Option<Self> {
		if !viewer?.is( &profile.id ) {
			return None
		}

		Some( Self {
			profile_id: profile.id.clone(),
			full_name: profile.full_name.clone(),
			bio: profile.bio.clone().unwrap_or_default(),
			open: true,
			failure: None
		})
	}

	/// Takes over the values that were entered in the form.
	pub fn fill( &mut self, full_name: &str, bio: &str ) {
		self.full_name = full_name.to_owned();
		self.bio = bio.to_owned();
	}

	pub fn patch( &self ) -> ProfilePatch {
		let bio = self.bio.trim();
		ProfilePatch {
			full_name: self.full_name.trim().to_owned(),
			bio: if bio.is_empty() { None } else { Some( bio.to_owned() ) }
		}
	}

	/// Saves the entered values.
	/// On success the editor closes and `on_updated` is awaited so the caller can refresh.
	/// On failure, or if the name was left blank, it stays open with everything that was entered.
	pub async fn submit<F, Fut>( &mut self, gateway: &dyn Gateway, on_updated: F ) -> EditOutcome where
		F: FnOnce() -> Fut,
		Fut: Future<Output=()>
	{
		let patch = self.patch();
		if patch.full_name.is_empty() {
			self.failure = Some( Failure::NameRequired );
			return EditOutcome::BlankName
		}

		self.failure = None;
		match update_profile( gateway, &self.profile_id, &patch ).await {
			Ok(()) => {
				self.open = false;
				on_updated().await;
				EditOutcome::Saved
			},
			Err(e) => {
				warn!("Unable to update profile {}: {}", self.profile_id, e);
				self.failure = Some( Failure::UpdateProfile );
				EditOutcome::Failed( Failure::UpdateProfile )
			}
		}
	}
}



pub async fn update_profile( gateway: &dyn Gateway, profile_id: &str, patch: &ProfilePatch ) -> gateway::Result<()> {
	let filter = Filter {
		column: "id",
		value: profile_id.to_owned()
	};
	gateway.update( Table::Profiles, &[filter], gateway::to_record( patch )? ).await?;

	info!("Profile {} updated", profile_id);
	Ok(())
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::gateway::scripted::{Answer, Call, Scripted};
	use std::cell::Cell;

	fn profile() -> Profile {
		Profile {
			id: "ada".into(),
			full_name: "Ada".into(),
			email: "ada@example.com".into(),
			bio: None,
			created_at: "2023-06-01T00:00:00Z".parse().unwrap()
		}
	}

	fn session( user_id: &str ) -> Session {
		Session {
			user_id: user_id.into(),
			email: String::new(),
			access_token: "t".into()
		}
	}

	#[test]
	fn only_the_owner_can_open_the_editor() {
		assert!( ProfileEditor::open( &profile(), Some(&session("ada")) ).is_some() );
		assert!( ProfileEditor::open( &profile(), Some(&session("bob")) ).is_none() );
		assert!( ProfileEditor::open( &profile(), None ).is_none() );
	}

	#[actix_rt::test]
	async fn saving_updates_the_row_and_closes() {
		let gateway = Scripted::new();
		let refreshed = Cell::new( false );
		let mut editor = ProfileEditor::open( &profile(), Some(&session("ada")) ).unwrap();
		editor.fill( " Ada Lovelace ", "  " );

		let outcome = editor.submit( &gateway, || async { refreshed.set(true) } ).await;

		assert_eq!( outcome, EditOutcome::Saved );
		assert!( !editor.open );
		assert!( refreshed.get() );

		let filter = Filter { column: "id", value: "ada".into() };
		let patch = gateway::to_record( &serde_json::json!({ "full_name": "Ada Lovelace", "bio": null }) ).unwrap();
		assert_eq!( gateway.writes_made(), vec![Call::Update( Table::Profiles, vec![filter], patch )] );
	}

	#[actix_rt::test]
	async fn failure_keeps_the_editor_open_with_its_values() {
		let gateway = Scripted::new().writes( Answer::Fail );
		let mut editor = ProfileEditor::open( &profile(), Some(&session("ada")) ).unwrap();
		editor.fill( "Countess", "Poet of science" );

		let outcome = editor.submit( &gateway, || async { panic!("must not refresh") } ).await;

		assert_eq!( outcome, EditOutcome::Failed( Failure::UpdateProfile ) );
		assert!( editor.open );
		assert_eq!( editor.full_name, "Countess" );
		assert_eq!( editor.bio, "Poet of science" );
		assert_eq!( editor.failure, Some( Failure::UpdateProfile ) );
	}

	#[actix_rt::test]
	async fn blank_name_is_not_sent() {
		let gateway = Scripted::new();
		let mut editor = ProfileEditor::open( &profile(), Some(&session("ada")) ).unwrap();
		editor.fill( "   ", "bio" );

		assert_eq!( editor.submit( &gateway, || async {} ).await, EditOutcome::BlankName );
		assert!( gateway.calls().is_empty() );
		assert!( editor.open );
		assert_eq!( editor.failure, Some( Failure::NameRequired ) );
		assert_eq!( editor.bio, "bio" );
	}
}
