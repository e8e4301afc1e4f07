use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};



#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Profile {
	/// Equal to the id of the account that owns this profile.
	pub id: String,
	pub full_name: String,
	pub email: String,
	pub bio: Option<String>,
	pub created_at: DateTime<Utc>
}

/// The fields of a profile that its owner may change.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfilePatch {
	pub full_name: String,
	pub bio: Option<String>
}
