use actix_web::{
	cookie::{Cookie, SameSite},
	error, get,
	http::{header, StatusCode},
	post, web, HttpRequest, HttpResponse
};
use chrono::Utc;
use serde::*;
use tera;
use tracing::{debug, error, info, warn};

use std::sync::Arc;

use crate::{
	render::{self, ComposerForm, EditorForm, PostCard, ProfileCard},
	session::{self, Session, SESSION_COOKIE},
	view::{
		composer::{Composer, Submission},
		editor::{EditOutcome, ProfileEditor},
		feed::FeedView,
		profile::ProfileView,
		Failure
	},
	Globals
};



#[derive(Serialize)]
pub struct Viewer {
	user_id: String,
	email: String
}

#[derive(Deserialize)]
pub struct PostForm {
	content: String
}

#[derive(Deserialize)]
pub struct ProfileParams {
	#[serde(default)]
	edit: bool
}

#[derive(Deserialize)]
pub struct ProfileForm {
	full_name: String,
	#[serde(default)]
	bio: String
}

#[derive(Deserialize)]
pub struct LoginForm {
	email: String,
	password: String
}



pub fn routes( cfg: &mut web::ServiceConfig ) {
	cfg.service( homepage )
		.service( create_post )
		.service( profile_page )
		.service( update_profile )
		.service( login_page )
		.service( login )
		.service( logout );
}

#[get("/")]
pub async fn homepage( g: web::Data<Arc<Globals>>, req: HttpRequest ) -> error::Result<HttpResponse> {
	let viewer = current_viewer( &g, &req ).await;
	let gateway = g.gateway.with_session( viewer.as_ref() );

	let mut feed = FeedView::new();
	feed.fetch( &*gateway ).await;

	render_home( &g, viewer.as_ref(), &feed, &Composer::default() )
}

#[post("/posts")]
pub async fn create_post( g: web::Data<Arc<Globals>>, req: HttpRequest, form: web::Form<PostForm> ) -> error::Result<HttpResponse> {
	let viewer = current_viewer( &g, &req ).await;
	let gateway = g.gateway.with_session( viewer.as_ref() );

	let mut feed = FeedView::new();
	let mut composer = Composer::with_content( form.into_inner().content );

	let outcome = composer.submit( &*gateway, viewer.as_ref(), || feed.fetch( &*gateway ) ).await;
	if outcome != Submission::Created {
		feed.fetch( &*gateway ).await;
	}

	render_home( &g, viewer.as_ref(), &feed, &composer )
}

#[get("/profile/{user_id}")]
pub async fn profile_page( g: web::Data<Arc<Globals>>, req: HttpRequest, user_id: web::Path<String>, params: web::Query<ProfileParams> ) -> error::Result<HttpResponse> {
	let viewer = current_viewer( &g, &req ).await;
	let gateway = g.gateway.with_session( viewer.as_ref() );

	let mut view = ProfileView::new( &user_id );
	view.load( &*gateway ).await;

	let editor = if params.edit {
		view.profile.as_ref().and_then(|p| ProfileEditor::open( p, viewer.as_ref() ))
	}
	else {
		None
	};

	render_profile( &g, viewer.as_ref(), &view, editor.as_ref() )
}

#[post("/profile/{user_id}")]
pub async fn update_profile( g: web::Data<Arc<Globals>>, req: HttpRequest, user_id: web::Path<String>, form: web::Form<ProfileForm> ) -> error::Result<HttpResponse> {
	let viewer = current_viewer( &g, &req ).await;
	let gateway = g.gateway.with_session( viewer.as_ref() );

	let mut view = ProfileView::new( &user_id );
	view.load( &*gateway ).await;

	let profile = match &view.profile {
		None => return render_profile( &g, viewer.as_ref(), &view, None ),
		Some(profile) => profile
	};
	let mut editor = match ProfileEditor::open( profile, viewer.as_ref() ) {
		None => return Err( error::ErrorForbidden( "Only the owner can edit this profile." ) ),
		Some(editor) => editor
	};

	editor.fill( &form.full_name, &form.bio );
	let outcome = editor.submit( &*gateway, || view.refresh_profile( &*gateway ) ).await;
	if outcome != EditOutcome::Saved {
		debug!("Profile {} not saved: {:?}", user_id, outcome);
	}

	let editor = if editor.open { Some(&editor) } else { None };
	render_profile( &g, viewer.as_ref(), &view, editor )
}

#[get("/login")]
pub async fn login_page( g: web::Data<Arc<Globals>>, req: HttpRequest ) -> error::Result<HttpResponse> {
	if current_viewer( &g, &req ).await.is_some() {
		return Ok( redirect("/") )
	}

	render_login( &g, None, "" )
}

#[post("/login")]
pub async fn login( g: web::Data<Arc<Globals>>, form: web::Form<LoginForm> ) -> error::Result<HttpResponse> {

	match g.gateway.sign_in( form.email.trim(), &form.password ).await {
		Ok(Some(session)) => {
			info!("{} signed in", session.user_id);
			let cookie = Cookie::build( SESSION_COOKIE, session.access_token )
				.path("/")
				.http_only( true )
				.same_site( SameSite::Lax )
				.finish();

			Ok( HttpResponse::SeeOther().append_header((header::LOCATION, "/")).cookie( cookie ).finish() )
		},
		Ok(None) => render_login( &g, Some("Invalid email or password"), &form.email ),
		Err(e) => {
			warn!("Unable to sign in: {}", e);
			render_login( &g, Some( Failure::Unexpected.message() ), &form.email )
		}
	}
}

#[post("/logout")]
pub async fn logout( g: web::Data<Arc<Globals>>, req: HttpRequest ) -> HttpResponse {

	if let Some(token) = access_token( &req ) {
		if let Err(e) = g.gateway.sign_out( &token ).await {
			warn!("Unable to sign out: {}", e);
		}
	}

	let mut removal = Cookie::build( SESSION_COOKIE, "" ).path("/").finish();
	removal.make_removal();

	HttpResponse::SeeOther().append_header((header::LOCATION, "/login")).cookie( removal ).finish()
}



fn access_token( req: &HttpRequest ) -> Option<String> {
	req.cookie( SESSION_COOKIE ).map(|c| c.value().to_owned())
}

async fn current_viewer( g: &Globals, req: &HttpRequest ) -> Option<Session> {
	session::resolve( &*g.gateway, access_token( req ).as_deref() ).await
}

fn redirect( location: &str ) -> HttpResponse {
	HttpResponse::SeeOther().append_header((header::LOCATION, location)).finish()
}

fn base_context( viewer: Option<&Session> ) -> tera::Context {
	let mut context = tera::Context::new();
	context.insert("viewer", &viewer.map(|s| Viewer {
		user_id: s.user_id.clone(),
		email: s.email.clone()
	}));
	context
}

fn render_home( g: &Globals, viewer: Option<&Session>, feed: &FeedView, composer: &Composer ) -> error::Result<HttpResponse> {
	let mut context = base_context( viewer );
	context.insert("posts", &render::post_cards( &feed.posts, Utc::now() ));
	context.insert("failure", &feed.failure);
	context.insert("composer", &ComposerForm::from( composer ));

	render( g, "home.html", &context, StatusCode::OK )
}

fn render_profile( g: &Globals, viewer: Option<&Session>, view: &ProfileView, editor: Option<&ProfileEditor> ) -> error::Result<HttpResponse> {
	let now = Utc::now();
	let posts: Vec<PostCard> = render::post_cards( &view.posts, now );

	let mut context = base_context( viewer );
	context.insert("profile", &view.profile.as_ref().map(|p| ProfileCard::new( p, viewer, now )));
	context.insert("is_own", &view.is_own_profile( viewer ));
	context.insert("post_count", &posts.len());
	context.insert("posts", &posts);
	context.insert("failure", &view.failure);
	context.insert("editor", &editor.map( EditorForm::from ));

	let status = match (&view.profile, view.failure) {
		(None, Some(Failure::ProfileNotFound)) => StatusCode::NOT_FOUND,
		_ => StatusCode::OK
	};
	render( g, "profile.html", &context, status )
}

fn render_login( g: &Globals, failure: Option<&str>, email: &str ) -> error::Result<HttpResponse> {
	let mut context = base_context( None );
	context.insert("failure", &failure);
	context.insert("email", email);

	render( g, "login.html", &context, StatusCode::OK )
}

fn render( g: &Globals, template: &str, context: &tera::Context, status: StatusCode ) -> error::Result<HttpResponse> {
	let html = g.tera.render( template, context )
		.map_err(|e| { error!("Template error: {}", e); error::ErrorInternalServerError("Template error") } )?;

	Ok( HttpResponse::build( status ).content_type("text/html; charset=utf-8").body( html ) )
}
