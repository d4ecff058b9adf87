use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::models::{PersonRecord, ValidationError};
use crate::store::PersonStore;

// Characters that cannot appear raw inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub fn router(store: PersonStore) -> Router {
    Router::new()
        .route("/add_person", get(add_person_usage).post(add_person))
        .route("/createdb", get(create_db).post(create_db))
        .route("/createdb/", get(create_db).post(create_db))
        .route("/show", get(show_all).post(show_all))
        .route("/show/", get(show_all).post(show_all))
        .route("/show/{*rest}", get(show_person).post(show_person))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// The path `/show/<id>/<first name>` a single person is served from.
pub fn canonical_path(id: i64, first_name: &str) -> String {
    // A raw "." or ".." segment would be collapsed by clients resolving the redirect
    if first_name.chars().all(|c| c == '.') {
        return format!("/show/{}/{}", id, "%2E".repeat(first_name.len()));
    }
    format!("/show/{}/{}", id, utf8_percent_encode(first_name, PATH_SEGMENT))
}

fn error_line(message: impl std::fmt::Display) -> String {
    format!("Error: {}", message)
}

#[derive(Debug, Deserialize)]
pub struct AddPersonForm {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

impl AddPersonForm {
    fn into_person(self) -> Result<PersonRecord, ValidationError> {
        let first_name = self.first_name.ok_or(ValidationError::Missing("first_name"))?;
        let last_name = self.last_name.ok_or(ValidationError::Missing("last_name"))?;
        let email = self.email.ok_or(ValidationError::Missing("email"))?;
        PersonRecord::new(&first_name, &last_name, &email)
    }
}

async fn add_person_usage() -> &'static str {
    "Please use the POST method!"
}

async fn add_person(
    State(store): State<PersonStore>,
    form: Result<Form<AddPersonForm>, FormRejection>,
) -> String {
    let person = match form {
        Ok(Form(form)) => form.into_person(),
        Err(rejection) => {
            tracing::info!("Rejected form: {}", rejection.body_text());
            return error_line(rejection.body_text());
        }
    };

    let person = match person {
        Ok(person) => person,
        Err(e) => {
            tracing::info!("Rejected person: {}", e);
            return error_line(e);
        }
    };

    match store.insert(&person).await {
        Ok(id) => format!("Person {} created!", person.with_identity(id, None)),
        Err(e) => {
            tracing::error!("Failed to store person: {:?}", e);
            error_line(e)
        }
    }
}

async fn create_db(State(store): State<PersonStore>) -> String {
    match store.initialize_schema().await {
        Ok(()) => "Database set up!".to_string(),
        Err(e) => {
            tracing::error!("Failed to set up database: {:?}", e);
            error_line(e)
        }
    }
}

async fn show_all(State(store): State<PersonStore>) -> Response {
    match store.get_all().await {
        Ok(people) => Json(people).into_response(),
        Err(e) => {
            tracing::error!("Failed to list persons: {:?}", e);
            error_line(e).into_response()
        }
    }
}

async fn show_person(State(store): State<PersonStore>, uri: Uri) -> Response {
    // Work on the raw path so an encoded '/' inside a name stays one segment
    let rest = uri.path().strip_prefix("/show/").unwrap_or_default();
    let tokens: Vec<&str> = rest.split('/').collect();

    let id_token = tokens[0];
    let id: i64 = match id_token.parse() {
        Ok(id) => id,
        Err(_) => {
            let shown = percent_decode_str(id_token).decode_utf8_lossy();
            return error_line(format!("{} is not an integer.", shown)).into_response();
        }
    };

    let person = match store.get_by_id(id).await {
        Ok(Some(person)) => person,
        Ok(None) => return error_line(format!("no person with ID = {}.", id)).into_response(),
        Err(e) => {
            tracing::error!("Failed to look up person {}: {:?}", id, e);
            return error_line(e).into_response();
        }
    };

    let name_matches = match tokens.as_slice() {
        [_, name] => percent_decode_str(name)
            .decode_utf8()
            .is_ok_and(|name| name == person.first_name()),
        _ => false,
    };

    if !name_matches {
        let location = canonical_path(id, person.first_name());
        tracing::debug!("Redirecting to {}", location);
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }

    Json(person).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_path_keeps_plain_names_readable() {
        assert_eq!(canonical_path(3, "Jo"), "/show/3/Jo");
        assert_eq!(canonical_path(12, "O'Neil"), "/show/12/O'Neil");
    }

    #[test]
    fn canonical_path_encodes_unsafe_characters() {
        assert_eq!(canonical_path(1, "Anne Marie"), "/show/1/Anne%20Marie");
        assert_eq!(canonical_path(1, "a/b"), "/show/1/a%2Fb");
        assert_eq!(canonical_path(1, "50%"), "/show/1/50%25");
        assert_eq!(canonical_path(1, "Zoë"), "/show/1/Zo%C3%AB");
    }

    #[test]
    fn canonical_path_encodes_dot_segments() {
        assert_eq!(canonical_path(1, "."), "/show/1/%2E");
        assert_eq!(canonical_path(1, ".."), "/show/1/%2E%2E");
        assert_eq!(canonical_path(1, "J.R."), "/show/1/J.R.");
    }

    #[test]
    fn canonical_segment_decodes_back_to_the_name() {
        for name in ["Jo", "Anne Marie", "a/b?c#d", "Zoë", "100%", ".", ".."] {
            let path = canonical_path(9, name);
            let segment = path.rsplit('/').next().unwrap();
            assert_eq!(percent_decode_str(segment).decode_utf8().unwrap(), name);
        }
    }

    #[test]
    fn form_fields_are_required() {
        let form = AddPersonForm {
            first_name: Some("Ann".to_string()),
            last_name: None,
            email: Some("ann@x.co".to_string()),
        };
        assert_eq!(
            form.into_person().unwrap_err(),
            ValidationError::Missing("last_name")
        );
    }
}
