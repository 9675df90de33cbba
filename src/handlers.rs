use axum::extract::multipart::Field;
use axum::extract::{Form, Multipart, Path, Query};
use axum::headers::Cookie;
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, TypedHeader};

use crate::db::{self, WriteError};
use crate::flash::{clear_cookie, Flash};
use crate::models::{IdQuery, NewStudent, Registration, StudentChanges, UpdateStudent, Upload};
use crate::state::AppState;
use crate::validate::{self, EMAIL_TAKEN};
use crate::{auth, io, pages, routes, Error};

pub type Page = Result<Response, Error>;

const INVALID_ID: &str = "Invalid or missing student ID.";
const NOT_FOUND: &str = "Student not found.";
const MAX_FIELD_BYTES: usize = 4 * 1024;

/// Renders `html`, expiring the flash cookie if the request carried one.
fn render(html: String, cookie: &Option<TypedHeader<Cookie>>) -> Response {
    if cookie.is_some() {
        clear_cookie(Html(html))
    } else {
        Html(html).into_response()
    }
}

fn take_flash(state: &AppState, cookie: &Option<TypedHeader<Cookie>>) -> Option<Flash> {
    state.flashes.take_from(cookie.as_ref().map(|header| &header.0))
}

pub async fn index() -> Redirect {
    Redirect::to(routes::LISTING)
}

pub async fn registration_form(
    cookie: Option<TypedHeader<Cookie>>,
    Extension(state): Extension<AppState>,
) -> Page {
    let flash = take_flash(&state, &cookie);
    Ok(render(pages::registration_page(flash.as_ref())?, &cookie))
}

/// Reads the rest of `field`, giving up with `None` once it passes `limit` bytes.
async fn read_limited(field: &mut Field<'_>, limit: usize) -> Result<Option<Vec<u8>>, Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if bytes.len() + chunk.len() > limit {
            return Ok(None);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(Some(bytes))
}

async fn read_text(field: &mut Field<'_>) -> Result<String, Error> {
    let bytes = read_limited(field, MAX_FIELD_BYTES)
        .await?
        .ok_or_else(|| Error::invalid("Form field is too large"))?;
    String::from_utf8(bytes).map_err(|_| Error::invalid("Form field is not valid UTF-8"))
}

async fn read_registration(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<Registration, Error> {
    let mut form = Registration::default();
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fname" => form.fname = read_text(&mut field).await?.trim().to_string(),
            "lname" => form.lname = read_text(&mut field).await?.trim().to_string(),
            "email" => form.email = read_text(&mut field).await?.trim().to_string(),
            "password" => form.password = read_text(&mut field).await?,
            "cpassword" => form.cpassword = read_text(&mut field).await?,
            "register" => form.register = true,
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                // the unread tail is skipped by next_field, within the body limit
                match read_limited(&mut field, max_upload_bytes).await? {
                    // browsers send an empty part when no file was picked
                    Some(_) if file_name.is_empty() => {}
                    Some(bytes) => form.file = Some(Upload { file_name, bytes }),
                    None => form.file_too_large = true,
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

pub async fn process_registration(
    Extension(state): Extension<AppState>,
    multipart: Multipart,
) -> Page {
    let form = read_registration(multipart, state.max_upload_bytes).await?;
    if !form.register {
        return Ok(Redirect::to(routes::REGISTRATION).into_response());
    }

    let mut flash = Flash::default();
    validate::check_registration(&form, &mut flash);
    if db::email_taken(&state.pool, &form.email).await? {
        flash.error(EMAIL_TAKEN);
    }
    let upload = form.file.as_ref().and_then(|upload| {
        validate::check_upload(upload, &mut flash).map(|ext| (ext, upload))
    });

    if flash.has_errors() {
        log::debug!(
            "Rejected registration for `{}`: {:?}",
            form.email,
            flash.errors
        );
        return Ok(state.flashes.redirect(routes::REGISTRATION, flash));
    }

    let password_hash = auth::hash_password(&form.password)?;

    let file = match upload {
        Some((ext, upload)) => match state.uploads.store(&ext, &upload.bytes).await {
            Ok(reference) => Some(reference),
            Err(err) => {
                log::error!("Could not store upload `{}`: {}", upload.file_name, err);
                flash.error("Failed to upload file");
                return Ok(state.flashes.redirect(routes::REGISTRATION, flash));
            }
        },
        None => None,
    };

    let student = NewStudent {
        fname: form.fname,
        lname: form.lname,
        email: form.email,
        password_hash,
        file,
    };

    match db::insert_student(&state.pool, &student).await {
        Ok(id) => {
            log::info!("Registered student {} <{}>", id, student.email);
            flash.message = Some(format!(
                "Registration successful for {} {}",
                student.fname, student.lname
            ));
        }
        Err(err) => {
            if let Some(reference) = &student.file {
                if let Err(err) = state.uploads.remove(reference).await {
                    log::warn!("Could not remove orphaned upload `{}`: {}", reference, err);
                }
            }
            match err {
                WriteError::EmailTaken => flash.error(EMAIL_TAKEN),
                WriteError::Database(err) => {
                    log::error!("Failed to insert student: {}", err);
                    flash.error("Failed to register student");
                }
            }
        }
    }

    Ok(state.flashes.redirect(routes::REGISTRATION, flash))
}

pub async fn listing(
    cookie: Option<TypedHeader<Cookie>>,
    Extension(state): Extension<AppState>,
) -> Page {
    let students = db::list_students(&state.pool).await?;
    let flash = take_flash(&state, &cookie);
    Ok(render(pages::listing_page(&students, flash.as_ref())?, &cookie))
}

pub async fn edit_form(
    cookie: Option<TypedHeader<Cookie>>,
    Extension(state): Extension<AppState>,
    Query(query): Query<IdQuery>,
) -> Page {
    let id = query.parse().ok_or_else(|| Error::invalid(INVALID_ID))?;
    let student = db::find_student(&state.pool, id)
        .await?
        .ok_or_else(|| Error::not_found(NOT_FOUND))?;
    let flash = take_flash(&state, &cookie);
    Ok(render(pages::edit_page(&student, flash.as_ref())?, &cookie))
}

pub async fn process_update(
    Extension(state): Extension<AppState>,
    Form(form): Form<UpdateStudent>,
) -> Page {
    if form.update.is_none() {
        return Ok(Redirect::to(routes::LISTING).into_response());
    }
    let form = UpdateStudent {
        fname: form.fname.trim().to_string(),
        lname: form.lname.trim().to_string(),
        email: form.email.trim().to_string(),
        ..form
    };
    let id = IdQuery {
        id: Some(form.id.clone()),
    }
    .parse()
    .ok_or_else(|| Error::invalid(INVALID_ID))?;
    let back = format!("{}?id={}", routes::EDIT, id);

    let mut flash = Flash::default();
    validate::check_update(&form, &mut flash);
    if flash.has_errors() {
        log::debug!("Rejected update of student {}: {:?}", id, flash.errors);
        return Ok(state.flashes.redirect(&back, flash));
    }

    let changes = StudentChanges {
        fname: form.fname,
        lname: form.lname,
        email: form.email,
        password_hash: auth::hash_password(&form.password)?,
    };

    match db::update_student(&state.pool, id, &changes).await {
        Ok(true) => {
            log::info!("Updated student {}", id);
            Ok(state
                .flashes
                .redirect(routes::LISTING, Flash::message("Student updated successfully")))
        }
        Ok(false) => {
            flash.error(NOT_FOUND);
            Ok(state.flashes.redirect(routes::LISTING, flash))
        }
        Err(WriteError::EmailTaken) => {
            flash.error(EMAIL_TAKEN);
            Ok(state.flashes.redirect(&back, flash))
        }
        Err(WriteError::Database(err)) => {
            log::error!("Failed to update student {}: {}", id, err);
            flash.error("Failed to update student");
            Ok(state.flashes.redirect(&back, flash))
        }
    }
}

pub async fn delete_student(
    Extension(state): Extension<AppState>,
    Query(query): Query<IdQuery>,
) -> Page {
    let id = query.parse().ok_or_else(|| Error::invalid(INVALID_ID))?;

    let flash = match db::delete_student(&state.pool, id).await? {
        Some(student) => {
            log::info!("Deleted student {} <{}>", id, student.email);
            if let Some(reference) = &student.file {
                if let Err(err) = state.uploads.remove(reference).await {
                    log::warn!("Could not remove upload `{}`: {}", reference, err);
                }
            }
            Flash::message("Student deleted successfully")
        }
        None => {
            let mut flash = Flash::default();
            flash.error(NOT_FOUND);
            flash
        }
    };

    Ok(state.flashes.redirect(routes::LISTING, flash))
}

pub async fn serve_upload(
    Path(name): Path<String>,
    Extension(state): Extension<AppState>,
) -> Page {
    let bytes = state
        .uploads
        .read(&name)
        .await
        .map_err(|_| Error::not_found(format!("No uploaded file named `{}`", name)))?;
    Ok(([(CONTENT_TYPE, io::content_type_for(&name))], bytes).into_response())
}
