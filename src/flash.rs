use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::headers::Cookie;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, Duration, Utc};

use crate::auth::generate_token;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    pub errors: Vec<String>,
    pub message: Option<String>,
}

impl Flash {
    pub fn error<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
    }

    pub fn message<S: Into<String>>(message: S) -> Self {
        Self {
            errors: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.message.is_none()
    }
}

#[derive(Debug)]
struct Stashed {
    flash: Flash,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FlashStore {
    entries: Arc<Mutex<HashMap<String, Stashed>>>,
    ttl: Duration,
}

impl FlashStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Stores `flash` and returns the token that retrieves it.
    pub fn stash(&self, flash: Flash) -> String {
        let token = generate_token();
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, stashed| stashed.expires_at > now);
        entries.insert(
            token.clone(),
            Stashed {
                flash,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    pub fn take(&self, token: &str) -> Option<Flash> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let stashed = entries.remove(token)?;
        if Utc::now() > stashed.expires_at {
            return None;
        }
        Some(stashed.flash)
    }

    /// Takes the flash named by the request's cookie, if any.
    pub fn take_from(&self, cookie: Option<&Cookie>) -> Option<Flash> {
        let token = cookie?.get(FLASH_COOKIE)?;
        self.take(token)
    }

    /// Redirects to `to`, carrying `flash` to the page rendered there.
    pub fn redirect(&self, to: &str, flash: Flash) -> Response {
        let redirect = Redirect::to(to).into_response();
        if flash.is_empty() {
            return redirect;
        }
        let token = self.stash(flash);
        with_cookie(
            redirect,
            format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, token),
        )
    }
}

/// Expires the flash cookie once its entry has been rendered.
pub fn clear_cookie<R: IntoResponse>(response: R) -> Response {
    with_cookie(
        response.into_response(),
        format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", FLASH_COOKIE),
    )
}

fn with_cookie(mut response: Response, cookie: String) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => log::warn!("Could not encode flash cookie: {}", err),
    }
    response
}
