use lazy_static::lazy_static;
use regex::Regex;

use crate::flash::Flash;
use crate::io::extension_of;
use crate::models::{Registration, UpdateStudent, Upload};

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "pdf", "doc", "docx"];
pub const MIN_PASSWORD_LEN: usize = 6;

pub const ALL_FIELDS_REQUIRED: &str = "All fields are required";
pub const INVALID_EMAIL: &str = "Invalid email format";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const PASSWORD_CHARSET: &str =
    "Password must only contain letters and numbers (no special characters allowed)";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters long";
pub const EMAIL_TAKEN: &str = "Email is already registered";
pub const FILE_TOO_LARGE: &str = "File is too large";

lazy_static! {
    static ref EMAIL: Regex = Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$"
    )
    .unwrap();
    static ref ALPHANUMERIC: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL.is_match(email)
}

pub fn is_alphanumeric(password: &str) -> bool {
    ALPHANUMERIC.is_match(password)
}

pub fn extension_not_allowed() -> String {
    format!(
        "File extension not allowed. Allowed extensions: {}",
        ALLOWED_EXTENSIONS.join(", ")
    )
}

/// Returns the lowercased extension when it is on the allow-list.
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let ext = extension_of(file_name);
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}

/// Field checks for a registration; the duplicate-email lookup happens
/// against the store afterwards.
pub fn check_registration(form: &Registration, flash: &mut Flash) {
    if [
        &form.fname,
        &form.lname,
        &form.email,
        &form.password,
        &form.cpassword,
    ]
    .iter()
    .any(|field| field.is_empty())
    {
        flash.error(ALL_FIELDS_REQUIRED);
    }
    if !is_valid_email(&form.email) {
        flash.error(INVALID_EMAIL);
    }
    if form.password != form.cpassword {
        flash.error(PASSWORD_MISMATCH);
    }
    if !is_alphanumeric(&form.password) {
        flash.error(PASSWORD_CHARSET);
    }
    if form.file_too_large {
        flash.error(FILE_TOO_LARGE);
    }
}

/// Checks an attached file, returning its extension when it may be stored.
pub fn check_upload(upload: &Upload, flash: &mut Flash) -> Option<String> {
    match allowed_extension(&upload.file_name) {
        Some(ext) => Some(ext),
        None => {
            flash.error(extension_not_allowed());
            None
        }
    }
}

pub fn check_update(form: &UpdateStudent, flash: &mut Flash) {
    if form.fname.is_empty()
        || form.lname.is_empty()
        || form.email.is_empty()
        || form.password.is_empty()
    {
        flash.error(ALL_FIELDS_REQUIRED);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        flash.error(PASSWORD_TOO_SHORT);
    }
    if !is_valid_email(&form.email) {
        flash.error(INVALID_EMAIL);
    }
    if !is_alphanumeric(&form.password) {
        flash.error(PASSWORD_CHARSET);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(password: &str, cpassword: &str) -> Registration {
        Registration {
            fname: "Ada".to_string(),
            lname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: password.to_string(),
            cpassword: cpassword.to_string(),
            register: true,
            file: None,
            file_too_large: false,
        }
    }

    fn errors_for(form: &Registration) -> Vec<String> {
        let mut flash = Flash::default();
        check_registration(form, &mut flash);
        flash.errors
    }

    #[test]
    fn valid_registration_passes() {
        assert!(errors_for(&registration("abc123", "abc123")).is_empty());
    }

    #[test]
    fn special_characters_are_rejected() {
        assert_eq!(
            errors_for(&registration("abc!23", "abc!23")),
            vec![PASSWORD_CHARSET]
        );
    }

    #[test]
    fn mismatch_is_reported() {
        assert_eq!(
            errors_for(&registration("abc123", "abc124")),
            vec![PASSWORD_MISMATCH]
        );
    }

    #[test]
    fn failures_accumulate_in_order() {
        let form = Registration {
            email: "not-an-email".to_string(),
            ..registration("", "x")
        };
        assert_eq!(
            errors_for(&form),
            vec![
                ALL_FIELDS_REQUIRED,
                INVALID_EMAIL,
                PASSWORD_MISMATCH,
                PASSWORD_CHARSET
            ]
        );
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("missing-at.example.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("dot.@example.com"));
        assert!(!is_valid_email("nodomain@localhost"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("scan.PDF").as_deref(), Some("pdf"));
        assert_eq!(allowed_extension("cv.docx").as_deref(), Some("docx"));
        assert!(allowed_extension("setup.exe").is_none());
        assert!(allowed_extension("noextension").is_none());
    }

    #[test]
    fn oversized_upload_is_reported() {
        let form = Registration {
            file_too_large: true,
            ..registration("abc123", "abc123")
        };
        assert_eq!(errors_for(&form), vec![FILE_TOO_LARGE]);
    }

    #[test]
    fn upload_extension_is_checked() {
        let mut flash = Flash::default();
        let upload = Upload {
            file_name: "photo.PNG".to_string(),
            bytes: vec![0; 4],
        };
        assert_eq!(check_upload(&upload, &mut flash).as_deref(), Some("png"));
        let upload = Upload {
            file_name: "setup.exe".to_string(),
            bytes: vec![0; 4],
        };
        assert!(check_upload(&upload, &mut flash).is_none());
        assert_eq!(flash.errors, vec![extension_not_allowed()]);
    }

    #[test]
    fn update_requires_min_length() {
        let form = UpdateStudent {
            id: "1".to_string(),
            fname: "Ada".to_string(),
            lname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "abc12".to_string(),
            update: Some(String::new()),
        };
        let mut flash = Flash::default();
        check_update(&form, &mut flash);
        assert_eq!(flash.errors, vec![PASSWORD_TOO_SHORT]);
    }
}
