use axum::http::StatusCode;
use lazy_static::lazy_static;
use serde::Serialize;
use tera::{Context, Tera};

use crate::flash::Flash;
use crate::models::Student;
use crate::Error;

lazy_static! {
    static ref TEMPLATES: Tera = {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            ("error.html", include_str!("../templates/error.html")),
            ("registration.html", include_str!("../templates/registration.html")),
            ("edit.html", include_str!("../templates/edit.html")),
            ("listing.html", include_str!("../templates/listing.html")),
        ])
        .expect("embedded templates must parse");
        tera
    };
}

fn render_template(name: &str, context: &Context) -> Result<String, Error> {
    TEMPLATES.render(name, context).map_err(Error::from)
}

fn flash_context(flash: Option<&Flash>) -> Context {
    let mut context = Context::new();
    let (errors, message) = match flash {
        Some(flash) => (flash.errors.as_slice(), flash.message.as_deref()),
        None => (&[][..], None),
    };
    context.insert("errors", errors);
    context.insert("message", &message);
    context
}

pub fn error_page(status: StatusCode, message: &str) -> Result<String, Error> {
    let mut context = Context::new();
    context.insert("status", &status.to_string());
    context.insert("message", message);
    render_template("error.html", &context)
}

pub fn registration_page(flash: Option<&Flash>) -> Result<String, Error> {
    render_template("registration.html", &flash_context(flash))
}

/// Edit form for `student`. The password field is always left blank.
pub fn edit_page(student: &Student, flash: Option<&Flash>) -> Result<String, Error> {
    let mut context = flash_context(flash);
    context.insert("student", student);
    render_template("edit.html", &context)
}

/// How the listing previews a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preview {
    Missing,
    Image,
    Pdf,
    Word,
    Other,
}

impl Preview {
    pub fn of(file: Option<&str>) -> Self {
        let file = match file {
            Some(file) if !file.is_empty() => file,
            _ => return Preview::Missing,
        };
        let ext = match file.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return Preview::Other,
        };
        match ext.as_str() {
            "jpg" | "jpeg" | "png" => Preview::Image,
            "pdf" => Preview::Pdf,
            "doc" | "docx" => Preview::Word,
            _ => Preview::Other,
        }
    }
}

#[derive(Serialize)]
struct Row<'a> {
    #[serde(flatten)]
    student: &'a Student,
    preview: Preview,
    added: String,
}

impl<'a> From<&'a Student> for Row<'a> {
    fn from(student: &'a Student) -> Self {
        Row {
            student,
            preview: Preview::of(student.file.as_deref()),
            added: student.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

pub fn listing_page(students: &[Student], flash: Option<&Flash>) -> Result<String, Error> {
    let rows = students.iter().map(Row::from).collect::<Vec<_>>();
    let mut context = flash_context(flash);
    context.insert("rows", &rows);
    render_template("listing.html", &context)
}
