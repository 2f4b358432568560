//! Data Transfer Objects - form bodies and query strings as submitted.
//!
//! Every field arrives as text; conversion into domain drafts happens in the
//! web layer, which also reports unparseable values as field errors.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of `<input type="datetime-local">`.
pub const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// `?page=N` on any listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?next=/path/` on the login page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Post form fields other than the image, which travels as a multipart file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    /// Checkbox: present when ticked.
    #[serde(default)]
    pub is_published: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    /// Checkbox asking to drop the current image.
    #[serde(default)]
    pub image_clear: Option<String>,
}

impl PostForm {
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = value,
            "text" => self.text = value,
            "pub_date" => self.pub_date = value,
            "is_published" => self.is_published = Some(value),
            "location" => self.location = value,
            "category" => self.category = value,
            "image-clear" | "image_clear" => self.image_clear = Some(value),
            _ => {}
        }
    }

    pub fn is_published(&self) -> bool {
        checkbox(self.is_published.as_deref())
    }

    pub fn clears_image(&self) -> bool {
        checkbox(self.image_clear.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// The password fields are never echoed back into a re-rendered form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != "off" && v != "false")
}

/// Parses a `datetime-local` value as UTC. Seconds are accepted too.
pub fn parse_datetime_local(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DATETIME_LOCAL_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_datetime_local(value: &DateTime<Utc>) -> String {
    value.format(DATETIME_LOCAL_FORMAT).to_string()
}

/// Select boxes submit `""` for "no choice".
pub fn parse_optional_id(value: &str) -> Result<Option<i32>, std::num::ParseIntError> {
    let value = value.trim();
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    #[test]
    fn test_parse_datetime_local() {
        let parsed = parse_datetime_local("2024-03-01T09:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());

        let with_seconds = parse_datetime_local("2024-03-01T09:30:15").unwrap();
        assert_eq!(with_seconds.second(), 15);

        assert!(parse_datetime_local("").is_none());
        assert!(parse_datetime_local("yesterday").is_none());
    }

    #[test]
    fn test_format_round_trips_to_minutes() {
        let date = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(format_datetime_local(&date), "2023-12-31T23:59");
    }

    #[test]
    fn test_parse_optional_id() {
        assert_eq!(parse_optional_id("").unwrap(), None);
        assert_eq!(parse_optional_id(" 4 ").unwrap(), Some(4));
        assert!(parse_optional_id("four").is_err());
    }

    #[test]
    fn test_post_form_fields_and_checkboxes() {
        let mut form = PostForm::default();
        form.set_field("title", "Hello".to_string());
        form.set_field("is_published", "on".to_string());
        form.set_field("unknown", "ignored".to_string());

        assert_eq!(form.title, "Hello");
        assert!(form.is_published());
        assert!(!form.clears_image());
    }
}
