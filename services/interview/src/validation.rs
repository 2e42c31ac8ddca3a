//! Input validation for submitted posts.

use crate::blob_store::ImageUpload;
use crate::mapper::ExperienceRequest;
use thiserror::Error;

/// Image MIME types accepted for upload
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// A submitted post failed validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be between {min} and {max} characters")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("userEmail must be a valid email address")]
    InvalidEmail,

    #[error("Unsupported image type: {0}. Allowed types: jpeg, jpg, png, gif, webp")]
    UnsupportedImageType(String),
}

/// Check every user-editable field of a post
pub fn validate_request(request: &ExperienceRequest) -> Result<(), ValidationError> {
    check_length("userName", &request.user_name, 1, 100)?;
    check_email(&request.user_email)?;
    check_length("title", &request.title, 3, 100)?;
    check_length("content", &request.content, 10, 5000)?;
    check_length("companyTag", &request.company_tag, 1, 100)?;
    Ok(())
}

/// An absent or empty image is valid; anything else must be a known image type
pub fn validate_image(image: Option<&ImageUpload>) -> Result<(), ValidationError> {
    let Some(image) = image.filter(|i| !i.is_empty()) else {
        return Ok(());
    };

    let content_type = image.content_type.trim();
    if ALLOWED_IMAGE_TYPES
        .iter()
        .any(|allowed| content_type.eq_ignore_ascii_case(allowed))
    {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedImageType(content_type.to_string()))
    }
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing { field });
    }

    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::Length { field, min, max });
    }

    Ok(())
}

fn check_email(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing { field: "userEmail" });
    }

    let Some((local, domain)) = value.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };

    let plausible = !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty());

    if plausible {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}
