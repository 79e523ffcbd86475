use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::locales::{locale, Language, CAMERA_ANGLE_PLACEHOLDER};

static DATA_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:(image/\w+);base64,(.*)$").expect("valid data url regex"));

/// A malformed `data:image/...;base64,...` input. The message is already
/// localized for the requesting user.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InvalidDataUrl(pub String);

/// A validated image ready for inclusion in a generation request: MIME type
/// plus the base64 payload, still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: String,
}

impl ImagePart {
    /// Parses a data URL. This is the single input gate of the pipeline; no
    /// image reaches Gemini without passing it.
    pub fn from_data_url(data_url: &str, lang: Language) -> Result<Self, InvalidDataUrl> {
        let captures = DATA_URL_RE
            .captures(data_url)
            .ok_or_else(|| InvalidDataUrl(locale(lang).invalid_data_url.to_string()))?;
        Ok(ImagePart {
            mime_type: captures[1].to_string(),
            data: captures[2].to_string(),
        })
    }

    pub fn to_inline_part(&self) -> Value {
        json!({
            "inlineData": {
                "mimeType": self.mime_type,
                "data": self.data,
            }
        })
    }
}

/// Reassembles a data URL from a response's inline MIME type and payload.
pub fn data_url_from_inline(mime_type: &str, data: &str) -> String {
    format!("data:{mime_type};base64,{data}")
}

/// Substitutes the camera-angle label into an instruction template. The
/// templates are trusted configuration; a template without the placeholder
/// is passed through unchanged.
pub fn build_instruction(template: &str, camera_angle: &str) -> String {
    template.replace(CAMERA_ANGLE_PLACEHOLDER, camera_angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_data_url() {
        let part = ImagePart::from_data_url("data:image/png;base64,AAAA", Language::En)
            .expect("valid data url");
        assert_eq!(part.mime_type, "image/png");
        assert_eq!(part.data, "AAAA");
    }

    #[test]
    fn rejects_a_missing_data_prefix() {
        let err = ImagePart::from_data_url("image/png;base64,AAAA", Language::En)
            .expect_err("must be rejected");
        assert!(err.to_string().contains("Invalid image data URL"));
    }

    #[test]
    fn rejects_a_missing_base64_marker() {
        assert!(ImagePart::from_data_url("data:image/png,AAAA", Language::En).is_err());
        assert!(ImagePart::from_data_url("data:image/png;AAAA", Language::En).is_err());
    }

    #[test]
    fn rejects_non_image_mime_types() {
        assert!(ImagePart::from_data_url("data:text/plain;base64,AAAA", Language::En).is_err());
    }

    #[test]
    fn localizes_the_validation_message() {
        let err = ImagePart::from_data_url("nope", Language::Vi).expect_err("must be rejected");
        assert!(err.to_string().contains("không hợp lệ"));
    }

    #[test]
    fn inline_part_round_trips_through_a_data_url() {
        let part = ImagePart::from_data_url("data:image/webp;base64,Zm9v", Language::En).unwrap();
        assert_eq!(data_url_from_inline(&part.mime_type, &part.data), "data:image/webp;base64,Zm9v");
        assert_eq!(
            part.to_inline_part(),
            serde_json::json!({ "inlineData": { "mimeType": "image/webp", "data": "Zm9v" } })
        );
    }

    #[test]
    fn substitutes_the_camera_angle_label() {
        let instruction = build_instruction("a '[CAMERA_ANGLE_PLACEHOLDER]' shot", "Full Body");
        assert_eq!(instruction, "a 'Full Body' shot");
    }

    #[test]
    fn passes_templates_without_the_placeholder_through() {
        assert_eq!(build_instruction("no token here", "Close-up"), "no token here");
    }
}
