use serde_json::{json, Value};

/// Placeholder token substituted with the camera-angle label when building
/// the generation instruction.
pub const CAMERA_ANGLE_PLACEHOLDER: &str = "[CAMERA_ANGLE_PLACEHOLDER]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Vi,
    En,
}

impl Language {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "vi" => Some(Language::Vi),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraAngle {
    pub key: &'static str,
    pub label: &'static str,
}

/// Per-language string table: instruction templates, user-facing error
/// messages and the display strings the frontend needs.
#[derive(Debug)]
pub struct Locale {
    pub title: &'static str,
    pub tagline: &'static str,
    pub character_caption: &'static str,
    pub prop_caption: &'static str,
    pub background_caption: &'static str,
    pub camera_angle_label: &'static str,
    pub camera_angles: &'static [CameraAngle],
    pub prompt_template: &'static str,
    pub fallback_prompt_template: &'static str,
    pub invalid_data_url: &'static str,
    pub returned_text_prefix: &'static str,
    pub no_response: &'static str,
    pub connection_failed: &'static str,
    pub fallback_failed_prefix: &'static str,
    pub unrecoverable_prefix: &'static str,
}

static VI: Locale = Locale {
    title: "AI Fashion Studio",
    tagline: "Thử trang phục ảo. Phong cách tức thì.",
    character_caption: "Ảnh người mẫu",
    prop_caption: "Ảnh Trang phục / Vật phẩm",
    background_caption: "Nguồn cảm hứng nền",
    camera_angle_label: "Góc Chụp",
    camera_angles: &[
        CameraAngle { key: "full_body", label: "Toàn thân" },
        CameraAngle { key: "half_body", label: "Bán thân" },
        CameraAngle { key: "close_up", label: "Cận cảnh" },
        CameraAngle { key: "side_view", label: "Góc nghiêng" },
        CameraAngle { key: "from_behind", label: "Chụp từ sau lưng" },
    ],
    prompt_template: "Phân tích 3 ảnh đầu vào: [ảnh 1: người mẫu], [ảnh 2: trang phục/vật phẩm], [ảnh 3: nguồn cảm hứng nền]. Mục tiêu: Tạo một bức ảnh thời trang chuyên nghiệp, chất lượng cao, siêu thực. Bố cục ảnh cuối cùng phải là một góc chụp '[CAMERA_ANGLE_PLACEHOLDER]'. Hướng dẫn: Giữ lại khuôn mặt và đặc điểm chính của người mẫu từ ảnh 1. Điều chỉnh tinh tế tư thế của người mẫu để chuyên nghiệp và tự nhiên, phù hợp với góc máy đã chọn. Cho người mẫu mặc hoặc cầm vật phẩm từ ảnh 2 một cách chân thực. Không sử dụng trực tiếp ảnh 3, hãy coi nó là nguồn cảm hứng về phong cách. Tạo một bối cảnh mới, phù hợp và được làm mờ một cách nghệ thuật (hiệu ứng bokeh/xóa phông) để làm nổi bật người mẫu và sản phẩm. Đảm bảo ánh sáng và bóng đổ nhất quán và chân thực. Chỉ xuất ra hình ảnh cuối cùng.",
    fallback_prompt_template: "Tạo một bức ảnh chụp '[CAMERA_ANGLE_PLACEHOLDER]' của người mẫu (từ ảnh 1) đang mặc/cầm (ảnh 2) trong một bối cảnh được lấy cảm hứng từ (ảnh 3) với hiệu ứng xóa phông. Giữ lại khuôn mặt của người mẫu.",
    invalid_data_url: "URL dữ liệu hình ảnh không hợp lệ. Vui lòng sử dụng định dạng 'data:image/...;base64,...'",
    returned_text_prefix: "AI đã trả về văn bản thay vì hình ảnh: ",
    no_response: "Không có phản hồi.",
    connection_failed: "Không thể kết nối tới Gemini API sau nhiều lần thử.",
    fallback_failed_prefix: "AI không thể xử lý yêu cầu, ngay cả với phương án dự phòng. Lỗi: ",
    unrecoverable_prefix: "Không thể tạo hình ảnh. Chi tiết lỗi: ",
};

static EN: Locale = Locale {
    title: "AI Fashion Studio",
    tagline: "Virtual Try-On. Instant Style.",
    character_caption: "Model Photo",
    prop_caption: "Clothing / Item Photo",
    background_caption: "Background Inspiration",
    camera_angle_label: "Camera Angle",
    camera_angles: &[
        CameraAngle { key: "full_body", label: "Full Body" },
        CameraAngle { key: "half_body", label: "Half Body" },
        CameraAngle { key: "close_up", label: "Close-up" },
        CameraAngle { key: "side_view", label: "Side View" },
        CameraAngle { key: "from_behind", label: "From Behind" },
    ],
    prompt_template: "Analyze 3 input images: [image 1: model], [image 2: clothing/item], [image 3: background style inspiration]. Goal: Generate a single, high-quality, photorealistic, professional fashion photograph. The final composition must be a '[CAMERA_ANGLE_PLACEHOLDER]' shot. Instructions: Retain the model's face and key features from image 1. Subtly adjust the model's pose to be professional and natural for the specified camera angle. Have the model realistically wear or hold the item from image 2. Instead of using image 3 directly, treat it as a style reference. Create a new, complementary background that is artistically blurred (bokeh/shallow depth of field) to ensure the model and item are the main focus. Ensure lighting and shadows are consistent and realistic. Output only the final image.",
    fallback_prompt_template: "Create a '[CAMERA_ANGLE_PLACEHOLDER]' photo of the model (from image 1) wearing/holding the item (from image 2) in a background inspired by image 3 with a bokeh effect. Preserve the model's face.",
    invalid_data_url: "Invalid image data URL. Please use the 'data:image/...;base64,...' format.",
    returned_text_prefix: "The AI returned text instead of an image: ",
    no_response: "No response.",
    connection_failed: "Could not connect to the Gemini API after multiple attempts.",
    fallback_failed_prefix: "The AI could not process the request, even with the fallback. Error: ",
    unrecoverable_prefix: "Could not generate the image. Error details: ",
};

pub fn locale(lang: Language) -> &'static Locale {
    match lang {
        Language::Vi => &VI,
        Language::En => &EN,
    }
}

/// Display strings for the frontend, served from `/api/locales/{lang}` so
/// the string table is maintained in one place.
pub fn ui_strings(lang: Language) -> Value {
    let t = locale(lang);
    json!({
        "lang": lang.as_tag(),
        "title": t.title,
        "tagline": t.tagline,
        "characterImageCaption": t.character_caption,
        "propImageCaption": t.prop_caption,
        "backgroundImageCaption": t.background_caption,
        "cameraAngleLabel": t.camera_angle_label,
        "cameraAngleOptions": t.camera_angles
            .iter()
            .map(|angle| json!({ "key": angle.key, "label": angle.label }))
            .collect::<Vec<_>>(),
    })
}
