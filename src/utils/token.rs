use uuid::Uuid;

/// Short id printed on a test and its answer key so the two can be matched.
pub fn generate_test_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}

/// Collision-resistant file name for an uploaded image, keeping its extension.
pub fn image_file_name(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), extension.to_ascii_lowercase())
}
