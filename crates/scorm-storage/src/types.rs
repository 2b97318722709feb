//! Stored file and folder listing types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Coarse resource classification used by the cloud backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
    Raw,
}

impl ResourceType {
    /// All concrete resource types, in listing order
    pub const ALL: [ResourceType; 3] = [ResourceType::Image, ResourceType::Raw, ResourceType::Video];

    /// Detect the resource type from a file name
    pub fn detect(file_name: &str) -> Self {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let top = mime.type_();
        if top == mime_guess::mime::IMAGE {
            ResourceType::Image
        } else if top == mime_guess::mime::VIDEO || top == mime_guess::mime::AUDIO {
            // Cloudinary stores audio under the video resource type
            ResourceType::Video
        } else {
            ResourceType::Raw
        }
    }

    /// API path segment
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
            ResourceType::Raw => "raw",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file that has been written to storage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Storage key (`folder/path`)
    pub key: String,
    /// Publicly fetchable location
    pub url: String,
    /// Original file name
    pub original_filename: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type guessed from the name
    pub content_type: String,
    /// Resource classification
    pub resource_type: ResourceType,
}

impl StoredFile {
    /// Build metadata for a stored object, guessing type from its name
    pub fn new(key: String, url: String, original_filename: &str, size: u64) -> Self {
        Self {
            content_type: guess_content_type(original_filename),
            resource_type: ResourceType::detect(original_filename),
            original_filename: original_filename.to_string(),
            key,
            url,
            size,
        }
    }
}

/// One entry in a folder listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Folder name (last segment of its storage key)
    pub name: String,
    /// Directly fetchable link
    pub link: String,
}

/// Guess a MIME type string from a file name
pub fn guess_content_type(name: impl AsRef<Path>) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_detection() {
        assert_eq!(ResourceType::detect("logo.png"), ResourceType::Image);
        assert_eq!(ResourceType::detect("intro.mp4"), ResourceType::Video);
        assert_eq!(ResourceType::detect("narration.mp3"), ResourceType::Video);
        assert_eq!(ResourceType::detect("course.zip"), ResourceType::Raw);
        assert_eq!(ResourceType::detect("imsmanifest.xml"), ResourceType::Raw);
        assert_eq!(ResourceType::detect("no_extension"), ResourceType::Raw);
    }

    #[test]
    fn test_stored_file_metadata() {
        let file = StoredFile::new(
            "course/index.html".to_string(),
            "/course/index.html".to_string(),
            "index.html",
            42,
        );
        assert_eq!(file.content_type, "text/html");
        assert_eq!(file.resource_type, ResourceType::Raw);
        assert_eq!(file.size, 42);
    }

    #[test]
    fn test_folder_entry_json_shape() {
        let entry = FolderEntry {
            name: "course".to_string(),
            link: "/course/index.html".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"name": "course", "link": "/course/index.html"}));
    }
}
