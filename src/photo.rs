//! Loading and validation of the three posture photographs.

use crate::error::TrainerError;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageReader;
use std::{
    fmt,
    io::{Cursor, ErrorKind},
    path::{Path, PathBuf},
};

/// Maximum width or height, in pixels, accepted for any posture image.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// Pixel dimensions of a decoded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// The viewpoint a photograph was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageRole {
    Front,
    Side,
    Back,
}

impl ImageRole {
    /// All roles in the order images are sent to the vision model.
    pub const ALL: [ImageRole; 3] = [ImageRole::Front, ImageRole::Side, ImageRole::Back];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Front => "front",
            ImageRole::Side => "side",
            ImageRole::Back => "back",
        }
    }

    /// The fixed file name the image for this role is read from.
    pub fn file_name(&self) -> &'static str {
        match self {
            ImageRole::Front => "image_front.jpeg",
            ImageRole::Side => "image_side.jpeg",
            ImageRole::Back => "image_back.jpeg",
        }
    }

    /// Heading used when per-view answers are merged into one prompt.
    pub fn photo_heading(&self) -> &'static str {
        match self {
            ImageRole::Front => "Front Photo",
            ImageRole::Side => "Side Photo",
            ImageRole::Back => "Back Photo",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated photograph: the raw file bytes and its decoded pixel size.
#[derive(Clone, Debug)]
pub struct PostureImage {
    role: ImageRole,
    source: PathBuf,
    size: ImageSize,
    data: Vec<u8>,
}

impl PostureImage {
    /// Wraps already-loaded image bytes, checking the size constraint.
    pub fn new(
        role: ImageRole,
        source: impl Into<PathBuf>,
        size: ImageSize,
        data: Vec<u8>,
    ) -> Result<Self, TrainerError> {
        let source = source.into();

        if size.width > MAX_IMAGE_DIMENSION || size.height > MAX_IMAGE_DIMENSION {
            return Err(TrainerError::InvalidImage {
                role,
                path: source,
                reason: format!(
                    "{}x{} exceeds the {MAX_IMAGE_DIMENSION}x{MAX_IMAGE_DIMENSION} limit",
                    size.width, size.height
                ),
            });
        }

        Ok(Self {
            role,
            source,
            size,
            data,
        })
    }

    /// Reads the dimensions from the image header in `data` and validates them.
    ///
    /// The bytes that were checked are the bytes later sent to the model.
    pub fn from_bytes(
        role: ImageRole,
        source: impl Into<PathBuf>,
        data: Vec<u8>,
    ) -> Result<Self, TrainerError> {
        let source = source.into();
        let size = read_image_size(&data).map_err(|reason| TrainerError::InvalidImage {
            role,
            path: source.clone(),
            reason,
        })?;

        log::debug!(
            "Loaded {role} image {} ({}x{}, {} bytes)",
            source.display(),
            size.width,
            size.height,
            data.len()
        );

        Self::new(role, source, size, data)
    }

    /// Reads the image at `path` once and validates it.
    pub fn from_path(role: ImageRole, path: impl AsRef<Path>) -> Result<Self, TrainerError> {
        let path = path.as_ref();

        let data = std::fs::read(path).map_err(|e| TrainerError::InvalidImage {
            role,
            path: path.to_path_buf(),
            reason: match e.kind() {
                ErrorKind::NotFound => "file not found".to_string(),
                _ => e.to_string(),
            },
        })?;

        Self::from_bytes(role, path, data)
    }

    pub fn role(&self) -> ImageRole {
        self.role
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Base64 encoding of the original file bytes, as the model server expects.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// The front, side and back photographs of one person.
#[derive(Clone, Debug)]
pub struct ImageTriplet {
    front: PostureImage,
    side: PostureImage,
    back: PostureImage,
}

impl ImageTriplet {
    /// Builds a triplet, checking that every image sits in its own slot.
    pub fn new(
        front: PostureImage,
        side: PostureImage,
        back: PostureImage,
    ) -> Result<Self, TrainerError> {
        for (expected, image) in [
            (ImageRole::Front, &front),
            (ImageRole::Side, &side),
            (ImageRole::Back, &back),
        ] {
            if image.role != expected {
                return Err(TrainerError::InvalidImage {
                    role: expected,
                    path: image.source.clone(),
                    reason: format!("expected a {expected} image, got a {} image", image.role),
                });
            }
        }

        Ok(Self { front, side, back })
    }

    /// Loads `image_front.jpeg`, `image_side.jpeg` and `image_back.jpeg` from `dir`.
    ///
    /// Every file is checked before this returns, so no model is contacted
    /// unless all three images are usable.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, TrainerError> {
        let dir = dir.as_ref();
        let load = |role: ImageRole| PostureImage::from_path(role, dir.join(role.file_name()));

        Self::new(
            load(ImageRole::Front)?,
            load(ImageRole::Side)?,
            load(ImageRole::Back)?,
        )
    }

    pub fn get(&self, role: ImageRole) -> &PostureImage {
        match role {
            ImageRole::Front => &self.front,
            ImageRole::Side => &self.side,
            ImageRole::Back => &self.back,
        }
    }

    /// Iterates the images in front, side, back order.
    pub fn iter(&self) -> impl Iterator<Item = &PostureImage> {
        ImageRole::ALL.into_iter().map(|role| self.get(role))
    }

    /// Encodes all three images in front, side, back order.
    pub fn encoded(&self) -> Vec<String> {
        self.iter().map(PostureImage::to_base64).collect()
    }
}

// Reads the pixel size from the image header, guessing the format from its content.
fn read_image_size(data: &[u8]) -> Result<ImageSize, String> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| format!("Unreadable image: {e}"))?;

    Ok(ImageSize { width, height })
}
