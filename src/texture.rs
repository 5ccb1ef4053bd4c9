use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;

use crate::error::{WarningKind, Warnings};

/// Side length of the image substituted for textures that fail to load.
pub const PLACEHOLDER_IMAGE_SIZE: u32 = 16;

/// Decoded image properties returned by a [`TextureLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Loads texture images for the mesh stage.
///
/// Errors are not fatal: the importer substitutes a placeholder image and
/// records a warning.
pub trait TextureLoader {
    fn load(&mut self, path: &Path) -> Result<ImageInfo>;
}

impl<F> TextureLoader for F
where
    F: FnMut(&Path) -> Result<ImageInfo>,
{
    fn load(&mut self, path: &Path) -> Result<ImageInfo> {
        self(path)
    }
}

/// Default loader that decodes image headers from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTextureLoader;

impl TextureLoader for FileTextureLoader {
    fn load(&mut self, path: &Path) -> Result<ImageInfo> {
        let (width, height) = image::image_dimensions(path)
            .with_context(|| format!("failed to load texture: {}", path.display()))?;
        Ok(ImageInfo { width, height })
    }
}

/// One image, shared by every texture slot that names the same file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageHandle {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Loading failed and this is an empty stand-in.
    pub placeholder: bool,
}

/// Texture slot of the model's texture list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Texture {
    /// File name of the texture path.
    pub name: String,
    /// Index into [`TextureSet::images`].
    pub image: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TextureSet {
    pub textures: Vec<Texture>,
    pub images: Vec<ImageHandle>,
}

impl TextureSet {
    /// Image sampled by texture slot `index`, if the slot exists.
    pub fn image_for_texture(&self, index: i32) -> Option<usize> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.textures.get(index))
            .map(|texture| texture.image)
    }
}

/// Resolves every texture path against `texture_dir` and loads each unique
/// file exactly once.
pub fn load_textures(
    paths: &[String],
    texture_dir: &Path,
    loader: &mut dyn TextureLoader,
    warnings: &mut Warnings,
) -> TextureSet {
    let mut set = TextureSet::default();
    let mut image_by_path: HashMap<PathBuf, usize> = HashMap::new();

    for raw_path in paths {
        let path = texture_dir.join(raw_path);
        let image = match image_by_path.get(&path) {
            Some(image) => *image,
            None => {
                let handle = match loader.load(&path) {
                    Ok(info) => ImageHandle {
                        path: path.clone(),
                        width: info.width,
                        height: info.height,
                        placeholder: false,
                    },
                    Err(err) => {
                        warnings.push(WarningKind::TextureLoadFailure, format!("{err:#}"));
                        ImageHandle {
                            path: path.clone(),
                            width: PLACEHOLDER_IMAGE_SIZE,
                            height: PLACEHOLDER_IMAGE_SIZE,
                            placeholder: true,
                        }
                    }
                };
                set.images.push(handle);
                image_by_path.insert(path.clone(), set.images.len() - 1);
                set.images.len() - 1
            }
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw_path.clone());
        set.textures.push(Texture { name, image });
    }

    debug!(
        "loaded {} textures backed by {} images",
        set.textures.len(),
        set.images.len()
    );
    set
}
