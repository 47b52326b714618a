//! Naming of committed crops: `{COLOR}-{GRAIN}[_flip].jpg` under a
//! subdirectory named after the first two letters of the color code.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

const FLIP_SUFFIX: &str = "_flip";
const OUTPUT_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Color must be 3 letters (e.g. FFA), got {0:?}")]
    ColorCode(String),
    #[error("Grain must not contain path separators, got {0:?}")]
    GrainCode(String),
}

/// Three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCode(String);

impl ColorCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the output subdirectory.
    pub fn prefix(&self) -> &str {
        &self.0[..2]
    }
}

impl FromStr for ColorCode {
    type Err = ValidationError;

    /// Accepts input case-insensitively; surrounding whitespace is ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(ValidationError::ColorCode(input.to_string()))
        }
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw contents of the rename form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameForm {
    pub color: String,
    pub grain: String,
    pub flipped: bool,
}

impl RenameForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Validated naming for one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSpec {
    pub color: ColorCode,
    pub grain: String,
    pub flipped: bool,
}

impl RenameSpec {
    pub fn new(color: ColorCode, grain: &str, flipped: bool) -> Self {
        Self {
            color,
            grain: grain.trim().to_uppercase(),
            flipped,
        }
    }

    /// `{COLOR}-{GRAIN}` plus `_flip` when flipped.
    pub fn identifier(&self) -> String {
        let suffix = if self.flipped { FLIP_SUFFIX } else { "" };
        format!("{}-{}{}", self.color, self.grain, suffix)
    }

    pub fn subdirectory(&self) -> &str {
        self.color.prefix()
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.identifier(), OUTPUT_EXTENSION)
    }

    /// Where the crop lands below `dest_dir`.
    pub fn output_path(&self, dest_dir: &Path) -> PathBuf {
        dest_dir.join(self.subdirectory()).join(self.file_name())
    }
}

impl TryFrom<&RenameForm> for RenameSpec {
    type Error = ValidationError;

    fn try_from(form: &RenameForm) -> Result<Self, Self::Error> {
        let spec = Self::new(form.color.parse()?, &form.grain, form.flipped);
        // The output name must stay a single entry inside the color folder
        let name = spec.file_name();
        let single = !name.contains(['/', '\\'])
            && Path::new(&name).file_name() == Some(OsStr::new(&name));
        if !single {
            return Err(ValidationError::GrainCode(form.grain.clone()));
        }
        Ok(spec)
    }
}
