//! Descriptions stored as JSON next to their image.

use crate::{
    debug_ex,
    dev::platform::{DescriptionSource, ImageId},
    error::{Error, Result},
};
use desc::DescriptionTables;
use std::fs;

/// Reads the tables of `dir/base.bit` from `dir/base.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDescriptionSource;

impl DescriptionSource for JsonDescriptionSource {
    fn load_description(&self, image: &ImageId) -> Result<DescriptionTables> {
        let path = image.path.with_extension("json");
        debug_ex!("Loading description from '{}'.", path.display());
        let text = fs::read_to_string(&path)
            .map_err(|err| Error::Description(format!("{}: {}", path.display(), err)))?;
        Ok(DescriptionTables::from_json(&text)?)
    }
}
