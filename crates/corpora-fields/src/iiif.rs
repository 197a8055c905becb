//! IIIF image fields.
//!
//! The stored value is the image service base URL. Viewers read
//! `{base}/info.json` for dimensions and tiling, and build Image API
//! requests of the form `{base}/{region}/{size}/{rotation}/{quality}.{format}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{instrument, warn};

use corpora_client::HttpCorporaApi;
use corpora_core::{Error, Result};

use crate::link::validate_url;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    Full,
    Square,
    Pixels { x: u32, y: u32, w: u32, h: u32 },
    Percent { x: f64, y: f64, w: f64, h: f64 },
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Full => f.write_str("full"),
            Region::Square => f.write_str("square"),
            Region::Pixels { x, y, w, h } => write!(f, "{},{},{},{}", x, y, w, h),
            Region::Percent { x, y, w, h } => write!(f, "pct:{},{},{},{}", x, y, w, h),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Size {
    Max,
    Width(u32),
    Height(u32),
    Exact { w: u32, h: u32 },
    /// Scale to fit inside `w` x `h`, keeping the aspect ratio.
    BestFit { w: u32, h: u32 },
    Percent(f64),
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Max => f.write_str("max"),
            Size::Width(w) => write!(f, "{},", w),
            Size::Height(h) => write!(f, ",{}", h),
            Size::Exact { w, h } => write!(f, "{},{}", w, h),
            Size::BestFit { w, h } => write!(f, "!{},{}", w, h),
            Size::Percent(p) => write!(f, "pct:{}", p),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Quality {
    #[default]
    Default,
    Color,
    Gray,
    Bitonal,
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quality::Default => "default",
            Quality::Color => "color",
            Quality::Gray => "gray",
            Quality::Bitonal => "bitonal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Jpg,
    Png,
    Webp,
    Gif,
    Tif,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Gif => "gif",
            Format::Tif => "tif",
        };
        f.write_str(s)
    }
}

/// Builder for one Image API request.
#[derive(Debug, Clone, PartialEq)]
pub struct IiifImage {
    base: String,
    region: Region,
    size: Size,
    rotation: f64,
    mirrored: bool,
    quality: Quality,
    format: Format,
}

impl IiifImage {
    /// Full image at maximum size. Fails unless `base` is an http(s) URL.
    pub fn new(base: &str) -> Result<Self> {
        let base = base.trim().trim_end_matches('/');
        let base = base.strip_suffix("/info.json").unwrap_or(base);
        if validate_url(base).is_err() {
            return Err(Error::Validation(format!("not an IIIF service URL: {}", base)));
        }
        Ok(Self {
            base: base.to_string(),
            region: Region::Full,
            size: Size::Max,
            rotation: 0.0,
            mirrored: false,
            quality: Quality::Default,
            format: Format::Jpg,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Clockwise rotation in degrees, normalized to `[0, 360)`.
    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = if degrees.is_finite() {
            degrees.rem_euclid(360.0)
        } else {
            0.0
        };
        self
    }

    pub fn mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn info_url(&self) -> String {
        format!("{}/info.json", self.base)
    }

    pub fn url(&self) -> String {
        let mirror = if self.mirrored { "!" } else { "" };
        format!(
            "{}/{}/{}/{}{}/{}.{}",
            self.base, self.region, self.size, mirror, self.rotation, self.quality, self.format
        )
    }

    /// Thumbnail fitting a `px` square.
    pub fn thumbnail(base: &str, px: u32) -> Result<String> {
        Ok(Self::new(base)?.size(Size::BestFit { w: px, h: px }).url())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IiifTile {
    pub width: u32,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

/// Image information document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IiifInfo {
    #[serde(rename = "@id", alias = "id")]
    pub id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub tiles: Vec<IiifTile>,
    #[serde(default)]
    pub profile: JsonValue,
}

impl IiifInfo {
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }

    /// Largest scale factor advertised by any tile set.
    pub fn max_scale_factor(&self) -> u32 {
        self.tiles
            .iter()
            .flat_map(|t| t.scale_factors.iter().copied())
            .max()
            .unwrap_or(1)
    }
}

/// Shown in place of the viewer when the info document cannot be loaded.
pub const INFO_UNAVAILABLE: &str = "Image information could not be loaded.";

/// Outcome of loading a viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum IiifLoad {
    Ready(IiifInfo),
    Unavailable(&'static str),
}

/// Fetch `{base}/info.json`.
#[instrument(skip(api), fields(subsystem = "fields"))]
pub async fn fetch_info(api: &HttpCorporaApi, base: &str) -> Result<IiifInfo> {
    let image = IiifImage::new(base)?;
    api.fetch_external_json(&image.info_url()).await
}

/// Load a viewer; any failure becomes a static message.
pub async fn load_viewer(api: &HttpCorporaApi, base: &str) -> IiifLoad {
    match fetch_info(api, base).await {
        Ok(info) => IiifLoad::Ready(info),
        Err(e) => {
            warn!(base, error = %e, "IIIF info unavailable");
            IiifLoad::Unavailable(INFO_UNAVAILABLE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://iiif.example.org/iiif/2/page1";

    #[test]
    fn test_default_request() {
        let image = IiifImage::new(&format!("{}/info.json", BASE)).unwrap();
        assert_eq!(image.base(), BASE);
        assert_eq!(image.url(), format!("{}/full/max/0/default.jpg", BASE));
        assert!(IiifImage::new("page1").is_err());
    }

    #[test]
    fn test_builder() {
        let url = IiifImage::new(BASE)
            .unwrap()
            .region(Region::Pixels { x: 10, y: 20, w: 300, h: 400 })
            .size(Size::Width(150))
            .rotation(-90.0)
            .mirrored(true)
            .quality(Quality::Gray)
            .format(Format::Png)
            .url();
        assert_eq!(url, format!("{}/10,20,300,400/150,/!270/gray.png", BASE));

        let url = IiifImage::new(BASE)
            .unwrap()
            .region(Region::Percent { x: 0.0, y: 0.0, w: 50.0, h: 50.0 })
            .size(Size::Percent(25.0))
            .url();
        assert_eq!(url, format!("{}/pct:0,0,50,50/pct:25/0/default.jpg", BASE));

        assert_eq!(
            IiifImage::thumbnail(BASE, 200).unwrap(),
            format!("{}/full/!200,200/0/default.jpg", BASE)
        );
    }

    #[test]
    fn test_info_accepts_both_id_keys() {
        let v2: IiifInfo = serde_json::from_value(json!({
            "@id": BASE, "width": 4000, "height": 3000,
            "tiles": [{"width": 512, "scaleFactors": [1, 2, 4, 8]}]
        }))
        .unwrap();
        assert_eq!(v2.max_scale_factor(), 8);
        assert!((v2.aspect_ratio() - 4.0 / 3.0).abs() < 1e-9);

        let v3: IiifInfo =
            serde_json::from_value(json!({"id": BASE, "width": 10, "height": 0})).unwrap();
        assert_eq!(v3.id, BASE);
        assert_eq!(v3.aspect_ratio(), 1.0);
        assert_eq!(v3.max_scale_factor(), 1);
    }
}
