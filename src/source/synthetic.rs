//! Synthetic frame source.
//!
//! Generates a deterministic moving gradient, optionally finite so
//! playlist cycling can be exercised. Entry syntax:
//! `stub://name?frames=300&size=640x480` (both parameters optional).

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::source::VideoSource;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// `None` means endless.
    pub frames: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            width: 640,
            height: 480,
            frames: None,
        }
    }
}

impl SyntheticConfig {
    /// Parse the part after `stub://`.
    pub fn parse(rest: &str) -> Result<Self> {
        let mut config = Self::default();
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, Some(query)),
            None => (rest, None),
        };
        if !name.is_empty() {
            config.name = name.to_string();
        }
        if let Some(query) = query {
            for pair in query.split('&') {
                let Some((key, value)) = pair.split_once('=') else {
                    return Err(anyhow!("malformed stub parameter '{}'", pair));
                };
                match key {
                    "frames" => {
                        config.frames = Some(
                            value
                                .parse()
                                .map_err(|_| anyhow!("frames must be an integer"))?,
                        )
                    }
                    "size" => {
                        let (w, h) = value
                            .split_once('x')
                            .ok_or_else(|| anyhow!("size must look like 640x480"))?;
                        config.width = w.parse().map_err(|_| anyhow!("bad width '{}'", w))?;
                        config.height = h.parse().map_err(|_| anyhow!("bad height '{}'", h))?;
                    }
                    other => return Err(anyhow!("unknown stub parameter '{}'", other)),
                }
            }
        }
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("stub source dimensions must be non-zero"));
        }
        Ok(config)
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }
}

impl VideoSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(limit) = self.config.frames {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        self.frame_count += 1;

        let (w, h) = (self.config.width, self.config.height);
        let mut pixels = vec![0u8; w as usize * h as usize * 3];
        let shift = self.frame_count as usize;
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i + shift) % 256) as u8;
        }
        Ok(Some(Frame::new(pixels, w, h)?))
    }

    fn reset(&mut self) -> Result<()> {
        self.frame_count = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_and_overrides() -> Result<()> {
        let config = SyntheticConfig::parse("clip?frames=12&size=320x240")?;
        assert_eq!(config.name, "clip");
        assert_eq!(config.frames, Some(12));
        assert_eq!((config.width, config.height), (320, 240));

        let bare = SyntheticConfig::parse("camera")?;
        assert_eq!(bare.name, "camera");
        assert_eq!(bare.frames, None);
        Ok(())
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SyntheticConfig::parse("clip?frames=lots").is_err());
        assert!(SyntheticConfig::parse("clip?size=640").is_err());
        assert!(SyntheticConfig::parse("clip?speed=9").is_err());
    }

    #[test]
    fn finite_source_exhausts_and_resets() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig {
            name: "clip".into(),
            width: 8,
            height: 8,
            frames: Some(2),
        });
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        source.reset()?;
        assert!(source.next_frame()?.is_some());
        Ok(())
    }
}
