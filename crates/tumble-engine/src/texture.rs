//! Procedural textures.
//!
//! Texel data is an inline literal; nothing is decoded or read from disk.
//! Images are normalized to 8-bit RGBA on the CPU, and mip levels (when
//! requested) are box-filtered here as well.

/// Source texel data.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Texels {
    /// Three `f32` per texel in `[0, 1]`.
    RgbF32(&'static [f32]),
    /// Four bytes per texel.
    Rgba8(&'static [u8]),
}

impl Texels {
    fn components(&self) -> usize {
        match self {
            Texels::RgbF32(_) => 3,
            Texels::Rgba8(_) => 4,
        }
    }

    fn len(&self) -> usize {
        match self {
            Texels::RgbF32(d) => d.len(),
            Texels::Rgba8(d) => d.len(),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// A small 2D image ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub texels: Texels,
    pub filter: Filter,
    pub mipmaps: bool,
}

/// One RGBA8 mip level.
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

const WARM_QUAD: [f32; 12] = [
    1.0, 0.5, 0.1, 0.6, 0.7, 1.0, //
    0.5, 1.0, 1.0, 1.0, 0.5, 0.1,
];

#[rustfmt::skip]
const TILES: [u8; 36] = [
    230, 120,  40, 255,   40,  40,  48, 255,  230, 120,  40, 255,
     40,  40,  48, 255,  250, 240, 220, 255,   40,  40,  48, 255,
    230, 120,  40, 255,   40,  40,  48, 255,  230, 120,  40, 255,
];

impl TextureImage {
    /// 2×2 float RGB, linear filtering, no mipmaps.
    pub fn warm_quad() -> Self {
        Self {
            label: "warm quad",
            width: 2,
            height: 2,
            texels: Texels::RgbF32(&WARM_QUAD),
            filter: Filter::Linear,
            mipmaps: false,
        }
    }

    /// 3×3 RGBA8 tile, trilinear filtering with a full mip chain.
    pub fn tiles() -> Self {
        Self {
            label: "tiles",
            width: 3,
            height: 3,
            texels: Texels::Rgba8(&TILES),
            filter: Filter::Linear,
            mipmaps: true,
        }
    }

    /// Number of scalar values `width × height` texels take in this format.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.texels.components()
    }

    /// Number of scalar values actually present.
    pub fn texel_len(&self) -> usize {
        self.texels.len()
    }

    /// `true` if the texel array holds exactly `width × height` texels.
    pub fn texel_count_matches(&self) -> bool {
        self.width > 0 && self.height > 0 && self.texel_len() == self.expected_len()
    }

    /// Number of mip levels uploaded for this image.
    pub fn mip_level_count(&self) -> u32 {
        if self.mipmaps {
            32 - self.width.max(self.height).max(1).leading_zeros()
        } else {
            1
        }
    }

    /// Level-0 texels as tightly packed RGBA8.
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.texels {
            Texels::Rgba8(data) => data.to_vec(),
            Texels::RgbF32(data) => data
                .chunks_exact(3)
                .flat_map(|c| [unorm8(c[0]), unorm8(c[1]), unorm8(c[2]), 255])
                .collect(),
        }
    }

    /// Level 0 followed by box-filtered levels down to 1×1 when `mipmaps` is set.
    pub fn mip_chain(&self) -> Vec<MipLevel> {
        let mut levels = vec![MipLevel {
            width: self.width,
            height: self.height,
            rgba: self.to_rgba8(),
        }];

        for _ in 1..self.mip_level_count() {
            let Some(prev) = levels.last() else { break };
            let next = downsample(prev);
            levels.push(next);
        }

        levels
    }
}

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Halves each dimension (floor, min 1), averaging the covered source texels.
/// Odd edges fold the last row/column into the final destination texel.
fn downsample(src: &MipLevel) -> MipLevel {
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height {
        let y0 = y * src.height / height;
        let y1 = ((y + 1) * src.height / height).max(y0 + 1);
        for x in 0..width {
            let x0 = x * src.width / width;
            let x1 = ((x + 1) * src.width / width).max(x0 + 1);

            let mut sum = [0u32; 4];
            let mut n = 0u32;
            for sy in y0..y1 {
                for sx in x0..x1 {
                    let i = ((sy * src.width + sx) * 4) as usize;
                    for (c, s) in sum.iter_mut().enumerate() {
                        *s += src.rgba[i + c] as u32;
                    }
                    n += 1;
                }
            }
            rgba.extend(sum.map(|s| ((s + n / 2) / n) as u8));
        }
    }

    MipLevel { width, height, rgba }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_well_formed() {
        assert!(TextureImage::warm_quad().texel_count_matches());
        assert!(TextureImage::tiles().texel_count_matches());
    }

    #[test]
    fn short_texel_array_is_detected() {
        let img = TextureImage {
            width: 3,
            ..TextureImage::warm_quad()
        };
        assert!(!img.texel_count_matches());
        assert_eq!((img.expected_len(), img.texel_len()), (18, 12));
    }

    #[test]
    fn float_texels_convert_to_rgba8() {
        let rgba = TextureImage::warm_quad().to_rgba8();
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[255, 128, 26, 255]);
        assert_eq!(&rgba[12..16], &[255, 128, 26, 255]);
    }

    #[test]
    fn mip_chain_without_mipmaps_is_one_level() {
        let chain = TextureImage::warm_quad().mip_chain();
        assert_eq!(chain.len(), 1);
        assert_eq!((chain[0].width, chain[0].height), (2, 2));
    }

    #[test]
    fn mip_chain_reaches_one_by_one() {
        let img = TextureImage::tiles();
        assert_eq!(img.mip_level_count(), 2);

        let chain = img.mip_chain();
        let sizes: Vec<_> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(3, 3), (1, 1)]);
        assert_eq!(chain[1].rgba.len(), 4);
        assert_eq!(chain[1].rgba[3], 255);
    }

    #[test]
    fn downsample_averages_covered_texels() {
        let src = MipLevel {
            width: 2,
            height: 2,
            rgba: vec![
                0, 0, 0, 255, 100, 0, 0, 255, //
                0, 200, 0, 255, 100, 200, 40, 255,
            ],
        };
        let dst = downsample(&src);
        assert_eq!((dst.width, dst.height), (1, 1));
        assert_eq!(dst.rgba, vec![50, 100, 10, 255]);
    }
}
