//! Sub-pixel horizontal positioning
//!
//! Small text is rendered crisper when the glyph bitmap is rasterized at the
//! fractional pen position it will be drawn at. Positions are quantized into
//! four phases (0, 1/4, 2/4, 3/4 of a pixel):
//!
//! | fraction          | bucket | pixel        |
//! |-------------------|--------|--------------|
//! | `[0.000, 0.125)`  | 0      | floor        |
//! | `[0.125, 0.375)`  | 1      | floor        |
//! | `[0.375, 0.625)`  | 2      | floor        |
//! | `[0.625, 0.875)`  | 3      | floor        |
//! | `[0.875, 1.000)`  | 0      | floor + 1    |

/// One of four pre-rendered horizontal phases of a glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SubpixelBucket(u8);

impl SubpixelBucket {
    pub const ZERO: Self = Self(0);
    pub const COUNT: u8 = 4;

    /// Bucket from a raw index; only the low two bits are used.
    pub const fn new(index: u8) -> Self {
        Self(index & 3)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// Horizontal outline translation in pixels
    pub fn phase(self) -> f32 {
        self.0 as f32 / Self::COUNT as f32
    }

    /// Bucket for a fractional pixel position in `[0, 1)`.
    ///
    /// Returns the bucket and whether the integer pixel must be rounded up
    /// (fractions at or above 0.875 snap to the next pixel's phase 0).
    pub fn from_fraction(fraction: f32) -> (Self, bool) {
        if fraction < 0.125 {
            (Self(0), false)
        } else if fraction < 0.375 {
            (Self(1), false)
        } else if fraction < 0.625 {
            (Self(2), false)
        } else if fraction < 0.875 {
            (Self(3), false)
        } else {
            (Self(0), true)
        }
    }

    /// Split a pen x position into an integer pixel and a bucket.
    pub fn quantize(x: f32) -> (i32, Self) {
        let pixel = x.floor();
        let (bucket, round_up) = Self::from_fraction(x - pixel);
        let pixel = pixel as i32 + i32::from(round_up);
        (pixel, bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(SubpixelBucket::from_fraction(0.0), (SubpixelBucket(0), false));
        assert_eq!(SubpixelBucket::from_fraction(0.1249), (SubpixelBucket(0), false));
        assert_eq!(SubpixelBucket::from_fraction(0.125), (SubpixelBucket(1), false));
        assert_eq!(SubpixelBucket::from_fraction(0.374), (SubpixelBucket(1), false));
        assert_eq!(SubpixelBucket::from_fraction(0.375), (SubpixelBucket(2), false));
        assert_eq!(SubpixelBucket::from_fraction(0.625), (SubpixelBucket(3), false));
        assert_eq!(SubpixelBucket::from_fraction(0.8749), (SubpixelBucket(3), false));
        assert_eq!(SubpixelBucket::from_fraction(0.875), (SubpixelBucket(0), true));
        assert_eq!(SubpixelBucket::from_fraction(0.999), (SubpixelBucket(0), true));
    }

    #[test]
    fn test_buckets_partition_unit_interval() {
        // Walk [0,1) in 1/1024 steps; the bucket sequence must be monotonic
        // 0,1,2,3 then 0-with-round-up, each range contiguous.
        let mut seen: Vec<(u8, bool)> = Vec::new();
        for i in 0..1024 {
            let f = i as f32 / 1024.0;
            let (b, up) = SubpixelBucket::from_fraction(f);
            // Idempotent
            assert_eq!(SubpixelBucket::from_fraction(f), (b, up));
            if seen.last() != Some(&(b.index(), up)) {
                seen.push((b.index(), up));
            }
        }
        assert_eq!(
            seen,
            vec![(0, false), (1, false), (2, false), (3, false), (0, true)]
        );
    }

    #[test]
    fn test_quantize_rounds_up_near_next_pixel() {
        assert_eq!(SubpixelBucket::quantize(10.0), (10, SubpixelBucket(0)));
        assert_eq!(SubpixelBucket::quantize(10.25), (10, SubpixelBucket(1)));
        assert_eq!(SubpixelBucket::quantize(10.5), (10, SubpixelBucket(2)));
        assert_eq!(SubpixelBucket::quantize(10.75), (10, SubpixelBucket(3)));
        assert_eq!(SubpixelBucket::quantize(10.9), (11, SubpixelBucket(0)));
        assert_eq!(SubpixelBucket::quantize(-0.5), (-1, SubpixelBucket(2)));
    }

    #[test]
    fn test_phase() {
        assert_eq!(SubpixelBucket::new(0).phase(), 0.0);
        assert_eq!(SubpixelBucket::new(3).phase(), 0.75);
        assert_eq!(SubpixelBucket::new(5), SubpixelBucket::new(1));
    }
}
