use crate::frame::Plane;
use image::RgbImage;

/// BT.601 RGB to YUV in 8.8 fixed point, chroma offset by 128
pub fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);

    let y = (77 * r + 150 * g + 29 * b + 128) >> 8;
    let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;

    (clamp_u8(y), clamp_u8(u), clamp_u8(v))
}

fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Packed YUV422 (YUYV) for v4l2loopback consumers.
///
/// Each horizontal pixel pair shares the mean of its chroma. An odd last
/// column is paired with itself.
pub fn rgb_to_yuyv(rgb_image: &RgbImage) -> Vec<u8> {
    let (width, height) = rgb_image.dimensions();
    if width == 0 {
        return Vec::new();
    }
    let mut yuyv = Vec::with_capacity(width.div_ceil(2) as usize * 4 * height as usize);

    for row in rgb_image.as_raw().chunks_exact(width as usize * 3) {
        for pair in row.chunks(6) {
            let left = &pair[..3];
            let right = pair.get(3..6).unwrap_or(left);
            let (y0, u0, v0) = rgb_to_yuv(left[0], left[1], left[2]);
            let (y1, u1, v1) = rgb_to_yuv(right[0], right[1], right[2]);

            let u = (u0 as u16 + u1 as u16) / 2;
            let v = (v0 as u16 + v1 as u16) / 2;
            yuyv.extend_from_slice(&[y0, u as u8, y1, v as u8]);
        }
    }

    yuyv
}

/// Split an RGB frame into planar YUV 4:2:0 planes: full resolution Y,
/// then U and V subsampled 2x2 (block averaged).
pub fn i420_planes(rgb_image: &RgbImage) -> Vec<Plane> {
    let (width, height) = rgb_image.dimensions();
    let chroma_width = width.div_ceil(2);
    let chroma_height = height.div_ceil(2);

    let mut luma = Vec::with_capacity((width * height) as usize);
    let mut u_sum = vec![0u32; (chroma_width * chroma_height) as usize];
    let mut v_sum = vec![0u32; (chroma_width * chroma_height) as usize];
    let mut counts = vec![0u32; (chroma_width * chroma_height) as usize];

    for (x, y, pixel) in rgb_image.enumerate_pixels() {
        let (ly, u, v) = rgb_to_yuv(pixel[0], pixel[1], pixel[2]);
        luma.push(ly);

        let idx = ((y / 2) * chroma_width + x / 2) as usize;
        u_sum[idx] += u as u32;
        v_sum[idx] += v as u32;
        counts[idx] += 1;
    }

    let average = |sums: Vec<u32>| -> Vec<u8> {
        sums.iter()
            .zip(&counts)
            .map(|(sum, count)| (sum / (*count).max(1)) as u8)
            .collect()
    };
    let u_plane = average(u_sum);
    let v_plane = average(v_sum);

    vec![
        Plane::packed(luma, width),
        Plane::packed(u_plane, chroma_width),
        Plane::packed(v_plane, chroma_width),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_yuv_extremes() {
        let (y, u, v) = rgb_to_yuv(0, 0, 0);
        assert_eq!((y, u, v), (0, 128, 128));

        let (y, _, _) = rgb_to_yuv(255, 255, 255);
        assert!(y >= 254);
    }

    #[test]
    fn test_yuyv_size() {
        let image = RgbImage::new(4, 2);
        assert_eq!(rgb_to_yuyv(&image).len(), 4 * 2 * 2);
    }

    #[test]
    fn test_yuyv_odd_width_repeats_last_pixel() {
        let image = RgbImage::from_fn(3, 1, |x, _| image::Rgb([(x * 100) as u8; 3]));
        let yuyv = rgb_to_yuyv(&image);

        assert_eq!(yuyv.len(), 2 * 4);
        let last = rgb_to_yuv(200, 200, 200).0;
        assert_eq!((yuyv[4], yuyv[6]), (last, last));
    }

    #[test]
    fn test_yuyv_pair_shares_averaged_chroma() {
        let image = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let (y0, u0, v0) = rgb_to_yuv(255, 0, 0);
        let (y1, u1, v1) = rgb_to_yuv(0, 0, 255);

        let yuyv = rgb_to_yuyv(&image);
        assert_eq!(yuyv[0], y0);
        assert_eq!(yuyv[2], y1);
        assert_eq!(yuyv[1], ((u0 as u16 + u1 as u16) / 2) as u8);
        assert_eq!(yuyv[3], ((v0 as u16 + v1 as u16) / 2) as u8);
    }

    #[test]
    fn test_zero_width_is_empty() {
        assert!(rgb_to_yuyv(&RgbImage::new(0, 3)).is_empty());
    }

    #[test]
    fn test_i420_plane_layout() {
        let image = RgbImage::from_pixel(5, 3, image::Rgb([200, 200, 200]));
        let planes = i420_planes(&image);

        assert_eq!(planes.len(), 3);
        assert_eq!(planes[0].buffer.len(), 15);
        assert_eq!(planes[0].row_stride, 5);
        assert_eq!(planes[1].buffer.len(), 3 * 2);
        assert_eq!(planes[2].buffer.len(), 3 * 2);
    }

    #[test]
    fn test_i420_luma_matches_rgb_to_yuv() {
        let image = RgbImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let mut planes = i420_planes(&image);
        let luma = planes[0].buffer.copy_remaining();
        let white = rgb_to_yuv(255, 255, 255).0;
        assert_eq!(luma, vec![0, white, 0, white]);
    }
}
