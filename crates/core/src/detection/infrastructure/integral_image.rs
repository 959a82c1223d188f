use image::GrayImage;

/// Summed-area tables of pixel values and squared pixel values.
///
/// Both tables are `(width + 1) × (height + 1)` with a zero first row and
/// column, so any rectangle sum is four lookups.
pub struct IntegralImage {
    width: usize,
    height: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sq_sum = vec![0u64; stride * (h + 1)];
        let pixels = gray.as_raw();

        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = u64::from(pixels[y * w + x]);
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + (x + 1);
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self {
            width: w,
            height: h,
            sum,
            sq_sum,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum of pixels in `[x, x + w) × [y, y + h)`.
    pub fn rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        Self::lookup(&self.sum, self.width + 1, x, y, w, h)
    }

    /// Sum of squared pixels in `[x, x + w) × [y, y + h)`.
    pub fn rect_sq_sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        Self::lookup(&self.sq_sum, self.width + 1, x, y, w, h)
    }

    fn lookup(table: &[u64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let a = table[y * stride + x];
        let b = table[y * stride + x + w];
        let c = table[(y + h) * stride + x];
        let d = table[(y + h) * stride + x + w];
        (d + a) - (b + c)
    }
}
